//! data-loader: ingest security metrics into the CSV store and query portfolios.
//!
//! Each symbol is fetched from the configured providers in priority order
//! (falling back on failure), normalized, and upserted into the store.
//!
//! Usage:
//!   cargo run -p data-loader -- ingest --symbols AAPL MSFT GOOGL
//!   cargo run -p data-loader -- ingest --file symbols.txt
//!   cargo run -p data-loader -- ingest --all --store data/stock_data.csv
//!   cargo run -p data-loader -- portfolio --diversification 50 --max-risk 50

use anyhow::{bail, Context, Result};
use ingest_orchestrator::{run_batch, FallbackOrchestrator, IngestConfig, RunReport};
use metrics_store::{MetricsStore, UpsertOutcome};
use portfolio_builder::{query_portfolio, PortfolioParams};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const DEFAULT_SYMBOLS: &[&str] = &[
    // Technology
    "AAPL", "MSFT", "GOOGL", "NVDA", "META", "AVGO", "ORCL", "CRM", "AMD", "ADBE",
    "INTC", "CSCO", "QCOM", "TXN", "IBM",
    // Healthcare
    "JNJ", "UNH", "PFE", "ABBV", "MRK", "LLY", "TMO", "ABT", "AMGN", "GILD",
    // Financials
    "JPM", "BAC", "GS", "V", "MA", "BRK.B", "WFC", "MS", "AXP", "BLK",
    // Energy
    "XOM", "CVX", "COP", "SLB", "EOG",
    // Consumer Discretionary
    "AMZN", "TSLA", "HD", "NKE", "SBUX", "MCD", "LOW", "TJX",
    // Industrials
    "CAT", "BA", "HON", "UPS", "GE", "RTX", "DE", "LMT", "UNP",
    // Utilities
    "NEE", "DUK", "SO", "AEP",
    // Materials
    "LIN", "APD", "SHW", "NEM",
    // Real Estate
    "AMT", "PLD", "SPG", "O",
    // Communications
    "NFLX", "DIS", "CMCSA", "T", "VZ", "TMUS",
    // Consumer Staples
    "PG", "KO", "PEP", "COST", "WMT", "PM", "CL",
];

fn init_tracing() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("data_loader=info,ingest_orchestrator=info")
        })
    };
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  data-loader ingest --symbols AAPL MSFT ...   Ingest specific symbols");
    eprintln!("  data-loader ingest --file PATH               Ingest symbols listed in a file");
    eprintln!("  data-loader ingest --all                     Ingest the built-in symbol list");
    eprintln!("  data-loader portfolio --diversification N --max-risk N");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --store PATH       CSV store path (default: METRICS_STORE_PATH or data/stock_data.csv)");
}

/// Value following `flag`, if any.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn flag_number(args: &[String], flag: &str) -> Result<i64> {
    let raw = flag_value(args, flag).with_context(|| format!("{} is required", flag))?;
    raw.parse()
        .with_context(|| format!("{} must be an integer, got {:?}", flag, raw))
}

/// Symbols from a list file: whitespace or comma separated, `#` starts a comment.
fn parse_symbol_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(|line| line.split(|c: char| c == ',' || c.is_whitespace()))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn resolve_symbols(args: &[String]) -> Result<Option<Vec<String>>> {
    if args.iter().any(|a| a == "--all") {
        return Ok(Some(DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()));
    }
    if let Some(path) = flag_value(args, "--file") {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read symbol file {}", path))?;
        return Ok(Some(parse_symbol_list(&contents)));
    }
    if let Some(idx) = args.iter().position(|a| a == "--symbols") {
        let symbols = args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .cloned()
            .collect();
        return Ok(Some(symbols));
    }
    Ok(None)
}

fn store_path(args: &[String], config: &IngestConfig) -> PathBuf {
    flag_value(args, "--store")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.store_path.clone())
}

fn print_report(report: &RunReport, store: &Path) {
    for s in &report.succeeded {
        let outcome = match s.outcome {
            UpsertOutcome::Inserted => "inserted",
            UpsertOutcome::Updated => "updated",
        };
        println!("{:<8} {} via {} ({} fields)", s.symbol, outcome, s.provider, s.fields);
    }
    for f in &report.failed {
        println!("{:<8} failed: {}", f.symbol, f.reason);
    }
    println!(
        "Done: {} succeeded, {} failed, {} skipped -> {}",
        report.succeeded.len(),
        report.failed.len(),
        report.skipped,
        store.display()
    );
}

async fn run_ingest(args: &[String], config: IngestConfig) -> Result<()> {
    let Some(symbols) = resolve_symbols(args)? else {
        print_usage();
        std::process::exit(1);
    };
    if symbols.is_empty() {
        bail!("no symbols to ingest");
    }

    let path = store_path(args, &config);
    let mut store = MetricsStore::open(&path)
        .with_context(|| format!("failed to open store {}", path.display()))?;

    let providers = provider_clients::build_providers(&config.provider_order, config.http_timeout)?;
    let orchestrator = FallbackOrchestrator::new(providers, config.retry_policy(), config.pacer());

    tracing::info!(
        "data-loader: {} symbols, store={}, providers={:?}",
        symbols.len(),
        path.display(),
        orchestrator.provider_order()
    );

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received SIGINT, stopping after the current symbol");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let report = run_batch(&orchestrator, &mut store, &symbols, &stop).await?;
    print_report(&report, &path);
    Ok(())
}

fn run_portfolio(args: &[String], config: IngestConfig) -> Result<()> {
    let diversification = flag_number(args, "--diversification")?;
    let max_risk = flag_number(args, "--max-risk")?;
    let params = PortfolioParams::new(diversification, max_risk)?;

    let path = store_path(args, &config);
    let store = MetricsStore::open(&path)
        .with_context(|| format!("failed to open store {}", path.display()))?;

    let allocation = query_portfolio(&store, &params);
    println!("{}", serde_json::to_string_pretty(&allocation)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = IngestConfig::from_env()?;

    match args.first().map(|s| s.as_str()) {
        Some("ingest") => run_ingest(&args[1..], config).await,
        Some("portfolio") => run_portfolio(&args[1..], config),
        _ => {
            print_usage();
            std::process::exit(1);
        }
    }
}
