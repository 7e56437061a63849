use market_core::ProviderKind;
use metrics_store::{MetricsStore, StoreError, UpsertOutcome};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::orchestrator::{FallbackOrchestrator, IngestError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolSuccess {
    pub symbol: String,
    pub provider: ProviderKind,
    pub outcome: UpsertOutcome,
    pub fields: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

/// Result of one batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub succeeded: Vec<SymbolSuccess>,
    pub failed: Vec<SymbolFailure>,
    /// Symbols never attempted because the run was stopped
    pub skipped: usize,
}

impl RunReport {
    pub fn stopped_early(&self) -> bool {
        self.skipped > 0
    }
}

/// Ingests `symbols` one after another, persisting the store after every
/// successful symbol.
///
/// A per-symbol failure is recorded and the run moves on. Only store I/O
/// aborts the batch. `stop` is checked between symbols, so a requested stop
/// takes effect once the current symbol completes.
pub async fn run_batch(
    orchestrator: &FallbackOrchestrator,
    store: &mut MetricsStore,
    symbols: &[String],
    stop: &AtomicBool,
) -> Result<RunReport, StoreError> {
    let mut report = RunReport::default();

    for (i, symbol) in symbols.iter().enumerate() {
        if stop.load(Ordering::SeqCst) {
            report.skipped = symbols.len() - i;
            tracing::warn!("Stop requested, skipping {} remaining symbols", report.skipped);
            break;
        }

        match orchestrator.ingest(symbol).await {
            Ok(ingested) => {
                let outcome = store.upsert(&ingested.metrics);
                store.save()?;
                report.succeeded.push(SymbolSuccess {
                    symbol: ingested.symbol().to_string(),
                    provider: ingested.provider(),
                    outcome,
                    fields: ingested.metrics.supplied.len(),
                });
            }
            Err(e) => {
                let symbol = match &e {
                    IngestError::Exhausted { symbol, .. } => symbol.clone(),
                    IngestError::InvalidSymbol(raw) => raw.clone(),
                };
                tracing::warn!("{}", e);
                report.failed.push(SymbolFailure {
                    symbol,
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Ingestion finished: {} succeeded, {} failed, {} skipped",
        report.succeeded.len(),
        report.failed.len(),
        report.skipped
    );
    Ok(report)
}
