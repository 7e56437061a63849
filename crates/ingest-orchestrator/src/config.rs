use market_core::{ConfigError, ProviderKind};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::pacer::RequestPacer;
use crate::policy::RetryPolicy;

pub const DEFAULT_PROVIDER_ORDER: &str = "alpha_vantage,yahoo,fmp,alpaca";
pub const DEFAULT_STORE_PATH: &str = "data/stock_data.csv";

/// Published free-tier limits
fn default_min_interval(provider: ProviderKind) -> Duration {
    match provider {
        // 5 calls per minute
        ProviderKind::AlphaVantage => Duration::from_millis(12_000),
        ProviderKind::Fmp => Duration::from_millis(1_000),
        ProviderKind::Yahoo => Duration::from_millis(2_000),
        // 200 calls per minute
        ProviderKind::Alpaca => Duration::from_millis(300),
    }
}

/// Ingestion settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub provider_order: Vec<ProviderKind>,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub min_intervals: HashMap<ProviderKind, Duration>,
    pub http_timeout: Duration,
    pub store_path: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            provider_order: vec![
                ProviderKind::AlphaVantage,
                ProviderKind::Yahoo,
                ProviderKind::Fmp,
                ProviderKind::Alpaca,
            ],
            max_retries: 3,
            backoff_base: Duration::from_millis(2_000),
            min_intervals: ProviderKind::ALL
                .iter()
                .map(|p| (*p, default_min_interval(*p)))
                .collect(),
            http_timeout: Duration::from_secs(10),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: v,
        }),
    }
}

/// Parses a comma-separated provider list. Duplicates keep their first
/// position; an empty list is rejected.
pub fn parse_provider_order(raw: &str) -> Result<Vec<ProviderKind>, ConfigError> {
    let mut order = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let kind: ProviderKind = name.parse().map_err(|_| ConfigError::Invalid {
            key: "PROVIDER_ORDER".to_string(),
            value: name.to_string(),
        })?;
        if !order.contains(&kind) {
            order.push(kind);
        }
    }
    if order.is_empty() {
        return Err(ConfigError::Invalid {
            key: "PROVIDER_ORDER".to_string(),
            value: raw.to_string(),
        });
    }
    Ok(order)
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let provider_order = parse_provider_order(
            &lookup("PROVIDER_ORDER").unwrap_or_else(|| DEFAULT_PROVIDER_ORDER.to_string()),
        )?;

        let max_retries = parse_var("INGEST_MAX_RETRIES", lookup("INGEST_MAX_RETRIES"), 3u32)?;
        let backoff_ms = parse_var(
            "INGEST_BACKOFF_BASE_MS",
            lookup("INGEST_BACKOFF_BASE_MS"),
            2_000u64,
        )?;
        let timeout_secs = parse_var("HTTP_TIMEOUT_SECS", lookup("HTTP_TIMEOUT_SECS"), 10u64)?;

        let mut min_intervals = HashMap::new();
        for provider in ProviderKind::ALL {
            let key = format!("{}_MIN_INTERVAL_MS", provider.env_prefix());
            let default_ms = default_min_interval(provider).as_millis() as u64;
            let ms = parse_var(&key, lookup(&key), default_ms)?;
            min_intervals.insert(provider, Duration::from_millis(ms));
        }

        let store_path = lookup("METRICS_STORE_PATH")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string());

        Ok(Self {
            provider_order,
            max_retries,
            backoff_base: Duration::from_millis(backoff_ms),
            min_intervals,
            http_timeout: Duration::from_secs(timeout_secs),
            store_path: PathBuf::from(store_path),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff_base)
    }

    pub fn pacer(&self) -> RequestPacer {
        RequestPacer::new(self.min_intervals.clone())
    }
}
