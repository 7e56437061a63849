pub mod alpaca;
pub mod alpha_vantage;
pub mod fmp;
pub mod http;
pub mod yahoo_finance;

pub use alpaca::AlpacaBarsClient;
pub use alpha_vantage::AlphaVantageClient;
pub use fmp::FmpClient;
pub use yahoo_finance::YahooFinanceClient;

use market_core::{ConfigError, MetricsProvider, ProviderKind};
use std::sync::Arc;
use std::time::Duration;

/// Builds the adapter for `kind`, reading its credentials from the environment.
pub fn build_provider(
    kind: ProviderKind,
    timeout: Duration,
) -> Result<Arc<dyn MetricsProvider>, ConfigError> {
    let provider: Arc<dyn MetricsProvider> = match kind {
        ProviderKind::Alpaca => Arc::new(AlpacaBarsClient::from_env(timeout)?),
        ProviderKind::Yahoo => Arc::new(YahooFinanceClient::new(timeout)?),
        ProviderKind::AlphaVantage => Arc::new(AlphaVantageClient::from_env(timeout)?),
        ProviderKind::Fmp => Arc::new(FmpClient::from_env(timeout)?),
    };
    Ok(provider)
}

/// Builds every adapter in `order`. Fails on the first missing credential so
/// a misconfigured run aborts before any request goes out.
pub fn build_providers(
    order: &[ProviderKind],
    timeout: Duration,
) -> Result<Vec<Arc<dyn MetricsProvider>>, ConfigError> {
    order.iter().map(|kind| build_provider(*kind, timeout)).collect()
}

/// Reads the first non-blank variable among `names`.
pub(crate) fn env_credential(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

pub(crate) fn require_credential(
    provider: ProviderKind,
    var: &str,
    value: String,
) -> Result<String, ConfigError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ConfigError::MissingCredential {
            provider,
            var: var.to_string(),
        });
    }
    Ok(value)
}
