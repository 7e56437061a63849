use async_trait::async_trait;

use crate::{MetricsRecord, ProviderError, ProviderKind, RawPayload, ScoreResult, StrategyKind};

/// Adapter for one upstream provider.
///
/// Implementations only translate their own wire format. They never retry and
/// hold no state shared with other adapters; retry and pacing belong to the
/// caller.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Outbound HTTP requests made by one `fetch`.
    fn calls_per_fetch(&self) -> u32 {
        1
    }

    async fn fetch(&self, symbol: &str) -> Result<RawPayload, ProviderError>;
}

/// Pure mapping from a metrics record to scores.
pub trait ScoringStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Whether the record carries the metrics this strategy needs.
    fn applies_to(&self, record: &MetricsRecord) -> bool;

    fn score(&self, record: &MetricsRecord) -> ScoreResult;
}
