use market_core::{MetricsRecord, ScoreResult, ScoringStrategy, StrategyKind};

use crate::{FullBlendStrategy, FundamentalsOnlyStrategy};

/// Picks the first strategy that applies to a record, falling back to the
/// full blend.
pub struct ScoringEngine {
    strategies: Vec<Box<dyn ScoringStrategy>>,
    fallback: FullBlendStrategy,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self::with_strategies(vec![Box::new(FundamentalsOnlyStrategy::new())])
    }

    /// Strategies are consulted in order before the full blend.
    pub fn with_strategies(strategies: Vec<Box<dyn ScoringStrategy>>) -> Self {
        Self {
            strategies,
            fallback: FullBlendStrategy::new(),
        }
    }

    pub fn select(&self, record: &MetricsRecord) -> &dyn ScoringStrategy {
        self.strategies
            .iter()
            .map(|s| &**s)
            .find(|s| s.applies_to(record))
            .unwrap_or(&self.fallback)
    }

    pub fn strategy_for(&self, record: &MetricsRecord) -> StrategyKind {
        self.select(record).kind()
    }

    pub fn score(&self, record: &MetricsRecord) -> ScoreResult {
        self.select(record).score(record)
    }

    /// Scores every record, preserving input order.
    pub fn score_all(&self, records: &[MetricsRecord]) -> Vec<ScoreResult> {
        records.iter().map(|r| self.score(r)).collect()
    }
}
