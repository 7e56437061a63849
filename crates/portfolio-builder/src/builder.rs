use market_core::{Holding, MetricsRecord, PortfolioAllocation, ScoreResult};
use scoring_engine::ScoringEngine;
use std::cmp::Ordering;

use crate::query::PortfolioParams;
use crate::sizing::{holding_count, rank_weights, truncate_weights};

/// Scores candidates, applies the risk ceiling and weights the best ones.
#[derive(Default)]
pub struct PortfolioBuilder {
    engine: ScoringEngine,
}

impl PortfolioBuilder {
    pub fn new(engine: ScoringEngine) -> Self {
        Self { engine }
    }

    /// Candidates below the risk ceiling, best roi_score first. Ties keep
    /// input order.
    pub fn rank(&self, records: &[MetricsRecord], max_risk: f64) -> Vec<ScoreResult> {
        let mut scored: Vec<ScoreResult> = self
            .engine
            .score_all(records)
            .into_iter()
            .filter(|s| s.risk_score < max_risk)
            .collect();
        scored.sort_by(|a, b| {
            b.roi_score
                .partial_cmp(&a.roi_score)
                .unwrap_or(Ordering::Equal)
        });
        scored
    }

    /// Builds the allocation. Weights are computed for the full holding
    /// count, so a short candidate list keeps only the top weights and sums
    /// to less than the usual total.
    pub fn build(&self, records: &[MetricsRecord], params: &PortfolioParams) -> PortfolioAllocation {
        let count = holding_count(params.diversification());
        let ranked = self.rank(records, params.max_risk());
        let weights = truncate_weights(&rank_weights(count));

        let holdings: Vec<Holding> = ranked
            .into_iter()
            .zip(weights)
            .map(|(score, weight)| {
                tracing::debug!(
                    "Picked {} (roi {:.2}, risk {:.2}, {}) at {}%",
                    score.symbol,
                    score.roi_score,
                    score.risk_score,
                    score.strategy(),
                    weight
                );
                Holding {
                    symbol: score.symbol,
                    weight,
                }
            })
            .collect();

        if holdings.len() < count {
            tracing::info!(
                "Only {} of {} holdings passed the risk ceiling {}",
                holdings.len(),
                count,
                params.max_risk()
            );
        }
        PortfolioAllocation { holdings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Record whose full-blend scores are driven by P/E (roi) and beta (risk).
    fn record(symbol: &str, pe: f64, beta: f64) -> MetricsRecord {
        let mut r = MetricsRecord::new(symbol).unwrap();
        r.pe_ratio = pe;
        r.beta = beta;
        r
    }

    fn params(diversification: i64, max_risk: i64) -> PortfolioParams {
        PortfolioParams::new(diversification, max_risk).unwrap()
    }

    fn universe(n: usize) -> Vec<MetricsRecord> {
        (0..n)
            .map(|i| record(&format!("S{:02}", i), 5.0 + i as f64, 1.0 + (i % 7) as f64 * 0.1))
            .collect()
    }

    #[test]
    fn test_risk_ceiling_is_exclusive() {
        let builder = PortfolioBuilder::default();
        let records = universe(40);
        // beta 1.0 scores 82.5 risk, every other beta in the universe lands below 80
        let ranked = builder.rank(&records, 80.0);
        assert_eq!(ranked.len(), 34);
        assert!(ranked.iter().all(|s| s.risk_score < 80.0));

        assert_eq!(builder.rank(&records, 82.5).len(), 34);
        assert_eq!(builder.rank(&records, 82.51).len(), 40);
    }

    #[test]
    fn test_sorted_by_roi_with_stable_ties() {
        let builder = PortfolioBuilder::default();
        let records = vec![
            record("LOW", 60.0, 1.0),
            record("TIE1", 10.0, 1.0),
            record("HIGH", 2.0, 1.0),
            record("TIE2", 10.0, 1.0),
        ];
        let ranked = builder.rank(&records, 101.0);
        let symbols: Vec<&str> = ranked.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["HIGH", "TIE1", "TIE2", "LOW"]);
        assert!(ranked.windows(2).all(|w| w[0].roi_score >= w[1].roi_score));
    }

    #[test]
    fn test_allocation_size_and_weights() {
        let builder = PortfolioBuilder::default();
        let allocation = builder.build(&universe(40), &params(50, 101));

        assert_eq!(allocation.len(), 15);
        let total = allocation.total_weight();
        assert!(total <= 100 && total >= 85, "total {}", total);
        assert!(allocation.holdings.windows(2).all(|w| w[0].weight >= w[1].weight));
        assert_eq!(allocation.holdings[0].symbol, "S00");
    }

    #[test]
    fn test_short_candidate_list_returns_all_survivors() {
        let builder = PortfolioBuilder::default();
        let records = vec![record("A", 10.0, 1.0), record("B", 20.0, 1.0)];
        let allocation = builder.build(&records, &params(0, 101));

        assert_eq!(allocation.symbols(), vec!["A", "B"]);
        // first two of the five-holding curve
        assert_eq!(
            allocation.holdings.iter().map(|h| h.weight).collect::<Vec<_>>(),
            vec![32, 24]
        );
    }

    #[test]
    fn test_everything_filtered_gives_empty_allocation() {
        let builder = PortfolioBuilder::default();
        let allocation = builder.build(&universe(10), &params(100, 0));
        assert!(allocation.is_empty());
        assert_eq!(allocation.total_weight(), 0);
    }
}
