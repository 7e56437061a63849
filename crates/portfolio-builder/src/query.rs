use market_core::PortfolioAllocation;
use metrics_store::MetricsStore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PortfolioBuilder;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortfolioError {
    #[error("diversification must be between 0 and 100, got {0}")]
    InvalidDiversification(i64),
}

/// Validated portfolio request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioParams {
    diversification: u32,
    /// Exclusive ceiling on risk_score
    max_risk: f64,
}

impl PortfolioParams {
    /// `max_risk` is not range-checked: anything at or below 0 filters out
    /// every row, anything above 100 filters none.
    pub fn new(diversification: i64, max_risk: i64) -> Result<Self, PortfolioError> {
        if !(0..=100).contains(&diversification) {
            return Err(PortfolioError::InvalidDiversification(diversification));
        }
        Ok(Self {
            diversification: diversification as u32,
            max_risk: max_risk as f64,
        })
    }

    pub fn diversification(&self) -> u32 {
        self.diversification
    }

    pub fn max_risk(&self) -> f64 {
        self.max_risk
    }
}

/// Read-only portfolio query over the current store contents.
pub fn query_portfolio(store: &MetricsStore, params: &PortfolioParams) -> PortfolioAllocation {
    let records = store.records();
    tracing::info!(
        "Building portfolio from {} rows (diversification {}, max risk {})",
        records.len(),
        params.diversification(),
        params.max_risk()
    );
    PortfolioBuilder::default().build(&records, params)
}
