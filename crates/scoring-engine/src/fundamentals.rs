use market_core::{
    FundamentalSubScores, MetricsRecord, ScoreBreakdown, ScoreResult, ScoringStrategy,
    StrategyKind,
};

use crate::{clamp_score, round2};

/// Risk score when the record has no debt-to-equity figure
const NEUTRAL_RISK: f64 = 50.0;

/// Revenue growth / P/E / dividend / debt blend for records that only carry
/// fundamentals (no price range, moving averages or analyst ratings).
#[derive(Debug, Clone, Copy, Default)]
pub struct FundamentalsOnlyStrategy;

impl FundamentalsOnlyStrategy {
    pub fn new() -> Self {
        Self
    }

    pub fn sub_scores(&self, r: &MetricsRecord) -> FundamentalSubScores {
        FundamentalSubScores {
            revenue_growth: revenue_growth_score(r.revenue_growth.unwrap_or(0.0)),
            revenue_growth_5y: revenue_growth_score(r.revenue_growth_5y.unwrap_or(0.0)),
            pe: clamp_score(100.0 - ((r.pe_ratio - 20.0) / 20.0 * 100.0).abs()),
            dividend: clamp_score(r.dividend_yield * 2000.0),
            debt: r.debt_to_equity.map(debt_score),
        }
    }
}

/// Concave in growth: 50% growth and above scores 100.
fn revenue_growth_score(growth: f64) -> f64 {
    if growth <= 0.0 {
        return 0.0;
    }
    clamp_score(100.0 * (100.0 * growth / 50.0).powf(0.7))
}

fn debt_score(debt_to_equity: f64) -> f64 {
    if debt_to_equity < 0.0 {
        // negative equity
        return 0.0;
    }
    clamp_score(100.0 - debt_to_equity * 50.0)
}

impl ScoringStrategy for FundamentalsOnlyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FundamentalsOnly
    }

    fn applies_to(&self, record: &MetricsRecord) -> bool {
        record.revenue_growth.is_some() && !record.has_technical_data()
    }

    fn score(&self, record: &MetricsRecord) -> ScoreResult {
        let s = self.sub_scores(record);
        let breakdown = ScoreBreakdown::FundamentalsOnly(s);

        let components = breakdown.components();
        let roi = components.iter().map(|(_, v)| v).sum::<f64>() / components.len() as f64;
        let risk = s.debt.unwrap_or(NEUTRAL_RISK);

        ScoreResult {
            symbol: record.symbol.clone(),
            breakdown,
            roi_score: round2(clamp_score(roi)),
            risk_score: round2(clamp_score(risk)),
        }
    }
}
