use market_core::{
    BlendSubScores, MetricsRecord, ScoreBreakdown, ScoreResult, ScoringStrategy, StrategyKind,
};

use crate::{clamp_score, round2};

/// Neutral score for a component whose inputs are absent
const NEUTRAL: f64 = 50.0;
/// P/E assumed when the record has no positive P/E
const FALLBACK_PE: f64 = 50.0;

/// Technical + fundamental + analyst blend. Applies to any record.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullBlendStrategy;

impl FullBlendStrategy {
    pub fn new() -> Self {
        Self
    }

    pub fn sub_scores(&self, r: &MetricsRecord) -> BlendSubScores {
        let pe = if r.pe_ratio > 0.0 { r.pe_ratio } else { FALLBACK_PE };

        BlendSubScores {
            value: clamp_score(100.0 - pe),
            growth: clamp_score(r.quarterly_earnings_growth_yoy * 300.0),
            profitability: clamp_score(r.return_on_equity * 400.0 + r.profit_margin * 200.0),
            dividend: clamp_score(r.dividend_yield * 8000.0),
            risk: clamp_score(100.0 - (r.beta - 1.0).abs() * 100.0),
            stability: clamp_score(100.0 - (r.price_to_book_ratio - 1.0) * 50.0),
            sentiment: sentiment_score(r),
            range: range_score(r.price, r.week_52_high, r.week_52_low),
            trend: trend_score(r.moving_average_50, r.moving_average_200),
        }
    }
}

fn sentiment_score(r: &MetricsRecord) -> f64 {
    let total = r.analyst_ratings.total();
    if total == 0 {
        return NEUTRAL;
    }
    let weighted = r.analyst_ratings.weighted_total() as f64;
    clamp_score(weighted / (total as f64 * 5.0) * 100.0)
}

/// Position of price inside its 52-week range; peaks at the midpoint.
fn range_score(price: f64, high: f64, low: f64) -> f64 {
    if high <= 0.0 || low <= 0.0 || high == low {
        return NEUTRAL;
    }
    let position = (price - low) / (high - low);
    clamp_score((1.0 - (position - 0.5).abs()) * 200.0)
}

fn trend_score(ma50: f64, ma200: f64) -> f64 {
    if ma50 <= 0.0 || ma200 <= 0.0 {
        return NEUTRAL;
    }
    clamp_score(ma50 / ma200 * 100.0)
}

impl ScoringStrategy for FullBlendStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FullBlend
    }

    fn applies_to(&self, _record: &MetricsRecord) -> bool {
        true
    }

    fn score(&self, record: &MetricsRecord) -> ScoreResult {
        let s = self.sub_scores(record);

        let roi = 0.30 * s.value
            + 0.30 * s.profitability
            + 0.20 * s.growth
            + 0.10 * s.dividend
            + 0.10 * s.trend;
        let risk = 0.35 * s.risk + 0.30 * s.stability + 0.15 * s.sentiment + 0.20 * s.range;

        ScoreResult {
            symbol: record.symbol.clone(),
            breakdown: ScoreBreakdown::FullBlend(s),
            roi_score: round2(clamp_score(roi)),
            risk_score: round2(clamp_score(risk)),
        }
    }
}
