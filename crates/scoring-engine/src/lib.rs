//! Pure mapping from [`market_core::MetricsRecord`] to 0-100 scores.

mod engine;
mod full_blend;
mod fundamentals;

pub use engine::ScoringEngine;
pub use full_blend::FullBlendStrategy;
pub use fundamentals::FundamentalsOnlyStrategy;

/// Saturates a score to [0, 100]. NaN maps to 0.
pub fn clamp_score(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 100.0)
}

/// Composite scores are reported with two decimals.
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
