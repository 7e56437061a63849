/// (lower bound inclusive, holdings)
const HOLDING_STEPS: [(u32, usize); 8] = [
    (90, 35),
    (80, 30),
    (70, 25),
    (60, 20),
    (50, 15),
    (40, 10),
    (20, 8),
    (0, 5),
];

/// Number of holdings for a diversification level in 0..=100. Piecewise
/// constant; values above 100 saturate.
pub fn holding_count(diversification: u32) -> usize {
    HOLDING_STEPS
        .iter()
        .find(|(lower, _)| diversification >= *lower)
        .map(|(_, count)| *count)
        .unwrap_or(5)
}

/// Weights for `count` ranked positions on a log curve from 10^0 down to
/// 10^-0.5, normalized to sum to 100. Rank 0 gets the largest weight.
pub fn rank_weights(count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let raw: Vec<f64> = (0..count)
        .map(|i| {
            let t = if count == 1 {
                0.0
            } else {
                -0.5 * i as f64 / (count - 1) as f64
            };
            10f64.powf(t)
        })
        .collect();
    let total: f64 = raw.iter().sum();
    raw.iter().map(|w| w / total * 100.0).collect()
}

/// Truncates each weight to a whole percentage.
///
/// The result sums to at most 100 and at least `100 - weights.len()`; the
/// shortfall is left in place rather than redistributed.
pub fn truncate_weights(weights: &[f64]) -> Vec<u32> {
    weights.iter().map(|w| w.max(0.0).trunc() as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_holding_count_steps() {
        assert_eq!(holding_count(0), 5);
        assert_eq!(holding_count(19), 5);
        assert_eq!(holding_count(20), 8);
        assert_eq!(holding_count(40), 10);
        assert_eq!(holding_count(50), 15);
        assert_eq!(holding_count(65), 20);
        assert_eq!(holding_count(79), 25);
        assert_eq!(holding_count(80), 30);
        assert_eq!(holding_count(100), 35);
    }

    #[test]
    fn test_holding_count_is_monotone() {
        let counts: Vec<usize> = (0..=100).map(holding_count).collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_rank_weights_shape() {
        let w = rank_weights(5);
        assert_eq!(w.len(), 5);
        assert_relative_eq!(w.iter().sum::<f64>(), 100.0, epsilon = 1e-9);
        assert!(w.windows(2).all(|p| p[0] > p[1]));
        // first over last is 10^0.5
        assert_relative_eq!(w[0] / w[4], 10f64.sqrt(), epsilon = 1e-9);

        assert_eq!(rank_weights(1), vec![100.0]);
        assert!(rank_weights(0).is_empty());
    }

    #[test]
    fn test_truncated_weights() {
        assert_eq!(truncate_weights(&rank_weights(5)), vec![32, 24, 18, 13, 10]);
        assert_eq!(truncate_weights(&rank_weights(2)), vec![75, 24]);
    }

    #[test]
    fn test_truncation_bounds_for_every_table_count() {
        for count in [5, 8, 10, 15, 20, 25, 30, 35] {
            let total: u32 = truncate_weights(&rank_weights(count)).iter().sum();
            assert!(total <= 100, "count {} sums to {}", count, total);
            assert!(total as usize >= 100 - count, "count {} sums to {}", count, total);
        }
    }
}
