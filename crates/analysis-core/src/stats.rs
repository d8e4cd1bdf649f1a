//! Small numeric helpers shared by the scoring crates.

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Weighted mean of `(value, weight)` pairs. `None` when the weights sum to zero.
pub fn weighted_mean(pairs: &[(f64, f64)]) -> Option<f64> {
    let total_weight: f64 = pairs.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return None;
    }
    Some(pairs.iter().map(|(v, w)| v * w).sum::<f64>() / total_weight)
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[1.0, 2.0, 3.0]) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_mean() {
        assert_eq!(weighted_mean(&[(0.5, 0.0), (0.2, 0.0)]), None);
        let m = weighted_mean(&[(1.0, 3.0), (0.0, 1.0)]).unwrap();
        assert!((m - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.8567, 2), 0.86);
        assert_eq!(round_to(1.0, 2), 1.0);
    }
}
