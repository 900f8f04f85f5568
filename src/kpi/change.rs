//! Relative change between series values

/// Percentage change of the last value relative to the first.
/// Zero for fewer than two values or a zero baseline.
pub fn percentage_change(values: &[f64]) -> f64 {
    let (Some(first), Some(last)) = (values.first(), values.last()) else {
        return 0.0;
    };
    if values.len() < 2 || *first == 0.0 || !first.is_finite() || !last.is_finite() {
        return 0.0;
    }
    (last / first - 1.0) * 100.0
}

/// Each value as a percentage change from the first non-zero value,
/// rounded to one decimal. Values before the baseline read 0.
pub fn relative_to_baseline(values: &[f64]) -> Vec<f64> {
    let mut baseline: Option<f64> = None;
    values
        .iter()
        .map(|&v| {
            if baseline.is_none() && v > 0.0 {
                baseline = Some(v);
            }
            match baseline {
                Some(b) => ((v / b - 1.0) * 1000.0).round() / 10.0,
                None => 0.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value_is_zero() {
        assert_eq!(percentage_change(&[1234.0]), 0.0);
        assert_eq!(percentage_change(&[]), 0.0);
    }

    #[test]
    fn test_zero_baseline_is_zero() {
        assert_eq!(percentage_change(&[0.0, 50.0]), 0.0);
    }

    #[test]
    fn test_change_uses_first_and_last() {
        assert_eq!(percentage_change(&[1000.0, 5000.0, 2000.0]), 100.0);
        assert_eq!(percentage_change(&[200.0, 150.0]), -25.0);
    }

    #[test]
    fn test_relative_to_baseline() {
        assert_eq!(relative_to_baseline(&[0.0, 100.0, 150.0, 90.0]), vec![0.0, 0.0, 50.0, -10.0]);
        assert!(relative_to_baseline(&[]).is_empty());
    }
}
