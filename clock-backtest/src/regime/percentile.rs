//! Trailing rolling percentile rank.
//!
//! The rank at index `t` is the fraction of the window `[t-N+1, t]` whose
//! values are `<=` the value at `t`. Indices before the first full window
//! have no rank.

/// Percentile rank of `value` within `window` under the `<=` convention.
pub fn percentile_rank(window: &[f64], value: f64) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    let at_or_below = window.iter().filter(|&&v| v <= value).count();
    Some(at_or_below as f64 / window.len() as f64)
}

/// Rolling percentile rank of each value over the trailing `window` values.
///
/// Output has the same length and order as `values`. The first
/// `window - 1` entries are `None`; a zero window leaves every entry `None`.
pub fn rolling_percentile_rank(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    values
        .iter()
        .enumerate()
        .map(|(t, &value)| {
            if t + 1 < window {
                None
            } else {
                percentile_rank(&values[t + 1 - window..=t], value)
            }
        })
        .collect()
}

/// Median of the trailing `window` values ending at the last element.
pub fn trailing_median(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let mut tail = values[values.len() - window..].to_vec();
    tail.sort_by(f64::total_cmp);
    let mid = tail.len() / 2;
    if tail.len() % 2 == 0 {
        Some((tail[mid - 1] + tail[mid]) / 2.0)
    } else {
        Some(tail[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defined_count_matches_window() {
        let values: Vec<f64> = (0..12).map(|i| ((i * 7) % 5) as f64).collect();
        for len in [0usize, 1, 2, 5, 12] {
            for window in [1usize, 2, 3, 5, 12, 20] {
                let ranks = rolling_percentile_rank(&values[..len], window);
                let expected_defined = (len + 1).saturating_sub(window);
                assert_eq!(ranks.len(), len);
                assert_eq!(ranks.iter().filter(|r| r.is_some()).count(), expected_defined);
                // Undefined entries form a leading prefix
                assert!(ranks[..len - expected_defined].iter().all(Option::is_none));
                assert!(ranks[len - expected_defined..].iter().all(Option::is_some));
            }
        }
    }

    #[test]
    fn test_rank_of_window_max_and_min() {
        let window = [4.0, 9.0, 1.0, 7.0, 3.0];
        assert_eq!(percentile_rank(&window, 9.0), Some(1.0));
        assert_relative_eq!(percentile_rank(&window, 1.0).unwrap(), 1.0 / 5.0);
    }

    #[test]
    fn test_rising_series_ranks_at_top() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ranks = rolling_percentile_rank(&values, 3);
        assert_eq!(ranks[0], None);
        assert_eq!(ranks[1], None);
        assert_eq!(ranks[2], Some(1.0));
        assert!(ranks[2..].iter().all(|r| *r == Some(1.0)));
    }

    #[test]
    fn test_ties_count_as_at_or_below() {
        let ranks = rolling_percentile_rank(&[2.0, 2.0, 2.0], 3);
        assert_eq!(ranks[2], Some(1.0));

        let ranks = rolling_percentile_rank(&[5.0, 1.0, 1.0, 3.0], 4);
        assert_relative_eq!(ranks[3].unwrap(), 0.75);
    }

    #[test]
    fn test_ranks_stay_in_unit_interval() {
        let values: Vec<f64> = (0..50).map(|i| (i as f64 * 1.7).sin()).collect();
        for rank in rolling_percentile_rank(&values, 10).into_iter().flatten() {
            assert!(rank > 0.0 && rank <= 1.0);
        }
    }

    #[test]
    fn test_zero_window() {
        assert_eq!(rolling_percentile_rank(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn test_trailing_median() {
        assert_eq!(trailing_median(&[9.0, 1.0, 3.0, 2.0], 3), Some(2.0));
        assert_eq!(trailing_median(&[1.0, 4.0, 2.0, 3.0], 4), Some(2.5));
        assert_eq!(trailing_median(&[1.0], 2), None);
    }
}
