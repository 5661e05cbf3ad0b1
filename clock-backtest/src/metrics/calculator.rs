//! Return and drawdown calculations.
//!
//! Drawdowns are measured on a compounded path that starts from a base of
//! 1.0, so a loss in the first period already counts against the peak.
//! They are reported as non-negative fractions of the running peak.

use serde::{Deserialize, Serialize};

/// Drawdown analysis details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawdownAnalysis {
    /// Largest peak-to-trough decline.
    pub max_drawdown: f64,
    /// Mean drawdown across all periods, including those at a peak.
    pub avg_drawdown: f64,
}

/// Metrics calculator.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Arithmetic mean; `None` for an empty slice.
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Simple period returns `p_t / p_{t-1} - 1`.
    ///
    /// The first period, periods next to a missing price, and periods
    /// following a non-positive price have no return.
    pub fn simple_returns(prices: &[Option<f64>]) -> Vec<Option<f64>> {
        let mut returns = Vec::with_capacity(prices.len());
        returns.push(None);
        for pair in prices.windows(2) {
            let ret = match (pair[0], pair[1]) {
                (Some(prev), Some(curr)) if prev > 0.0 => Some(curr / prev - 1.0),
                _ => None,
            };
            returns.push(ret);
        }
        returns.truncate(prices.len());
        returns
    }

    /// Compounded wealth path from a base of 1.0.
    pub fn cumulative_path(returns: &[f64]) -> Vec<f64> {
        returns
            .iter()
            .scan(1.0, |wealth, r| {
                *wealth *= 1.0 + r;
                Some(*wealth)
            })
            .collect()
    }

    /// Drawdown from the running peak after each period.
    pub fn drawdown_series(returns: &[f64]) -> Vec<f64> {
        let mut peak = 1.0_f64;
        Self::cumulative_path(returns)
            .into_iter()
            .map(|wealth| {
                peak = peak.max(wealth);
                if peak > 0.0 {
                    (peak - wealth) / peak
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Analyze drawdown of a return sequence.
    pub fn analyze_drawdown(returns: &[f64]) -> DrawdownAnalysis {
        if returns.is_empty() {
            return DrawdownAnalysis::default();
        }

        let series = Self::drawdown_series(returns);
        DrawdownAnalysis {
            max_drawdown: series.iter().cloned().fold(0.0, f64::max),
            avg_drawdown: Self::mean(&series).unwrap_or(0.0),
        }
    }
}
