//! Regime-by-sector aggregation.
//!
//! For every (regime, sector) pair, collects the sector returns of the
//! periods carrying that regime and reports mean return and drawdown.
//! Periods without a label, and periods where the sector has no return,
//! never contribute.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::Granularity;
use crate::metrics::MetricsCalculator;
use crate::regime::Regime;

use super::config::DrawdownMode;

/// Summary of one sector's behaviour within one regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSectorAggregate {
    pub regime: Regime,
    pub sector: String,
    pub granularity: Granularity,
    /// Labelled periods with a defined sector return.
    pub periods: usize,
    pub mean_return: f64,
    pub max_drawdown: f64,
    pub avg_drawdown: f64,
}

/// Aggregation settings.
#[derive(Debug, Clone)]
pub struct AggregationOptions {
    pub granularity: Granularity,
    pub drawdown_mode: DrawdownMode,
    /// Groups with fewer periods are omitted (never below 1).
    pub min_periods: usize,
}

/// Aggregate sector returns by regime.
///
/// `labels` and each return series share the same time index. Output is
/// sorted by regime, then sector.
pub fn aggregate_by_regime(
    labels: &[Option<Regime>],
    sector_returns: &BTreeMap<String, Vec<Option<f64>>>,
    options: &AggregationOptions,
) -> Vec<RegimeSectorAggregate> {
    let mut rows: Vec<RegimeSectorAggregate> = sector_returns
        .par_iter()
        .flat_map(|(sector, returns)| {
            if returns.len() != labels.len() {
                warn!(
                    sector = sector.as_str(),
                    returns = returns.len(),
                    labels = labels.len(),
                    "Return series length differs from label history"
                );
            }
            aggregate_sector(sector, labels, returns, options)
        })
        .collect();

    rows.sort_by(|a, b| (a.regime, &a.sector).cmp(&(b.regime, &b.sector)));
    rows
}

fn aggregate_sector(
    sector: &str,
    labels: &[Option<Regime>],
    returns: &[Option<f64>],
    options: &AggregationOptions,
) -> Vec<RegimeSectorAggregate> {
    let min_periods = options.min_periods.max(1);

    // Full-history drawdown treats a missing return as a flat period
    let full_drawdowns = match options.drawdown_mode {
        DrawdownMode::FullHistory => {
            let filled: Vec<f64> = returns.iter().map(|r| r.unwrap_or(0.0)).collect();
            Some(MetricsCalculator::drawdown_series(&filled))
        }
        DrawdownMode::RegimeRestricted => None,
    };

    Regime::ALL
        .iter()
        .filter_map(|&regime| {
            let indices: Vec<usize> = labels
                .iter()
                .zip(returns)
                .enumerate()
                .filter(|(_, (label, ret))| **label == Some(regime) && ret.is_some())
                .map(|(idx, _)| idx)
                .collect();

            if indices.len() < min_periods {
                return None;
            }

            let restricted: Vec<f64> = indices.iter().filter_map(|&i| returns[i]).collect();
            let mean_return = MetricsCalculator::mean(&restricted)?;

            let (max_drawdown, avg_drawdown) = match &full_drawdowns {
                None => {
                    let analysis = MetricsCalculator::analyze_drawdown(&restricted);
                    (analysis.max_drawdown, analysis.avg_drawdown)
                }
                Some(series) => {
                    let values: Vec<f64> = indices.iter().map(|&i| series[i]).collect();
                    let max = values.iter().cloned().fold(0.0, f64::max);
                    (max, MetricsCalculator::mean(&values).unwrap_or(0.0))
                }
            };

            Some(RegimeSectorAggregate {
                regime,
                sector: sector.to_string(),
                granularity: options.granularity,
                periods: indices.len(),
                mean_return,
                max_drawdown,
                avg_drawdown,
            })
        })
        .collect()
}
