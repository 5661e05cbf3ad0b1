//! Normalization of raw series onto a month-end or quarter-end grid.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::types::{AlignedPanel, Granularity, MarketData, TimeSeries};

/// Keep the last finite observation of each period, keyed by period end.
///
/// Daily input collapses to one point per period; input already on the grid
/// maps onto itself. Missing and non-finite values are skipped.
pub fn resample_last(series: &TimeSeries, granularity: Granularity) -> TimeSeries {
    let mut buckets: BTreeMap<_, f64> = BTreeMap::new();
    for (date, value) in series.iter() {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            buckets.insert(granularity.period_end(date), v);
        }
    }
    TimeSeries::from_values(series.name.clone(), buckets)
}

/// Align both indicators and all sector prices on a common grid.
///
/// The grid is every period where both indicators have a value and, when
/// sectors are supplied, at least one sector has a price.
pub fn align(data: &MarketData, granularity: Granularity) -> AlignedPanel {
    let a = to_map(&resample_last(&data.indicator_a, granularity));
    let b = to_map(&resample_last(&data.indicator_b, granularity));

    let sectors: Vec<(String, BTreeMap<_, f64>)> = data
        .sectors
        .iter()
        .map(|s| (s.name.clone(), to_map(&resample_last(s, granularity))))
        .collect();

    let sector_dates: BTreeSet<_> = sectors
        .iter()
        .flat_map(|(_, prices)| prices.keys().copied())
        .collect();

    let dates: Vec<_> = a
        .keys()
        .filter(|d| b.contains_key(d))
        .filter(|d| sectors.is_empty() || sector_dates.contains(d))
        .copied()
        .collect();

    debug!(
        granularity = %granularity,
        indicator_a = a.len(),
        indicator_b = b.len(),
        aligned = dates.len(),
        "Aligned series onto common grid"
    );

    let indicator_a = dates.iter().map(|d| a[d]).collect();
    let indicator_b = dates.iter().map(|d| b[d]).collect();
    let sector_prices = sectors
        .into_iter()
        .map(|(name, prices)| {
            let column = dates.iter().map(|d| prices.get(d).copied()).collect();
            (name, column)
        })
        .collect();

    AlignedPanel {
        granularity,
        indicator_a_name: data.indicator_a.name.clone(),
        indicator_b_name: data.indicator_b.name.clone(),
        dates,
        indicator_a,
        indicator_b,
        sector_prices,
    }
}

fn to_map(series: &TimeSeries) -> BTreeMap<chrono::NaiveDate, f64> {
    series
        .iter()
        .filter_map(|(date, value)| value.map(|v| (date, v)))
        .collect()
}
