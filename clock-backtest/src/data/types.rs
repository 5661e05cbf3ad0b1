//! Core data types for regime backtesting.
//!
//! Raw series keep optional values so gaps from the ingestion step survive
//! until the series are normalized onto a common date grid.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Reporting grid for the backtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Monthly,
    Quarterly,
}

impl Granularity {
    pub const ALL: [Granularity; 2] = [Granularity::Monthly, Granularity::Quarterly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
        }
    }

    /// Last calendar day of the period containing `date`.
    pub fn period_end(&self, date: NaiveDate) -> NaiveDate {
        let last_month = match self {
            Self::Monthly => date.month(),
            Self::Quarterly => date.month0() / 3 * 3 + 3,
        };
        NaiveDate::from_ymd_opt(date.year(), last_month, 1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .and_then(|next| next.pred_opt())
            .unwrap_or(date)
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, time-indexed sequence of observations.
///
/// Dates are expected to be strictly increasing once the series has passed
/// validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub name: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<Option<f64>>,
}

impl TimeSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dates: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn from_points(
        name: impl Into<String>,
        points: impl IntoIterator<Item = (NaiveDate, Option<f64>)>,
    ) -> Self {
        let mut series = Self::new(name);
        for (date, value) in points {
            series.push(date, value);
        }
        series
    }

    /// Build a series where every observation is present.
    pub fn from_values(
        name: impl Into<String>,
        points: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Self {
        Self::from_points(name, points.into_iter().map(|(d, v)| (d, Some(v))))
    }

    pub fn push(&mut self, date: NaiveDate, value: Option<f64>) {
        self.dates.push(date);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Number of observations carrying a finite value.
    pub fn present_count(&self) -> usize {
        self.values
            .iter()
            .filter(|v| v.map_or(false, f64::is_finite))
            .count()
    }

}

/// Raw inputs for a backtest run, as handed over by the ingestion step.
#[derive(Debug, Clone)]
pub struct MarketData {
    /// Stress-horizon indicator (VIX term ratio).
    pub indicator_a: TimeSeries,
    /// Credit-stress indicator (HY-IG spread).
    pub indicator_b: TimeSeries,
    /// Sector price series, one per ticker.
    pub sectors: Vec<TimeSeries>,
}

impl MarketData {
    pub fn sector_names(&self) -> Vec<String> {
        self.sectors.iter().map(|s| s.name.clone()).collect()
    }
}

/// Indicators and sector prices on a common, strictly increasing date grid.
#[derive(Debug, Clone)]
pub struct AlignedPanel {
    pub granularity: Granularity,
    pub indicator_a_name: String,
    pub indicator_b_name: String,
    pub dates: Vec<NaiveDate>,
    pub indicator_a: Vec<f64>,
    pub indicator_b: Vec<f64>,
    pub sector_prices: BTreeMap<String, Vec<Option<f64>>>,
}

impl AlignedPanel {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
