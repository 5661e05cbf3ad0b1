//! Investment clock regime classifier.
//!
//! Ranks the two driver indicators against their own trailing history and
//! places each period in one of four quadrants.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::AlignedPanel;

use super::percentile::{rolling_percentile_rank, trailing_median};

/// Investment clock quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Low stress horizon, easy credit.
    StableExpansion,
    /// Low stress horizon, tight credit.
    LateCycle,
    /// High stress horizon, easy credit.
    ShockRegime,
    /// High stress horizon, tight credit.
    StructuralStress,
}

impl Regime {
    pub const ALL: [Regime; 4] = [
        Regime::StableExpansion,
        Regime::LateCycle,
        Regime::ShockRegime,
        Regime::StructuralStress,
    ];

    /// Quadrant from the two indicator ranks. A rank at or above the
    /// threshold counts as "above".
    pub fn from_ranks(a_rank: f64, b_rank: f64, threshold: f64) -> Self {
        match (a_rank >= threshold, b_rank >= threshold) {
            (false, false) => Self::StableExpansion,
            (false, true) => Self::LateCycle,
            (true, false) => Self::ShockRegime,
            (true, true) => Self::StructuralStress,
        }
    }

    /// Whether the stress-horizon indicator is in its upper half.
    pub fn elevated_stress(&self) -> bool {
        matches!(self, Self::ShockRegime | Self::StructuralStress)
    }

    /// Whether the credit indicator is in its upper half.
    pub fn tight_credit(&self) -> bool {
        matches!(self, Self::LateCycle | Self::StructuralStress)
    }

    /// Short code, `<stress>_<credit>`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StableExpansion => "Low_Easy",
            Self::LateCycle => "Low_Tight",
            Self::ShockRegime => "High_Easy",
            Self::StructuralStress => "High_Tight",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::StableExpansion => "Stable expansion (Risk-on)",
            Self::LateCycle => "Late cycle (Selective)",
            Self::ShockRegime => "Shock regime (Buy recovery)",
            Self::StructuralStress => "Structural stress (Capital preservation)",
        }
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// One classified period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimePoint {
    pub date: NaiveDate,
    pub indicator_a: f64,
    pub indicator_b: f64,
    pub a_rank: Option<f64>,
    pub b_rank: Option<f64>,
    pub regime: Option<Regime>,
}

/// Share of history spent in a regime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeStats {
    pub regime: Regime,
    pub periods: usize,
    pub pct_of_total: f64,
    pub avg_indicator_a: f64,
    pub avg_indicator_b: f64,
}

/// Latest classified period with the thresholds used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentRegime {
    pub date: NaiveDate,
    pub regime: Regime,
    pub label: String,
    pub indicator_a: f64,
    pub indicator_b: f64,
    pub a_rank: f64,
    pub b_rank: f64,
    pub threshold: f64,
    /// Trailing-window median of the raw indicator values.
    pub a_window_median: Option<f64>,
    pub b_window_median: Option<f64>,
}

/// Regime classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeClassifierConfig {
    /// Trailing window for percentile ranks, in periods.
    pub window: usize,
    /// Rank threshold splitting low from high.
    pub threshold: f64,
}

impl Default for RegimeClassifierConfig {
    fn default() -> Self {
        Self {
            window: 60, // 5 years of months
            threshold: 0.5,
        }
    }
}

/// Rolling percentile regime classifier.
pub struct RegimeClassifier {
    config: RegimeClassifierConfig,
}

impl RegimeClassifier {
    pub fn new(config: RegimeClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegimeClassifierConfig {
        &self.config
    }

    /// Label for a pair of ranks; undefined if either rank is.
    pub fn classify(&self, a_rank: Option<f64>, b_rank: Option<f64>) -> Option<Regime> {
        Some(Regime::from_ranks(a_rank?, b_rank?, self.config.threshold))
    }

    /// Classify two aligned indicator series.
    pub fn classify_series(
        &self,
        dates: &[NaiveDate],
        indicator_a: &[f64],
        indicator_b: &[f64],
    ) -> Vec<RegimePoint> {
        let a_ranks = rolling_percentile_rank(indicator_a, self.config.window);
        let b_ranks = rolling_percentile_rank(indicator_b, self.config.window);

        dates
            .iter()
            .zip(indicator_a.iter().zip(indicator_b))
            .zip(a_ranks.into_iter().zip(b_ranks))
            .map(|((&date, (&a, &b)), (a_rank, b_rank))| RegimePoint {
                date,
                indicator_a: a,
                indicator_b: b,
                a_rank,
                b_rank,
                regime: self.classify(a_rank, b_rank),
            })
            .collect()
    }

    /// Classify every period of an aligned panel.
    pub fn classify_panel(&self, panel: &AlignedPanel) -> Vec<RegimePoint> {
        self.classify_series(&panel.dates, &panel.indicator_a, &panel.indicator_b)
    }

    /// Regime distribution over the labelled part of a history.
    pub fn stats(history: &[RegimePoint]) -> BTreeMap<Regime, RegimeStats> {
        let mut stats: BTreeMap<Regime, RegimeStats> = BTreeMap::new();
        let labelled: Vec<_> = history
            .iter()
            .filter_map(|p| p.regime.map(|r| (r, p)))
            .collect();

        for (regime, point) in &labelled {
            let entry = stats.entry(*regime).or_insert_with(|| RegimeStats {
                regime: *regime,
                periods: 0,
                pct_of_total: 0.0,
                avg_indicator_a: 0.0,
                avg_indicator_b: 0.0,
            });
            entry.periods += 1;
            entry.avg_indicator_a += point.indicator_a;
            entry.avg_indicator_b += point.indicator_b;
        }

        for entry in stats.values_mut() {
            entry.pct_of_total = entry.periods as f64 / labelled.len() as f64 * 100.0;
            entry.avg_indicator_a /= entry.periods as f64;
            entry.avg_indicator_b /= entry.periods as f64;
        }

        stats
    }

    /// Regime at the latest period, if that period is labelled.
    pub fn current(&self, history: &[RegimePoint]) -> Option<CurrentRegime> {
        let last = history.last()?;
        let regime = last.regime?;

        let a_values: Vec<f64> = history.iter().map(|p| p.indicator_a).collect();
        let b_values: Vec<f64> = history.iter().map(|p| p.indicator_b).collect();

        Some(CurrentRegime {
            date: last.date,
            regime,
            label: regime.description().to_string(),
            indicator_a: last.indicator_a,
            indicator_b: last.indicator_b,
            a_rank: last.a_rank?,
            b_rank: last.b_rank?,
            threshold: self.config.threshold,
            a_window_median: trailing_median(&a_values, self.config.window),
            b_window_median: trailing_median(&b_values, self.config.window),
        })
    }
}

impl Default for RegimeClassifier {
    fn default() -> Self {
        Self::new(RegimeClassifierConfig::default())
    }
}
