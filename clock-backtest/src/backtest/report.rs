//! Backtest output snapshot.
//!
//! A run writes two files into the output directory, replacing any
//! previous run:
//! - `backtest_results.json`: the full [`BacktestReport`]
//! - `quadrant_history_monthly.csv`: the monthly regime history

use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::Granularity;
use crate::regime::{CurrentRegime, RegimePoint, RegimeStats};

use super::aggregate::RegimeSectorAggregate;
use super::config::BacktestConfig;
use super::engine::BacktestError;
use super::ranking::SectorPreferences;

pub const RESULTS_FILE: &str = "backtest_results.json";
pub const HISTORY_FILE: &str = "quadrant_history_monthly.csv";

/// Results for one reporting grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GranularityReport {
    pub granularity: Granularity,
    /// Percentile window used on this grid.
    pub window: usize,
    pub periods: usize,
    pub labelled_periods: usize,
    pub history: Vec<RegimePoint>,
    pub distribution: Vec<RegimeStats>,
    pub aggregates: Vec<RegimeSectorAggregate>,
    pub preferences: Vec<SectorPreferences>,
}

/// Complete result of a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub generated_at: String,
    pub config: BacktestConfig,
    pub indicator_a: String,
    pub indicator_b: String,
    pub sectors: Vec<String>,
    pub monthly: GranularityReport,
    pub quarterly: GranularityReport,
    pub current_regime: Option<CurrentRegime>,
}

/// Files written by [`BacktestReport::write`].
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub results: PathBuf,
    pub history: PathBuf,
}

impl BacktestReport {
    /// Report for one grid.
    pub fn granularity(&self, granularity: Granularity) -> &GranularityReport {
        match granularity {
            Granularity::Monthly => &self.monthly,
            Granularity::Quarterly => &self.quarterly,
        }
    }

    /// Monthly regime history as a DataFrame.
    pub fn history_frame(&self) -> PolarsResult<DataFrame> {
        let history = &self.monthly.history;

        let dates: Vec<String> = history.iter().map(|p| p.date.to_string()).collect();
        let a: Vec<f64> = history.iter().map(|p| p.indicator_a).collect();
        let b: Vec<f64> = history.iter().map(|p| p.indicator_b).collect();
        let a_rank: Vec<Option<f64>> = history.iter().map(|p| p.a_rank).collect();
        let b_rank: Vec<Option<f64>> = history.iter().map(|p| p.b_rank).collect();
        let stress: Vec<Option<&str>> = history
            .iter()
            .map(|p| p.regime.map(|r| if r.elevated_stress() { "High" } else { "Low" }))
            .collect();
        let credit: Vec<Option<&str>> = history
            .iter()
            .map(|p| p.regime.map(|r| if r.tight_credit() { "Tight" } else { "Easy" }))
            .collect();
        let code: Vec<Option<&str>> = history.iter().map(|p| p.regime.map(|r| r.code())).collect();
        let label: Vec<Option<&str>> = history
            .iter()
            .map(|p| p.regime.map(|r| r.description()))
            .collect();

        DataFrame::new(vec![
            Series::new("date".into(), dates).into(),
            Series::new(self.indicator_a.as_str().into(), a).into(),
            Series::new(self.indicator_b.as_str().into(), b).into(),
            Series::new("a_rank".into(), a_rank).into(),
            Series::new("b_rank".into(), b_rank).into(),
            Series::new("stress_class".into(), stress).into(),
            Series::new("credit_class".into(), credit).into(),
            Series::new("quadrant".into(), code).into(),
            Series::new("quadrant_label".into(), label).into(),
        ])
    }

    /// Write the JSON snapshot and history CSV, overwriting earlier output.
    pub fn write(&self, output_dir: impl AsRef<Path>) -> Result<ReportPaths, BacktestError> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let results = output_dir.join(RESULTS_FILE);
        fs::write(&results, serde_json::to_string_pretty(self)?)?;

        let history = output_dir.join(HISTORY_FILE);
        let mut df = self.history_frame()?;
        let mut file = fs::File::create(&history)?;
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;

        info!(results = %results.display(), history = %history.display(), "Backtest saved");
        Ok(ReportPaths { results, history })
    }

    /// Generate a summary report.
    pub fn summary(&self) -> String {
        let mut out = String::new();

        out.push_str("Investment Clock Backtest\n");
        out.push_str("=========================\n\n");
        out.push_str(&format!(
            "Indicators: {} / {}\nSectors: {}\n",
            self.indicator_a,
            self.indicator_b,
            self.sectors.join(", ")
        ));

        match &self.current_regime {
            Some(current) => out.push_str(&format!(
                "Current regime ({}): {} [ranks {:.2} / {:.2}]\n",
                current.date, current.label, current.a_rank, current.b_rank
            )),
            None => out.push_str("Current regime: undefined (insufficient history)\n"),
        }

        for report in [&self.monthly, &self.quarterly] {
            out.push_str(&format!(
                "\n{} (window {}): {} periods, {} labelled\n",
                report.granularity, report.window, report.periods, report.labelled_periods
            ));
            for stats in &report.distribution {
                out.push_str(&format!(
                    "  {:<42} {:>4} periods ({:.1}%)\n",
                    stats.regime.description(),
                    stats.periods,
                    stats.pct_of_total
                ));
            }
            for prefs in &report.preferences {
                out.push_str(&format!(
                    "  {} favorites: {} | avoid: {}\n",
                    prefs.regime.code(),
                    prefs.favorite_by_return.join(", "),
                    prefs.unfavorite_by_return.join(", ")
                ));
            }
        }

        out
    }
}
