//! Regime backtest engine.
//!
//! Runs one batch pass over a complete input snapshot:
//! 1. Validate the raw series (fatal on bad input)
//! 2. Normalize onto the monthly and quarterly grids
//! 3. Rank both indicators over the trailing window and label each period
//! 4. Convert sector prices to period returns
//! 5. Aggregate returns and drawdowns by (regime, sector)
//! 6. Rank favorite and unfavorite sectors per regime

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use polars::prelude::PolarsError;
use thiserror::Error;
use tracing::{debug, info};

use crate::data::{align, DataLoader, Granularity, LoaderError, MarketData};
use crate::metrics::MetricsCalculator;
use crate::regime::{Regime, RegimeClassifier};
use crate::validation::{validate_market_data, ValidationError};

use super::aggregate::{aggregate_by_regime, AggregationOptions};
use super::config::{BacktestConfig, ConfigError};
use super::ranking::sector_preferences;
use super::report::{BacktestReport, GranularityReport};

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Batch regime backtester.
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Load the configured tables from `data_dir` and run the backtest.
    pub fn run_from_dir(&self, data_dir: impl AsRef<Path>) -> Result<BacktestReport, BacktestError> {
        let data = DataLoader::new(data_dir).load_market_data(
            &self.config.indicators_file,
            &self.config.sectors_file,
            &self.config.indicator_a_column,
            &self.config.indicator_b_column,
        )?;
        self.run(&data)
    }

    /// Run the backtest over an in-memory snapshot.
    pub fn run(&self, data: &MarketData) -> Result<BacktestReport, BacktestError> {
        self.config.validate()?;
        validate_market_data(data)?;

        let monthly = self.run_granularity(data, Granularity::Monthly)?;
        let quarterly = self.run_granularity(data, Granularity::Quarterly)?;

        let classifier = RegimeClassifier::new(self.config.classifier_config(Granularity::Monthly));
        let current_regime = classifier.current(&monthly.history);
        match &current_regime {
            Some(current) => info!(date = %current.date, regime = %current.regime, "Current regime"),
            None => info!("Current regime undefined"),
        }

        Ok(BacktestReport {
            generated_at: Utc::now().to_rfc3339(),
            config: self.config.clone(),
            indicator_a: data.indicator_a.name.clone(),
            indicator_b: data.indicator_b.name.clone(),
            sectors: data.sector_names(),
            monthly,
            quarterly,
            current_regime,
        })
    }

    fn run_granularity(
        &self,
        data: &MarketData,
        granularity: Granularity,
    ) -> Result<GranularityReport, BacktestError> {
        let panel = align(data, granularity);
        if panel.is_empty() {
            return Err(ValidationError::EmptyDataset(format!(
                "no {} periods where both indicators and a sector price overlap",
                granularity
            ))
            .into());
        }

        let window = self.config.window_for(granularity);
        let classifier = RegimeClassifier::new(self.config.classifier_config(granularity));
        let history = classifier.classify_panel(&panel);
        let labels: Vec<Option<Regime>> = history.iter().map(|p| p.regime).collect();
        let labelled_periods = labels.iter().filter(|l| l.is_some()).count();

        debug!(
            granularity = %granularity,
            warm_up = history.len() - labelled_periods,
            "Periods without a regime label"
        );

        let aggregates = if panel.len() < window + 1 {
            info!(
                granularity = %granularity,
                periods = panel.len(),
                window,
                "Insufficient history for regime aggregates"
            );
            Vec::new()
        } else {
            let returns: BTreeMap<String, Vec<Option<f64>>> = panel
                .sector_prices
                .iter()
                .map(|(sector, prices)| (sector.clone(), MetricsCalculator::simple_returns(prices)))
                .collect();
            let options = AggregationOptions {
                granularity,
                drawdown_mode: self.config.drawdown_mode,
                min_periods: self.config.min_regime_periods,
            };
            aggregate_by_regime(&labels, &returns, &options)
        };

        let preferences = sector_preferences(&aggregates, self.config.favorites_count);
        let distribution = RegimeClassifier::stats(&history).into_values().collect();

        info!(
            granularity = %granularity,
            periods = panel.len(),
            labelled = labelled_periods,
            rows = aggregates.len(),
            "Regime backtest complete"
        );

        Ok(GranularityReport {
            granularity,
            window,
            periods: panel.len(),
            labelled_periods,
            history,
            distribution,
            aggregates,
            preferences,
        })
    }
}

impl Default for BacktestEngine {
    fn default() -> Self {
        Self::new(BacktestConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::DrawdownMode;
    use crate::data::TimeSeries;
    use approx::assert_relative_eq;
    use chrono::{Months, NaiveDate};
    use std::fs;
    use tempfile::TempDir;

    fn month_ends(n: usize) -> Vec<NaiveDate> {
        // Start at a month with 31 days so every offset lands on a month end
        let start = NaiveDate::from_ymd_opt(2015, 1, 31).unwrap();
        (0..n)
            .map(|i| {
                let d = start.checked_add_months(Months::new(i as u32)).unwrap();
                Granularity::Monthly.period_end(d)
            })
            .collect()
    }

    fn sample(n: usize) -> MarketData {
        let dates = month_ends(n);
        let series = |name: &str, f: &dyn Fn(usize) -> f64| {
            TimeSeries::from_values(name, dates.iter().enumerate().map(|(i, d)| (*d, f(i))))
        };
        MarketData {
            indicator_a: series("VIX_RATIO", &|i| 0.9 + 0.1 * ((i * 7 % 11) as f64 / 11.0)),
            indicator_b: series("HY_IG_SPREAD", &|i| 3.0 + ((i * 5 % 13) as f64 / 13.0)),
            sectors: vec![
                series("XLK", &|i| 100.0 * (1.0 + 0.01 * ((i % 4) as f64 - 1.0)).powi(i as i32)),
                series("XLU", &|i| 50.0 + (i % 3) as f64),
            ],
        }
    }

    fn config(window: usize) -> BacktestConfig {
        BacktestConfig {
            rolling_window: window,
            quarterly_window: Some(4),
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn test_run_produces_both_grids() {
        let engine = BacktestEngine::new(config(12));
        let report = engine.run(&sample(48)).unwrap();

        assert_eq!(report.monthly.periods, 48);
        assert_eq!(report.monthly.labelled_periods, 48 - 11);
        assert_eq!(report.quarterly.periods, 16);
        assert_eq!(report.quarterly.labelled_periods, 16 - 3);
        assert!(!report.monthly.aggregates.is_empty());
        assert!(!report.quarterly.aggregates.is_empty());
        assert!(report.current_regime.is_some());
        assert_eq!(report.sectors, vec!["XLK", "XLU"]);
    }

    #[test]
    fn test_aggregates_reference_labelled_periods() {
        let engine = BacktestEngine::new(config(12));
        let report = engine.run(&sample(48)).unwrap();

        for g in Granularity::ALL {
            let r = report.granularity(g);
            for row in &r.aggregates {
                assert_eq!(row.granularity, g);
                let labelled = r.history.iter().filter(|p| p.regime == Some(row.regime)).count();
                assert!(row.periods >= 1);
                assert!(row.periods <= labelled);
            }
        }
    }

    #[test]
    fn test_insufficient_history_yields_empty_aggregates() {
        let engine = BacktestEngine::new(config(12));
        let report = engine.run(&sample(12)).unwrap();

        assert!(report.monthly.aggregates.is_empty());
        assert!(report.monthly.preferences.is_empty());
        // The last period already has a full window
        assert_eq!(report.monthly.labelled_periods, 1);
        assert!(report.current_regime.is_some());
    }

    #[test]
    fn test_aggregates_start_at_window_plus_one() {
        let engine = BacktestEngine::new(config(12));
        let report = engine.run(&sample(13)).unwrap();

        // 13 months fill 5 quarters, one more than the quarterly window
        assert_eq!(report.monthly.periods, 13);
        assert_eq!(report.quarterly.periods, 5);
        assert_eq!(report.monthly.labelled_periods, 2);
        assert!(!report.monthly.aggregates.is_empty());
        assert!(!report.quarterly.aggregates.is_empty());
        assert!(!report.monthly.preferences.is_empty());
    }

    #[test]
    fn test_duplicate_timestamp_is_fatal() {
        let mut data = sample(24);
        let dup = data.sectors[1].dates[4];
        data.sectors[1].dates[5] = dup;

        let err = BacktestEngine::new(config(12)).run(&data).unwrap_err();
        match err {
            BacktestError::Validation(ValidationError::DuplicateTimestamp { series, date }) => {
                assert_eq!(series, "XLU");
                assert_eq!(date, dup);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_overlap_is_fatal() {
        let mut data = sample(24);
        data.sectors = vec![TimeSeries::from_values(
            "XLK",
            vec![(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap(), 1.0)],
        )];

        let err = BacktestEngine::new(config(12)).run(&data).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::Validation(ValidationError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let engine = BacktestEngine::new(config(12));
        let data = sample(36);
        let first = engine.run(&data).unwrap();
        let second = engine.run(&data).unwrap();

        assert_eq!(first.monthly.history, second.monthly.history);
        assert_eq!(first.monthly.aggregates, second.monthly.aggregates);
        assert_eq!(first.quarterly.aggregates, second.quarterly.aggregates);
    }

    #[test]
    fn test_drawdown_mode_changes_only_drawdowns() {
        let data = sample(48);
        let restricted = BacktestEngine::new(config(12)).run(&data).unwrap();
        let full = BacktestEngine::new(BacktestConfig {
            drawdown_mode: DrawdownMode::FullHistory,
            ..config(12)
        })
        .run(&data)
        .unwrap();

        assert_eq!(restricted.monthly.aggregates.len(), full.monthly.aggregates.len());
        for (r, f) in restricted.monthly.aggregates.iter().zip(&full.monthly.aggregates) {
            assert_eq!((r.regime, &r.sector), (f.regime, &f.sector));
            assert_relative_eq!(r.mean_return, f.mean_return);
        }
    }

    #[test]
    fn test_run_from_dir_writes_outputs() {
        let data_dir = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();

        let data = sample(30);
        let mut indicators = String::from("date,VIX_RATIO,HY_IG_SPREAD\n");
        let mut sectors = String::from("date,XLK,XLU\n");
        for i in 0..data.indicator_a.len() {
            let date = data.indicator_a.dates[i];
            indicators.push_str(&format!(
                "{},{},{}\n",
                date,
                data.indicator_a.values[i].unwrap(),
                data.indicator_b.values[i].unwrap()
            ));
            sectors.push_str(&format!(
                "{},{},{}\n",
                date,
                data.sectors[0].values[i].unwrap(),
                data.sectors[1].values[i].unwrap()
            ));
        }
        fs::write(data_dir.path().join("indicators_monthly.csv"), indicators).unwrap();
        fs::write(data_dir.path().join("sector_etfs_monthly.csv"), sectors).unwrap();

        let engine = BacktestEngine::new(config(12));
        let report = engine.run_from_dir(data_dir.path()).unwrap();
        assert_eq!(report.monthly.periods, 30);

        // Stale output is replaced
        fs::write(out_dir.path().join("backtest_results.json"), "stale").unwrap();
        let paths = report.write(out_dir.path()).unwrap();

        let json = fs::read_to_string(&paths.results).unwrap();
        let parsed: BacktestReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.monthly.history.len(), 30);
        assert_eq!(parsed.monthly.history, report.monthly.history);
        assert_eq!(parsed.monthly.aggregates, report.monthly.aggregates);
        assert_eq!(parsed.quarterly.aggregates, report.quarterly.aggregates);

        let csv = fs::read_to_string(&paths.history).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("date,VIX_RATIO,HY_IG_SPREAD,a_rank"));
        assert_eq!(lines.count(), 30);
    }
}
