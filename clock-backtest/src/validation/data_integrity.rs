//! Data integrity validation for indicator and sector tables.
//!
//! Two layers:
//! - [`validate_market_data`] enforces the hard input contract before a
//!   backtest (non-empty, every series strictly increasing in time). Any
//!   violation is fatal and names the offending series and timestamp.
//! - [`DataIntegrityValidator`] produces a pass/fail report of softer
//!   checks (finite values, gaps, sector coverage, history length).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::backtest::BacktestConfig;
use crate::data::{align, DataLoader, Granularity, LoaderError, MarketData, TimeSeries};

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Missing series: {0}")]
    MissingSeries(String),

    #[error("Duplicate timestamp {date} in series {series}")]
    DuplicateTimestamp { series: String, date: NaiveDate },

    #[error("Non-monotonic timestamps in series {series}: {date} follows {previous}")]
    NonMonotonic {
        series: String,
        previous: NaiveDate,
        date: NaiveDate,
    },
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Require strictly increasing timestamps.
pub fn validate_series(series: &TimeSeries) -> ValidationResult<()> {
    for pair in series.dates.windows(2) {
        let (previous, date) = (pair[0], pair[1]);
        if date == previous {
            return Err(ValidationError::DuplicateTimestamp {
                series: series.name.clone(),
                date,
            });
        }
        if date < previous {
            return Err(ValidationError::NonMonotonic {
                series: series.name.clone(),
                previous,
                date,
            });
        }
    }
    Ok(())
}

/// Enforce the input contract for a backtest run.
pub fn validate_market_data(data: &MarketData) -> ValidationResult<()> {
    for indicator in [&data.indicator_a, &data.indicator_b] {
        if indicator.present_count() == 0 {
            return Err(ValidationError::EmptyDataset(format!(
                "indicator {} has no observations",
                indicator.name
            )));
        }
        validate_series(indicator)?;
    }

    if data.sectors.is_empty() {
        return Err(ValidationError::MissingSeries("sector returns".to_string()));
    }
    for sector in &data.sectors {
        validate_series(sector)?;
    }

    Ok(())
}

/// Result of a single validation check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }
}

impl std::fmt::Display for CheckResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(f, "[{}] {}: {}", status, self.name, self.message)?;
        if let Some(details) = &self.details {
            write!(f, "\n       {}", details)?;
        }
        Ok(())
    }
}

/// Complete data integrity report for one data directory.
#[derive(Debug)]
pub struct DataIntegrityReport {
    pub series_count: usize,
    pub aligned_periods: usize,
    pub checks: Vec<CheckResult>,
}

impl DataIntegrityReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        let total = self.checks.len();
        format!(
            "{} series, {} aligned monthly periods: {}/{} checks passed",
            self.series_count, self.aligned_periods, passed, total
        )
    }
}

/// Validator for the tables in a data directory.
pub struct DataIntegrityValidator {
    loader: DataLoader,
    config: BacktestConfig,
}

impl DataIntegrityValidator {
    pub fn new(data_dir: impl AsRef<std::path::Path>, config: BacktestConfig) -> Self {
        Self {
            loader: DataLoader::new(data_dir),
            config,
        }
    }

    /// Load the configured tables and run all checks.
    pub fn validate(&self) -> ValidationResult<DataIntegrityReport> {
        let data = self.loader.load_market_data(
            &self.config.indicators_file,
            &self.config.sectors_file,
            &self.config.indicator_a_column,
            &self.config.indicator_b_column,
        )?;
        Ok(self.validate_data(&data))
    }

    /// Run all checks on an already loaded snapshot.
    pub fn validate_data(&self, data: &MarketData) -> DataIntegrityReport {
        let all: Vec<&TimeSeries> = [&data.indicator_a, &data.indicator_b]
            .into_iter()
            .chain(data.sectors.iter())
            .collect();

        let mut checks = Vec::new();

        // 1. Timestamp ordering
        checks.push(self.check_timestamp_order(&all));

        // 2. Finite values
        checks.push(self.check_finite_values(&all));

        // 3. Date gaps in indicators
        checks.push(self.check_date_gaps(&[&data.indicator_a, &data.indicator_b]));

        // 4. Sector coverage
        checks.push(self.check_sector_coverage(&data.sectors));

        // 5. History length against the rolling window
        let aligned_periods = if checks[0].passed {
            align(data, Granularity::Monthly).len()
        } else {
            0
        };
        checks.push(self.check_history_length(aligned_periods));

        DataIntegrityReport {
            series_count: all.len(),
            aligned_periods,
            checks,
        }
    }

    fn check_timestamp_order(&self, series: &[&TimeSeries]) -> CheckResult {
        let issues: Vec<String> = series
            .iter()
            .filter_map(|s| validate_series(s).err())
            .map(|e| e.to_string())
            .collect();

        if issues.is_empty() {
            CheckResult::pass("timestamp_order", "All series strictly increasing")
        } else {
            CheckResult::fail(
                "timestamp_order",
                &format!("{} series out of order", issues.len()),
                Some(issues.join("; ")),
            )
        }
    }

    fn check_finite_values(&self, series: &[&TimeSeries]) -> CheckResult {
        let issues: Vec<String> = series
            .iter()
            .filter_map(|s| {
                let bad = s
                    .values
                    .iter()
                    .filter(|v| v.map_or(false, |x| !x.is_finite()))
                    .count();
                (bad > 0).then(|| format!("{}: {} non-finite", s.name, bad))
            })
            .collect();

        if issues.is_empty() {
            CheckResult::pass("finite_values", "No NaN or infinite values")
        } else {
            CheckResult::fail(
                "finite_values",
                &format!("{} series with non-finite values", issues.len()),
                Some(issues.join(", ")),
            )
        }
    }

    /// Flag gaps longer than the series' typical spacing allows.
    fn check_date_gaps(&self, series: &[&TimeSeries]) -> CheckResult {
        let mut gaps = Vec::new();

        for s in series {
            let present: Vec<NaiveDate> = s
                .iter()
                .filter(|(_, v)| v.is_some())
                .map(|(d, _)| d)
                .collect();
            let spacing: Vec<i64> = present.windows(2).map(|w| (w[1] - w[0]).num_days()).collect();
            let Some(max_gap) = allowed_gap(&spacing) else {
                continue;
            };

            for window in present.windows(2) {
                let gap_days = (window[1] - window[0]).num_days();
                if gap_days > max_gap {
                    gaps.push(format!(
                        "{}: {} to {} ({} days)",
                        s.name, window[0], window[1], gap_days
                    ));
                }
            }
        }

        if gaps.is_empty() {
            CheckResult::pass("date_gaps", "No major gaps in indicator history")
        } else {
            CheckResult::fail(
                "date_gaps",
                &format!("{} major gaps found", gaps.len()),
                Some(gaps.join(", ")),
            )
        }
    }

    fn check_sector_coverage(&self, sectors: &[TimeSeries]) -> CheckResult {
        if sectors.is_empty() {
            return CheckResult::fail("sector_coverage", "No sector series found", None);
        }

        let coverage: BTreeMap<&str, (usize, Option<NaiveDate>)> = sectors
            .iter()
            .map(|s| {
                let first = s.iter().find(|(_, v)| v.is_some()).map(|(d, _)| d);
                (s.name.as_str(), (s.present_count(), first))
            })
            .collect();

        let empty: Vec<&str> = coverage
            .iter()
            .filter(|(_, (count, _))| *count == 0)
            .map(|(name, _)| *name)
            .collect();

        let details = coverage
            .iter()
            .map(|(name, (count, first))| match first {
                Some(first) => format!("{} from {} ({} obs)", name, first, count),
                None => format!("{} empty", name),
            })
            .collect::<Vec<_>>()
            .join(", ");

        if empty.is_empty() {
            let mut check = CheckResult::pass(
                "sector_coverage",
                &format!("{} sectors with prices", sectors.len()),
            );
            check.details = Some(details);
            check
        } else {
            CheckResult::fail(
                "sector_coverage",
                &format!("{} sectors without prices", empty.len()),
                Some(details),
            )
        }
    }

    fn check_history_length(&self, aligned_periods: usize) -> CheckResult {
        let required = self.config.rolling_window + 1;
        if aligned_periods >= required {
            CheckResult::pass(
                "history_length",
                &format!(
                    "{} aligned periods cover the {}-period window",
                    aligned_periods, self.config.rolling_window
                ),
            )
        } else {
            CheckResult::fail(
                "history_length",
                &format!(
                    "{} aligned periods, {} needed for regime aggregates",
                    aligned_periods, required
                ),
                None,
            )
        }
    }
}

/// Largest acceptable gap given the observed spacing: a week for daily
/// data (weekends and holidays), two months for monthly data, two quarters
/// beyond that.
fn allowed_gap(spacing: &[i64]) -> Option<i64> {
    if spacing.is_empty() {
        return None;
    }
    let mut sorted = spacing.to_vec();
    sorted.sort_unstable();
    let median = sorted[sorted.len() / 2];
    let allowed = if median <= 7 {
        7
    } else if median <= 31 {
        62
    } else {
        184
    };
    Some(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Months;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly(name: &str, n: usize, value: impl Fn(usize) -> f64) -> TimeSeries {
        let start = date(2020, 1, 31);
        TimeSeries::from_values(
            name,
            (0..n).map(|i| (start.checked_add_months(Months::new(i as u32)).unwrap(), value(i))),
        )
    }

    fn sample(n: usize) -> MarketData {
        MarketData {
            indicator_a: monthly("VIX_RATIO", n, |i| 0.8 + 0.01 * i as f64),
            indicator_b: monthly("HY_IG_SPREAD", n, |i| 3.0 - 0.01 * i as f64),
            sectors: vec![monthly("XLK", n, |i| 100.0 + i as f64)],
        }
    }

    #[test]
    fn test_duplicate_timestamp_is_fatal() {
        let series = TimeSeries::from_values(
            "XLF",
            vec![(date(2024, 1, 31), 1.0), (date(2024, 1, 31), 2.0)],
        );
        match validate_series(&series).unwrap_err() {
            ValidationError::DuplicateTimestamp { series, date: d } => {
                assert_eq!(series, "XLF");
                assert_eq!(d, date(2024, 1, 31));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_monotonic_is_fatal() {
        let mut data = sample(4);
        data.indicator_b.dates.swap(1, 2);
        match validate_market_data(&data).unwrap_err() {
            ValidationError::NonMonotonic {
                series,
                previous,
                date: d,
            } => {
                assert_eq!(series, "HY_IG_SPREAD");
                assert!(d < previous);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_and_missing_inputs() {
        let mut data = sample(3);
        data.sectors.clear();
        assert!(matches!(
            validate_market_data(&data),
            Err(ValidationError::MissingSeries(_))
        ));

        let mut data = sample(3);
        data.indicator_a = TimeSeries::new("VIX_RATIO");
        assert!(matches!(
            validate_market_data(&data),
            Err(ValidationError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_report_on_clean_data() {
        let config = BacktestConfig {
            rolling_window: 6,
            ..BacktestConfig::default()
        };
        let validator = DataIntegrityValidator::new("unused", config);
        let report = validator.validate_data(&sample(12));

        assert!(report.all_passed(), "{:?}", report.failed_checks());
        assert_eq!(report.series_count, 3);
        assert_eq!(report.aligned_periods, 12);
    }

    #[test]
    fn test_report_flags_problems() {
        let mut data = sample(12);
        data.indicator_a.values[3] = Some(f64::NAN);
        data.indicator_b.values[5] = None;
        data.indicator_b.values[6] = None;
        data.indicator_b.values[7] = None;
        data.sectors.push(TimeSeries::from_points("XLRE", vec![(date(2020, 1, 31), None)]));

        let validator = DataIntegrityValidator::new("unused", BacktestConfig::default());
        let report = validator.validate_data(&data);

        let failed: Vec<&str> = report.failed_checks().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            failed,
            vec!["finite_values", "date_gaps", "sector_coverage", "history_length"]
        );
    }

    #[test]
    fn test_check_lines_name_the_problem() {
        let mut data = sample(12);
        data.sectors.push(TimeSeries::from_points("XLRE", vec![(date(2020, 1, 31), None)]));

        let validator = DataIntegrityValidator::new("unused", BacktestConfig::default());
        let report = validator.validate_data(&data);

        let coverage = report
            .checks
            .iter()
            .find(|c| c.name == "sector_coverage")
            .unwrap();
        let line = coverage.to_string();
        assert!(line.starts_with("[FAIL] sector_coverage: "), "{line}");
        assert!(line.contains("XLRE"), "{line}");

        let order = report
            .checks
            .iter()
            .find(|c| c.name == "timestamp_order")
            .unwrap();
        assert_eq!(order.to_string(), "[PASS] timestamp_order: All series strictly increasing");
    }

    #[test]
    fn test_allowed_gap() {
        assert_eq!(allowed_gap(&[]), None);
        assert_eq!(allowed_gap(&[1, 1, 3, 1]), Some(7));
        assert_eq!(allowed_gap(&[31, 29, 31, 30]), Some(62));
        assert_eq!(allowed_gap(&[92, 91]), Some(184));
    }
}
