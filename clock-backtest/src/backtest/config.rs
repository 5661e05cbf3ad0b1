//! Backtest configuration, loaded from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{Granularity, HY_IG_SPREAD, VIX_RATIO};
use crate::regime::RegimeClassifierConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which cumulative path a regime's drawdown is measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawdownMode {
    /// Compound only the periods carrying the regime, in time order.
    #[default]
    RegimeRestricted,
    /// Compound the sector's whole history and read off drawdowns at the
    /// periods carrying the regime.
    FullHistory,
}

/// Configuration for a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Trailing window for monthly percentile ranks, in months.
    pub rolling_window: usize,

    /// Trailing window for quarterly ranks. Defaults to a third of the
    /// monthly window, at least 4 quarters.
    pub quarterly_window: Option<usize>,

    /// Rank threshold splitting low from high.
    pub threshold: f64,

    /// Minimum labelled periods for a (regime, sector) row to be reported.
    pub min_regime_periods: usize,

    /// Drawdown path for regime aggregates.
    pub drawdown_mode: DrawdownMode,

    /// Sectors listed per favorite/unfavorite bucket.
    pub favorites_count: usize,

    /// Indicator table, relative to the data directory.
    pub indicators_file: String,

    /// Sector price table, relative to the data directory.
    pub sectors_file: String,

    /// Stress-horizon indicator column.
    pub indicator_a_column: String,

    /// Credit-stress indicator column.
    pub indicator_b_column: String,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            rolling_window: 60,
            quarterly_window: None,
            threshold: 0.5,
            min_regime_periods: 1,
            drawdown_mode: DrawdownMode::RegimeRestricted,
            favorites_count: 4,
            indicators_file: "indicators_monthly.csv".to_string(),
            sectors_file: "sector_etfs_monthly.csv".to_string(),
            indicator_a_column: VIX_RATIO.to_string(),
            indicator_b_column: HY_IG_SPREAD.to_string(),
        }
    }
}

impl BacktestConfig {
    /// Load and validate a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rolling_window == 0 {
            return Err(ConfigError::Invalid("rolling_window must be positive".into()));
        }
        if self.quarterly_window == Some(0) {
            return Err(ConfigError::Invalid("quarterly_window must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::Invalid(format!(
                "threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        if self.indicator_a_column == self.indicator_b_column {
            return Err(ConfigError::Invalid(
                "indicator columns must differ".into(),
            ));
        }
        Ok(())
    }

    /// Percentile window for a reporting grid.
    pub fn window_for(&self, granularity: Granularity) -> usize {
        match granularity {
            Granularity::Monthly => self.rolling_window,
            Granularity::Quarterly => self
                .quarterly_window
                .unwrap_or_else(|| (self.rolling_window / 3).max(4)),
        }
    }

    /// Classifier settings for a reporting grid.
    pub fn classifier_config(&self, granularity: Granularity) -> RegimeClassifierConfig {
        RegimeClassifierConfig {
            window: self.window_for(granularity),
            threshold: self.threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BacktestConfig::default();
        assert_eq!(config.rolling_window, 60);
        assert_eq!(config.window_for(Granularity::Quarterly), 20);
        assert_eq!(config.drawdown_mode, DrawdownMode::RegimeRestricted);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = BacktestConfig::from_toml_str(
            "rolling_window = 9\n\
             drawdown_mode = \"full_history\"\n",
        )
        .unwrap();
        assert_eq!(config.rolling_window, 9);
        assert_eq!(config.window_for(Granularity::Quarterly), 4);
        assert_eq!(config.drawdown_mode, DrawdownMode::FullHistory);
        assert_eq!(config.sectors_file, "sector_etfs_monthly.csv");
    }

    #[test]
    fn test_explicit_quarterly_window() {
        let config = BacktestConfig::from_toml_str("quarterly_window = 8").unwrap();
        assert_eq!(config.window_for(Granularity::Quarterly), 8);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(matches!(
            BacktestConfig::from_toml_str("rolling_window = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BacktestConfig::from_toml_str("threshold = 1.5"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BacktestConfig::from_toml_str("rolling_window = \"sixty\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
