//! Regime backtest module.
//!
//! Joins the regime history with sector returns:
//! - Run configuration loaded from TOML
//! - Per-regime sector aggregates (mean return, drawdown)
//! - Favorite and unfavorite sector rankings
//! - Monthly and quarterly reports written as JSON and CSV

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod ranking;
pub mod report;

pub use aggregate::{aggregate_by_regime, AggregationOptions, RegimeSectorAggregate};
pub use config::{BacktestConfig, ConfigError, DrawdownMode};
pub use engine::{BacktestEngine, BacktestError};
pub use ranking::{sector_preferences, SectorPreferences};
pub use report::{BacktestReport, GranularityReport, ReportPaths, HISTORY_FILE, RESULTS_FILE};
