//! Performance metrics module.
//!
//! Provides the return statistics used by the regime backtest:
//! - Simple period returns from prices
//! - Mean return
//! - Compounded path and maximum drawdown

pub mod calculator;

pub use calculator::{DrawdownAnalysis, MetricsCalculator};
