//! Market regime classification module.
//!
//! Places each period in one of four investment clock quadrants using the
//! rolling percentile rank of two indicators:
//! - Stable Expansion: low stress horizon, easy credit
//! - Late Cycle: low stress horizon, tight credit
//! - Shock Regime: high stress horizon, easy credit
//! - Structural Stress: high stress horizon, tight credit

pub mod classifier;
pub mod percentile;

pub use classifier::{
    CurrentRegime, Regime, RegimeClassifier, RegimeClassifierConfig, RegimePoint, RegimeStats,
};
pub use percentile::{percentile_rank, rolling_percentile_rank, trailing_median};
