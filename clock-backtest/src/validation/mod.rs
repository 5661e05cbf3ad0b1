//! Input validation module.
//!
//! Validates the indicator and sector tables:
//! - Non-empty indicators, at least one sector series
//! - Strictly increasing timestamps (no duplicates)
//! - Finite values
//! - Date gaps relative to the observed frequency
//! - Sector coverage and history length against the rolling window

pub mod data_integrity;

pub use data_integrity::{
    validate_market_data, validate_series, CheckResult, DataIntegrityReport,
    DataIntegrityValidator, ValidationError, ValidationResult,
};
