pub mod backtest;
pub mod data;
pub mod metrics;
pub mod regime;
pub mod validation;

// Re-export commonly used types
pub use backtest::{BacktestConfig, BacktestEngine, BacktestError, BacktestReport, DrawdownMode};
pub use data::{AlignedPanel, DataLoader, Granularity, MarketData, TimeSeries};
pub use metrics::{DrawdownAnalysis, MetricsCalculator};
pub use regime::{CurrentRegime, Regime, RegimeClassifier};
pub use validation::{DataIntegrityValidator, ValidationError};
