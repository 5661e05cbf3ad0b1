pub mod calendar;
pub mod loader;
pub mod types;

pub use calendar::{align, resample_last};
pub use loader::{DataLoader, LoaderError, HY_IG_SPREAD, VIX_RATIO};
pub use types::{AlignedPanel, Granularity, MarketData, TimeSeries};
