//! Data loader for indicator and sector tables.
//!
//! The ingestion step leaves two tables in the data directory:
//! - an indicator table: `date`, `VIX_RATIO`, `HY_IG_SPREAD`
//!   (or the raw `VIX1M`, `VIX3M`, `HY_OAS`, `IG_OAS` columns)
//! - a sector price table: `date` plus one column per sector ticker
//!
//! Files ending in `.parquet` are scanned with the parquet reader, anything
//! else is parsed as CSV. Empty cells load as missing values.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;
use tracing::info;

use super::types::{MarketData, TimeSeries};

pub const DATE_COLUMN: &str = "date";
pub const VIX_RATIO: &str = "VIX_RATIO";
pub const HY_IG_SPREAD: &str = "HY_IG_SPREAD";

/// Raw provider columns the indicators can be derived from.
pub const VIX1M: &str = "VIX1M";
pub const VIX3M: &str = "VIX3M";
pub const HY_OAS: &str = "HY_OAS";
pub const IG_OAS: &str = "IG_OAS";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Missing column '{column}' in {file}")]
    MissingColumn { file: String, column: String },

    #[error("Invalid date '{value}' in {file} at row {row}")]
    InvalidDate {
        file: String,
        row: usize,
        value: String,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tabular store reader for a single data directory.
pub struct DataLoader {
    data_dir: PathBuf,
}

impl DataLoader {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn table_path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    /// Load a table as a DataFrame.
    pub fn load_dataframe(&self, file: &str) -> Result<DataFrame, LoaderError> {
        let path = self.table_path(file);
        if !path.exists() {
            return Err(LoaderError::FileNotFound(path.display().to_string()));
        }

        let is_parquet = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("parquet"));

        let df = if is_parquet {
            LazyFrame::scan_parquet(&path, ScanArgsParquet::default())?.collect()?
        } else {
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(10_000))
                .try_into_reader_with_file_path(Some(path.clone()))?
                .finish()?
        };

        info!(file = %path.display(), rows = df.height(), columns = df.width(), "Loaded table");
        Ok(df)
    }

    /// Load the two driver indicators.
    ///
    /// When a requested column is absent and it is one of the standard
    /// indicator names, it is derived from the raw provider columns.
    pub fn load_indicators(
        &self,
        file: &str,
        a_column: &str,
        b_column: &str,
    ) -> Result<(TimeSeries, TimeSeries), LoaderError> {
        let df = self.load_dataframe(file)?;
        let dates = parse_dates(&df, file)?;

        let a = indicator_values(&df, file, a_column)?;
        let b = indicator_values(&df, file, b_column)?;

        Ok((
            TimeSeries::from_points(a_column, dates.iter().copied().zip(a)),
            TimeSeries::from_points(b_column, dates.into_iter().zip(b)),
        ))
    }

    /// Load every non-date column of the sector table as a price series.
    pub fn load_sectors(&self, file: &str) -> Result<Vec<TimeSeries>, LoaderError> {
        let df = self.load_dataframe(file)?;
        let dates = parse_dates(&df, file)?;
        let date_column = date_column_name(&df, file)?;

        let mut sectors = Vec::new();
        for column in df.get_columns() {
            let name = column.name().to_string();
            if name == date_column {
                continue;
            }
            let values = column_values(&df, file, &name)?;
            sectors.push(TimeSeries::from_points(name, dates.iter().copied().zip(values)));
        }

        info!(file, sectors = sectors.len(), "Loaded sector series");
        Ok(sectors)
    }

    /// Load the complete input snapshot for a backtest run.
    pub fn load_market_data(
        &self,
        indicators_file: &str,
        sectors_file: &str,
        a_column: &str,
        b_column: &str,
    ) -> Result<MarketData, LoaderError> {
        let (indicator_a, indicator_b) = self.load_indicators(indicators_file, a_column, b_column)?;
        let sectors = self.load_sectors(sectors_file)?;
        Ok(MarketData {
            indicator_a,
            indicator_b,
            sectors,
        })
    }
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// The `date` column, or the first column when the index was written unnamed.
fn date_column_name(df: &DataFrame, file: &str) -> Result<String, LoaderError> {
    if has_column(df, DATE_COLUMN) {
        return Ok(DATE_COLUMN.to_string());
    }
    df.get_columns()
        .first()
        .map(|c| c.name().to_string())
        .ok_or_else(|| LoaderError::MissingColumn {
            file: file.to_string(),
            column: DATE_COLUMN.to_string(),
        })
}

/// Parse the date column, accepting string, date and datetime types.
fn parse_dates(df: &DataFrame, file: &str) -> Result<Vec<NaiveDate>, LoaderError> {
    let name = date_column_name(df, file)?;
    let column = df.column(&name)?;

    match column.dtype() {
        DataType::String => {
            let mut dates = Vec::with_capacity(df.height());
            for (row, value) in column.str()?.into_iter().enumerate() {
                let raw = value.unwrap_or_default();
                let parsed = raw
                    .get(..10)
                    .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                    .ok_or_else(|| LoaderError::InvalidDate {
                        file: file.to_string(),
                        row,
                        value: raw.to_string(),
                    })?;
                dates.push(parsed);
            }
            Ok(dates)
        }
        DataType::Date | DataType::Datetime(_, _) => {
            let days = column.cast(&DataType::Date)?.cast(&DataType::Int32)?;
            let mut dates = Vec::with_capacity(df.height());
            for (row, value) in days.i32()?.into_iter().enumerate() {
                let parsed = value.map(date_from_days).ok_or_else(|| LoaderError::InvalidDate {
                    file: file.to_string(),
                    row,
                    value: "null".to_string(),
                })?;
                dates.push(parsed);
            }
            Ok(dates)
        }
        other => Err(LoaderError::InvalidData(format!(
            "{} column '{}' has unexpected type {}",
            file, name, other
        ))),
    }
}

/// Read a numeric column as optional f64 values.
fn column_values(df: &DataFrame, file: &str, name: &str) -> Result<Vec<Option<f64>>, LoaderError> {
    if !has_column(df, name) {
        return Err(LoaderError::MissingColumn {
            file: file.to_string(),
            column: name.to_string(),
        });
    }
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// Read an indicator column, deriving it from raw inputs when needed.
fn indicator_values(
    df: &DataFrame,
    file: &str,
    name: &str,
) -> Result<Vec<Option<f64>>, LoaderError> {
    if has_column(df, name) {
        return column_values(df, file, name);
    }

    let derived = match name {
        VIX_RATIO if has_column(df, VIX1M) && has_column(df, VIX3M) => {
            let near = column_values(df, file, VIX1M)?;
            let far = column_values(df, file, VIX3M)?;
            combine(near, far, |n, f| (f != 0.0).then(|| n / f))
        }
        HY_IG_SPREAD if has_column(df, HY_OAS) && has_column(df, IG_OAS) => {
            let hy = column_values(df, file, HY_OAS)?;
            let ig = column_values(df, file, IG_OAS)?;
            combine(hy, ig, |h, i| Some(h - i))
        }
        _ => {
            return Err(LoaderError::MissingColumn {
                file: file.to_string(),
                column: name.to_string(),
            })
        }
    };

    info!(file, column = name, "Derived indicator from raw provider columns");
    Ok(derived)
}

fn combine(
    left: Vec<Option<f64>>,
    right: Vec<Option<f64>>,
    f: impl Fn(f64, f64) -> Option<f64>,
) -> Vec<Option<f64>> {
    left.into_iter()
        .zip(right)
        .map(|(l, r)| match (l, r) {
            (Some(l), Some(r)) => f(l, r),
            _ => None,
        })
        .collect()
}

/// Convert days since Unix epoch to NaiveDate.
fn date_from_days(days: i32) -> NaiveDate {
    NaiveDate::from_num_days_from_ce_opt(days + 719163).unwrap_or_default()
}
