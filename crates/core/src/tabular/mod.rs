//! Tabular codecs for the raw and silver layers
//!
//! Raw extracts are CSV files decoded into all-optional string records.
//! Silver datasets are Parquet files written from typed rows through Arrow.

mod columnar;
mod delimited;

pub use columnar::{decode_parquet, encode_parquet};
pub use delimited::{CsvRead, read_csv};

use arrow::datatypes::SchemaRef;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised by the tabular codecs
#[derive(Error, Debug)]
pub enum TabularError {
    /// The CSV header could not be read
    #[error("CSV header unreadable: {0}")]
    CsvHeader(String),

    /// Arrow conversion failed
    #[error("Arrow error: {0}")]
    Arrow(String),

    /// Parquet encoding or decoding failed
    #[error("Parquet error: {0}")]
    Parquet(String),

    /// Row (de)serialization failed
    #[error("Row serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<arrow::error::ArrowError> for TabularError {
    fn from(err: arrow::error::ArrowError) -> Self {
        TabularError::Arrow(err.to_string())
    }
}

impl From<parquet::errors::ParquetError> for TabularError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        TabularError::Parquet(err.to_string())
    }
}

/// A typed dataset stored in the silver layer
pub trait SilverDataset: Serialize + DeserializeOwned {
    /// Object path relative to the store root
    const PATH: &'static str;

    /// Arrow schema; field names match the serde field names
    fn schema() -> SchemaRef;
}
