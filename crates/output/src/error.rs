//! Error types for output writing.

use thiserror::Error;

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Failed to encode geo metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Column name '{0}' is reserved")]
    ReservedColumn(String),
}
