//! Error types for granule reading.

use thiserror::Error;

/// Result type for granule reader operations.
pub type ReaderResult<T> = Result<T, ReaderError>;

/// Error types for granule reading.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// File I/O error (staging or opening)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Group does not exist at the file root
    #[error("group '{0}' not found")]
    GroupNotFound(String),

    /// Variable path does not exist inside the group
    #[error("variable '{path}' not found in group '{group}'")]
    VariableNotFound { group: String, path: String },

    /// Variable exists but is not a plain numeric array
    #[error("variable '{path}' has unsupported type {dtype}")]
    UnsupportedType { path: String, dtype: String },

    /// File could not be opened or decoded as HDF5/NetCDF-4
    #[error("invalid granule format: {0}")]
    Format(String),
}

impl ReaderError {
    /// True when the error means the requested layout is absent.
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            ReaderError::GroupNotFound(_)
                | ReaderError::VariableNotFound { .. }
                | ReaderError::UnsupportedType { .. }
        )
    }
}
