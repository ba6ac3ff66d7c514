//! Error types for remote access.

use subset_common::SubsetError;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised while opening or reading remote objects.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("unsupported URL scheme in '{0}'")]
    UnsupportedUrl(String),

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("failed to configure transport for {url}")]
    Client {
        url: String,
        #[source]
        source: object_store::Error,
    },

    #[error("transport error reading {url}")]
    Transport {
        url: String,
        #[source]
        source: object_store::Error,
    },

    #[error("prefetch task failed for {url}: {message}")]
    Prefetch { url: String, message: String },

    #[error("range server failed: {0}")]
    RangeServer(String),
}

impl StorageError {
    /// Classify an object_store error raised for `url`.
    pub fn from_object_store(url: &str, err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { .. } => StorageError::NotFound(url.to_string()),
            source => StorageError::Transport {
                url: url.to_string(),
                source,
            },
        }
    }
}

impl From<StorageError> for SubsetError {
    fn from(err: StorageError) -> Self {
        match err {
            // A transport that cannot be built means the run configuration is unusable.
            StorageError::Client { .. } => SubsetError::Config(format!(
                "{}: {}",
                err,
                std::error::Error::source(&err)
                    .map(|s| s.to_string())
                    .unwrap_or_default()
            )),
            other => SubsetError::access("failed to open remote granule", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subset_common::GranuleErrorKind;

    #[test]
    fn test_not_found_is_access() {
        let err: SubsetError = StorageError::NotFound("s3://b/k.h5".into()).into();
        assert_eq!(err.kind(), GranuleErrorKind::Access);
        assert!(!err.kind().is_fatal());
    }

    #[test]
    fn test_unsupported_url_is_access() {
        let err: SubsetError = StorageError::UnsupportedUrl("ftp://x".into()).into();
        assert_eq!(err.kind(), GranuleErrorKind::Access);
    }
}
