//! Error types for the granule subsetter.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Boxed error used as the source of transport failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type alias using SubsetError.
pub type SubsetResult<T> = Result<T, SubsetError>;

/// Primary error type for subsetting operations.
#[derive(Debug, Error)]
pub enum SubsetError {
    // === Granule-scoped errors ===
    /// Transport or authentication failure opening a remote resource.
    #[error("Access error: {message}")]
    Access {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A requested group or variable path does not exist.
    #[error("Schema error in group '{group}': {message}")]
    Schema { group: String, message: String },

    /// Arrays within a group disagree in length.
    #[error("Shape error in group '{group}': '{path}' has {actual} elements, expected {expected}")]
    Shape {
        group: String,
        path: String,
        expected: usize,
        actual: usize,
    },

    // === Run-fatal errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    // === Infrastructure errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SubsetError {
    /// Build an access error with an underlying cause.
    pub fn access<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        SubsetError::Access {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build an access error without an underlying cause.
    pub fn access_msg(message: impl Into<String>) -> Self {
        SubsetError::Access {
            message: message.into(),
            source: None,
        }
    }

    /// Build a schema error for a missing group or variable.
    pub fn schema(group: impl Into<String>, message: impl Into<String>) -> Self {
        SubsetError::Schema {
            group: group.into(),
            message: message.into(),
        }
    }

    /// Category of this error as seen by the orchestrator.
    pub fn kind(&self) -> GranuleErrorKind {
        match self {
            SubsetError::Access { .. } | SubsetError::Io(_) => GranuleErrorKind::Access,
            SubsetError::Schema { .. } => GranuleErrorKind::Schema,
            SubsetError::Shape { .. } => GranuleErrorKind::Shape,
            SubsetError::Config(_) => GranuleErrorKind::Config,
            SubsetError::Internal(_) => GranuleErrorKind::Internal,
        }
    }
}

/// Category of a granule failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GranuleErrorKind {
    Access,
    Schema,
    Shape,
    Config,
    Internal,
}

impl GranuleErrorKind {
    /// Whether a failure of this kind must abort the whole run.
    pub fn is_fatal(self) -> bool {
        matches!(self, GranuleErrorKind::Config)
    }
}

impl fmt::Display for GranuleErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GranuleErrorKind::Access => "AccessError",
            GranuleErrorKind::Schema => "SchemaError",
            GranuleErrorKind::Shape => "ShapeError",
            GranuleErrorKind::Config => "ConfigError",
            GranuleErrorKind::Internal => "InternalError",
        };
        f.write_str(name)
    }
}

/// A granule failure normalized for reporting.
///
/// Plain data only: the originating URL, a kind, the top-level message and
/// the rendered cause chain. It can be cloned, sent between threads and
/// serialized into a run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("Unable to read {url}: {kind}: {message}")]
pub struct GranuleError {
    pub url: String,
    pub kind: GranuleErrorKind,
    pub message: String,
    pub causes: Vec<String>,
}

impl GranuleError {
    /// Normalize a subsetting error raised while processing `url`.
    pub fn from_error(url: &str, err: &SubsetError) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            url: url.to_string(),
            kind: err.kind(),
            message: err.to_string(),
            causes,
        }
    }

    /// Failure recorded for a worker that panicked mid-granule.
    pub fn panicked(url: &str, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            kind: GranuleErrorKind::Internal,
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Render message and causes as a single "a: b: c" line.
    pub fn chain(&self) -> String {
        std::iter::once(self.message.as_str())
            .chain(self.causes.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(": ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granule_error_captures_cause_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such key");
        let err = SubsetError::access("failed to stat object", io);
        let granule = GranuleError::from_error("s3://bucket/a.h5", &err);

        assert_eq!(granule.kind, GranuleErrorKind::Access);
        assert_eq!(granule.url, "s3://bucket/a.h5");
        assert_eq!(granule.causes, vec!["no such key".to_string()]);
        assert_eq!(
            granule.chain(),
            "Access error: failed to stat object: no such key"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            SubsetError::schema("gt1l", "missing").kind(),
            GranuleErrorKind::Schema
        );
        assert!(SubsetError::Config("bad".into()).kind().is_fatal());
        assert!(!SubsetError::access_msg("timeout").kind().is_fatal());
        assert!(!GranuleErrorKind::Schema.is_fatal());
    }
}
