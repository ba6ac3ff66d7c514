//! Transport configuration shared read-only by every worker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use subset_common::{SubsetError, SubsetResult};

/// Default bytes fetched per request (8 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 8 * 1024 * 1024;

/// Default number of blocks kept per open file.
pub const DEFAULT_CACHE_BLOCKS: usize = 32;

/// Default region for direct S3 access (NSIDC buckets live in us-west-2).
pub const DEFAULT_REGION: &str = "us-west-2";

/// How a remote file caches the bytes it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    /// Every read becomes an exact range request.
    None,
    /// Reads are widened to whole blocks, kept in an LRU.
    Blocks,
    /// As `Blocks`, and the following block is fetched in the background.
    #[default]
    Background,
}

impl FromStr for CacheStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CacheStrategy::None),
            "blocks" | "readahead" | "read-ahead" => Ok(CacheStrategy::Blocks),
            "background" => Ok(CacheStrategy::Background),
            other => Err(format!("unknown cache strategy '{}'", other)),
        }
    }
}

/// Temporary object-storage keys.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// How requests are authenticated.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// No explicit credentials; the transport's own defaults apply.
    #[default]
    Anonymous,
    /// Key/secret/session-token triple for direct S3 access.
    Static(StaticCredentials),
    /// Bearer token sent as an `Authorization` header on HTTPS requests.
    Bearer { token: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => f.write_str("Anonymous"),
            Credentials::Static(creds) => f.debug_tuple("Static").field(creds).finish(),
            Credentials::Bearer { .. } => f.write_str("Bearer(<redacted>)"),
        }
    }
}

/// Transport configuration for a run.
///
/// Built once before dispatch and never mutated afterwards; credentials that
/// expire mid-run are not refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub cache_strategy: CacheStrategy,
    /// Bytes per fetch
    pub block_size: usize,
    /// Blocks kept per open file
    pub cache_blocks: usize,
    pub credentials: Credentials,
    /// Region used for `s3://` URLs
    pub region: String,
    /// Request timeout in seconds (0 = transport default)
    pub timeout_secs: u64,
    /// Proxy for HTTP(S) and S3 requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            cache_strategy: CacheStrategy::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            cache_blocks: DEFAULT_CACHE_BLOCKS,
            credentials: Credentials::Anonymous,
            region: DEFAULT_REGION.to_string(),
            timeout_secs: 0,
            proxy_url: None,
        }
    }
}

impl AccessConfig {
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_cache(mut self, strategy: CacheStrategy, block_size: usize) -> Self {
        self.cache_strategy = strategy;
        self.block_size = block_size;
        self
    }

    /// Reject configurations that cannot work for any granule.
    pub fn validate(&self) -> SubsetResult<()> {
        if self.block_size == 0 {
            return Err(SubsetError::Config("block size must be > 0".into()));
        }
        if self.cache_blocks == 0 {
            return Err(SubsetError::Config("cache must hold at least one block".into()));
        }
        match &self.credentials {
            Credentials::Anonymous => {}
            Credentials::Static(creds) => {
                if creds.access_key_id.is_empty()
                    || creds.secret_access_key.is_empty()
                    || creds.session_token.is_empty()
                {
                    return Err(SubsetError::Config(
                        "static credentials require key, secret and session token".into(),
                    ));
                }
            }
            Credentials::Bearer { token } => {
                if token.trim().is_empty() {
                    return Err(SubsetError::Config("bearer token is empty".into()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AccessConfig::default();
        assert_eq!(config.block_size, 8 * 1024 * 1024);
        assert_eq!(config.cache_strategy, CacheStrategy::Background);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_incomplete_static_credentials_rejected() {
        let config = AccessConfig::default().with_credentials(Credentials::Static(
            StaticCredentials {
                access_key_id: "AKIA".into(),
                secret_access_key: String::new(),
                session_token: "tok".into(),
            },
        ));
        assert!(matches!(config.validate(), Err(SubsetError::Config(_))));
    }

    #[test]
    fn test_empty_bearer_rejected() {
        let config =
            AccessConfig::default().with_credentials(Credentials::Bearer { token: " ".into() });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let config = AccessConfig::default().with_cache(CacheStrategy::Blocks, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::Static(StaticCredentials {
            access_key_id: "AKIA".into(),
            secret_access_key: "very-secret".into(),
            session_token: "session".into(),
        });
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("AKIA"));
        assert!(!rendered.contains("very-secret"));
        assert!(!format!("{:?}", Credentials::Bearer { token: "abc".into() }).contains("abc"));
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("read-ahead".parse::<CacheStrategy>().unwrap(), CacheStrategy::Blocks);
        assert_eq!("BACKGROUND".parse::<CacheStrategy>().unwrap(), CacheStrategy::Background);
        assert!("mmap".parse::<CacheStrategy>().is_err());
    }
}
