//! Remote file access for granule subsetting.
//!
//! Provides:
//! - [`AccessConfig`]: transport, caching and credential settings for a run
//! - [`RemoteAccessor`] / [`RemoteFile`]: a URL opened as a `Read + Seek`
//!   resource over S3, HTTPS or the local filesystem, with block caching
//! - [`RangeServer`]: open files served over loopback HTTP byte ranges, for
//!   native readers that only accept a URL
//! - [`credentials`]: temporary S3 credential acquisition

pub mod block_cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod object_store;
pub mod range_server;
pub mod remote_file;

pub use block_cache::{BlockCache, CacheStats};
pub use config::{AccessConfig, CacheStrategy, Credentials, StaticCredentials};
pub use credentials::{
    fetch_s3_credentials, resolve_credentials, CredentialsError, DEFAULT_CREDENTIALS_URL,
};
pub use error::{StorageError, StorageResult};
pub use range_server::{PublishedFile, RangeServer};
pub use remote_file::{RemoteAccessor, RemoteFile};
