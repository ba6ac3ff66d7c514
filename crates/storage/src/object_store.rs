//! Object-store construction for granule URLs.

use object_store::aws::AmazonS3Builder;
use object_store::http::HttpBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::{ClientOptions, ObjectStore};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AccessConfig, Credentials};
use crate::error::{StorageError, StorageResult};

/// Build a store and an object path for `url`.
///
/// - `s3://bucket/key`: S3 with the configured region and, when present,
///   static credentials.
/// - `http(s)://host/path`: plain HTTP range requests, with the bearer token
///   as a default `Authorization` header.
/// - `file:///abs/path`: the local filesystem.
pub fn build_store(
    url: &str,
    config: &AccessConfig,
) -> StorageResult<(Arc<dyn ObjectStore>, Path)> {
    let parsed = Url::parse(url).map_err(|e| StorageError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    match parsed.scheme() {
        "s3" => build_s3(url, &parsed, config),
        "http" | "https" => build_http(url, &parsed, config),
        "file" => build_local(url, &parsed),
        _ => Err(StorageError::UnsupportedUrl(url.to_string())),
    }
}

fn build_s3(
    url: &str,
    parsed: &Url,
    config: &AccessConfig,
) -> StorageResult<(Arc<dyn ObjectStore>, Path)> {
    let bucket = parsed
        .host_str()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| StorageError::InvalidUrl {
            url: url.to_string(),
            message: "missing bucket".to_string(),
        })?;

    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(bucket)
        .with_region(&config.region)
        .with_client_options(client_options(config));

    if let Credentials::Static(creds) = &config.credentials {
        builder = builder
            .with_access_key_id(&creds.access_key_id)
            .with_secret_access_key(&creds.secret_access_key)
            .with_token(&creds.session_token);
    }

    let store = builder.build().map_err(|source| StorageError::Client {
        url: url.to_string(),
        source,
    })?;

    Ok((Arc::new(store), object_path(url, parsed)?))
}

fn build_http(
    url: &str,
    parsed: &Url,
    config: &AccessConfig,
) -> StorageResult<(Arc<dyn ObjectStore>, Path)> {
    let host = parsed.host_str().ok_or_else(|| StorageError::InvalidUrl {
        url: url.to_string(),
        message: "missing host".to_string(),
    })?;
    let base = match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    };

    let mut options = client_options(config);
    if parsed.scheme() == "http" {
        options = options.with_allow_http(true);
    }
    if let Credentials::Bearer { token } = &config.credentials {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
            StorageError::InvalidUrl {
                url: url.to_string(),
                message: format!("bearer token is not a valid header value: {}", e),
            }
        })?;
        headers.insert(AUTHORIZATION, value);
        options = options.with_default_headers(headers);
    }

    let store = HttpBuilder::new()
        .with_url(base)
        .with_client_options(options)
        .build()
        .map_err(|source| StorageError::Client {
            url: url.to_string(),
            source,
        })?;

    Ok((Arc::new(store), object_path(url, parsed)?))
}

fn build_local(url: &str, parsed: &Url) -> StorageResult<(Arc<dyn ObjectStore>, Path)> {
    let file_path = parsed.to_file_path().map_err(|_| StorageError::InvalidUrl {
        url: url.to_string(),
        message: "not an absolute file path".to_string(),
    })?;
    let location = Path::from_absolute_path(&file_path).map_err(|source| {
        StorageError::InvalidUrl {
            url: url.to_string(),
            message: source.to_string(),
        }
    })?;

    Ok((Arc::new(LocalFileSystem::new()), location))
}

fn client_options(config: &AccessConfig) -> ClientOptions {
    let mut options = ClientOptions::new();
    if config.timeout_secs > 0 {
        options = options.with_timeout(Duration::from_secs(config.timeout_secs));
    }
    if let Some(proxy) = &config.proxy_url {
        options = options.with_proxy_url(proxy);
    }
    options
}

/// Object key from the URL path, percent-decoded.
fn object_path(url: &str, parsed: &Url) -> StorageResult<Path> {
    let key = parsed.path().trim_start_matches('/');
    if key.is_empty() {
        return Err(StorageError::InvalidUrl {
            url: url.to_string(),
            message: "missing object key".to_string(),
        });
    }
    Path::from_url_path(key).map_err(|e| StorageError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticCredentials;

    #[test]
    fn test_s3_path() {
        let config = AccessConfig::default().with_credentials(Credentials::Static(
            StaticCredentials {
                access_key_id: "AKIA".into(),
                secret_access_key: "secret".into(),
                session_token: "token".into(),
            },
        ));
        let (_, path) = build_store(
            "s3://nsidc-cumulus-prod-protected/ATLAS/ATL06/006/2018/10/14/ATL06_20181014064703_02390105_006_02.h5",
            &config,
        )
        .unwrap();
        assert_eq!(
            path.as_ref(),
            "ATLAS/ATL06/006/2018/10/14/ATL06_20181014064703_02390105_006_02.h5"
        );
    }

    #[test]
    fn test_https_path() {
        let config =
            AccessConfig::default().with_credentials(Credentials::Bearer { token: "abc".into() });
        let (_, path) = build_store(
            "https://data.nsidc.earthdatacloud.nasa.gov/nsidc-cumulus-prod-protected/ATLAS/a.h5",
            &config,
        )
        .unwrap();
        assert_eq!(path.as_ref(), "nsidc-cumulus-prod-protected/ATLAS/a.h5");
    }

    #[test]
    fn test_unsupported_scheme() {
        let result = build_store("ftp://host/file.h5", &AccessConfig::default());
        assert!(matches!(result, Err(StorageError::UnsupportedUrl(_))));
    }

    #[test]
    fn test_missing_key() {
        let result = build_store("s3://bucket/", &AccessConfig::default());
        assert!(matches!(result, Err(StorageError::InvalidUrl { .. })));
    }

    #[test]
    fn test_garbage_url() {
        let result = build_store("not a url", &AccessConfig::default());
        assert!(matches!(result, Err(StorageError::InvalidUrl { .. })));
    }
}
