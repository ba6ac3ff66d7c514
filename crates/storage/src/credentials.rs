//! Credential acquisition for granule access.
//!
//! Direct (in-region S3) access needs short-lived keys, exchanged for an
//! Earthdata bearer token at the provider's credentials endpoint. External
//! (HTTPS) access sends the bearer token itself.

use reqwest::redirect::Policy;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

use subset_common::{AccessMode, SubsetError};

use crate::config::{Credentials, StaticCredentials};

/// NSIDC credentials endpoint for direct S3 access.
pub const DEFAULT_CREDENTIALS_URL: &str = "https://data.nsidc.earthdatacloud.nasa.gov/s3credentials";

#[derive(Error, Debug)]
pub enum CredentialsError {
    /// The endpoint redirected to a login page instead of answering.
    #[error("invalid or expired Earthdata Login token")]
    InvalidToken,

    #[error("credentials endpoint returned HTTP {status}")]
    Http { status: u16 },

    #[error("credentials request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("no bearer token configured")]
    MissingToken,
}

impl From<CredentialsError> for SubsetError {
    fn from(err: CredentialsError) -> Self {
        SubsetError::Config(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S3CredentialsResponse {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
}

/// Exchange a bearer token for temporary S3 keys.
///
/// Redirects are not followed: the endpoint answers an unauthenticated
/// request with a redirect to the login page.
#[instrument(skip(token))]
pub async fn fetch_s3_credentials(
    endpoint: &str,
    token: &str,
) -> Result<StaticCredentials, CredentialsError> {
    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .timeout(Duration::from_secs(30))
        .build()?;

    let response = client.get(endpoint).bearer_auth(token).send().await?;
    let status = response.status();

    if status.is_redirection() {
        return Err(CredentialsError::InvalidToken);
    }
    if !status.is_success() {
        return Err(CredentialsError::Http {
            status: status.as_u16(),
        });
    }

    let body: S3CredentialsResponse = response.json().await?;
    info!("Obtained temporary S3 credentials");

    Ok(StaticCredentials {
        access_key_id: body.access_key_id,
        secret_access_key: body.secret_access_key,
        session_token: body.session_token,
    })
}

/// Credentials appropriate for `mode`.
///
/// Direct access exchanges the token at `endpoint`; external access sends the
/// token as-is. Without a token, external access proceeds anonymously.
pub async fn resolve_credentials(
    mode: AccessMode,
    endpoint: &str,
    token: Option<&str>,
) -> Result<Credentials, CredentialsError> {
    let token = token.map(str::trim).filter(|t| !t.is_empty());
    match (mode, token) {
        (AccessMode::Direct, Some(token)) => {
            Ok(Credentials::Static(fetch_s3_credentials(endpoint, token).await?))
        }
        (AccessMode::Direct, None) => Err(CredentialsError::MissingToken),
        (AccessMode::External, Some(token)) => Ok(Credentials::Bearer {
            token: token.to_string(),
        }),
        (AccessMode::External, None) => Ok(Credentials::Anonymous),
    }
}
