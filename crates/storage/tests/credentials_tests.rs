//! Tests for temporary credential acquisition against a stub endpoint.

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use storage::{fetch_s3_credentials, resolve_credentials, Credentials, CredentialsError};
use subset_common::AccessMode;

async fn s3credentials(headers: HeaderMap) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some("Bearer good-token");

    if !authorized {
        return Redirect::temporary("/login").into_response();
    }

    Json(serde_json::json!({
        "accessKeyId": "ASIAEXAMPLE",
        "secretAccessKey": "secret",
        "sessionToken": "session",
        "expiration": "2026-10-16 12:00:00+00:00"
    }))
    .into_response()
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Serve the stub on an ephemeral port and return its base URL.
async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/s3credentials", get(s3credentials))
        .route("/broken", get(broken));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

// ============================================================================
// fetch_s3_credentials
// ============================================================================

#[tokio::test]
async fn test_valid_token_returns_keys() {
    let base = spawn_stub().await;
    let creds = fetch_s3_credentials(&format!("{}/s3credentials", base), "good-token")
        .await
        .unwrap();

    assert_eq!(creds.access_key_id, "ASIAEXAMPLE");
    assert_eq!(creds.secret_access_key, "secret");
    assert_eq!(creds.session_token, "session");
}

#[tokio::test]
async fn test_redirect_means_invalid_token() {
    let base = spawn_stub().await;
    let err = fetch_s3_credentials(&format!("{}/s3credentials", base), "expired")
        .await
        .unwrap_err();

    assert!(matches!(err, CredentialsError::InvalidToken));
    assert_eq!(err.to_string(), "invalid or expired Earthdata Login token");
}

#[tokio::test]
async fn test_server_error_reports_status() {
    let base = spawn_stub().await;
    let err = fetch_s3_credentials(&format!("{}/broken", base), "good-token")
        .await
        .unwrap_err();

    assert!(matches!(err, CredentialsError::Http { status: 500 }));
}

// ============================================================================
// resolve_credentials
// ============================================================================

#[tokio::test]
async fn test_direct_mode_yields_static_credentials() {
    let base = spawn_stub().await;
    let creds = resolve_credentials(
        AccessMode::Direct,
        &format!("{}/s3credentials", base),
        Some("good-token"),
    )
    .await
    .unwrap();

    match creds {
        Credentials::Static(keys) => assert_eq!(keys.access_key_id, "ASIAEXAMPLE"),
        other => panic!("expected static credentials, got {:?}", other),
    }
}
