//! Token enforcement on the companion surface.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use ws_core::token::TokenIssuer;
use ws_core::WorkspaceId;

const SECRET: &str = "test-secret";
const WORKSPACE: &str = "abc123";

fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn token_for(workspace: &str) -> String {
    TokenIssuer::new(SECRET, Duration::from_secs(60))
        .issue(&WorkspaceId::parse(workspace).unwrap(), "tester")
        .unwrap()
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let root = TempDir::new().unwrap();
    let app = common::create_authed_app(root.path(), SECRET, WORKSPACE);

    let response = app.clone().oneshot(common::get("/files-tar")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.clone().oneshot(common::get("/process")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn a_valid_token_grants_access() {
    let root = TempDir::new().unwrap();
    let app = common::create_authed_app(root.path(), SECRET, WORKSPACE);

    let response = app
        .clone()
        .oneshot(authed_get("/metrics/connections", &token_for(WORKSPACE)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&common::body_bytes(response).await).unwrap();
    assert_eq!(body["connections"], 0);
}

#[tokio::test]
async fn a_token_for_another_workspace_is_rejected() {
    let root = TempDir::new().unwrap();
    let app = common::create_authed_app(root.path(), SECRET, WORKSPACE);

    let response = app
        .clone()
        .oneshot(authed_get("/files-tar", &token_for("other9")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn probe_endpoints_stay_open() {
    let root = TempDir::new().unwrap();
    let app = common::create_authed_app(root.path(), SECRET, WORKSPACE);

    for uri in ["/health/live", "/health/ready"] {
        let response = app.clone().oneshot(common::get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri} must be open");
    }
}

#[tokio::test]
async fn everything_is_open_without_a_configured_secret() {
    let root = TempDir::new().unwrap();
    let app = common::create_test_app(root.path());

    let response = app.clone().oneshot(common::get("/files-tar")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
