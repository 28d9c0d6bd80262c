//! Shared helpers for the companion integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use std::path::Path;
use ws_companion::{create_app, AppState, Config};

pub fn test_config(root: &Path) -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        files_root: root.to_path_buf(),
        jwt_secret: None,
        workspace_id: None,
    }
}

/// App with auth disabled, rooted at `root`.
pub fn create_test_app(root: &Path) -> Router {
    let state = AppState::new(&test_config(root)).expect("state construction failed");
    create_app(state)
}

/// App requiring tokens for the given workspace id.
pub fn create_authed_app(root: &Path, secret: &str, workspace_id: &str) -> Router {
    let config = Config {
        jwt_secret: Some(secret.to_string()),
        workspace_id: Some(workspace_id.to_string()),
        ..test_config(root)
    };
    let state = AppState::new(&config).expect("state construction failed");
    create_app(state)
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body")
        .to_vec()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(body.into())
        .unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Paths of regular-file entries in a tar byte blob.
pub fn tar_file_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    use std::io::Read;

    let mut archive = tar::Archive::new(bytes);
    let mut files = Vec::new();
    for entry in archive.entries().expect("invalid tar archive") {
        let mut entry = entry.expect("invalid tar entry");
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry
            .path()
            .expect("invalid entry path")
            .to_string_lossy()
            .into_owned();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).expect("truncated entry");
        files.push((path, content));
    }
    files
}

/// All entry paths in a tar byte blob, directories included.
pub fn tar_entry_paths(bytes: &[u8]) -> Vec<String> {
    let mut archive = tar::Archive::new(bytes);
    archive
        .entries()
        .expect("invalid tar archive")
        .map(|e| {
            e.expect("invalid tar entry")
                .path()
                .expect("invalid entry path")
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}
