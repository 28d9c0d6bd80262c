//! Tar import endpoint and export filtering.

mod common;

use axum::http::{Request, StatusCode};
use axum::body::Body;
use tempfile::TempDir;
use tower::ServiceExt;

fn tar_request(body: Vec<u8>, content_type: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/files-tar")
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn import_replaces_the_whole_tree() {
    let source_root = TempDir::new().unwrap();
    let source = common::create_test_app(source_root.path());
    source
        .clone()
        .oneshot(common::post("/files/src/lib.rs", "pub fn x() {}"))
        .await
        .unwrap();
    source
        .clone()
        .oneshot(common::post("/files/notes.md", "remember"))
        .await
        .unwrap();
    let response = source.clone().oneshot(common::get("/files-tar")).await.unwrap();
    let archive = common::body_bytes(response).await;

    // The destination has pre-existing content that must not survive.
    let dest_root = TempDir::new().unwrap();
    let dest = common::create_test_app(dest_root.path());
    dest.clone()
        .oneshot(common::post("/files/stale.txt", "old"))
        .await
        .unwrap();

    let response = dest
        .clone()
        .oneshot(tar_request(archive, "application/x-tar"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = dest.clone().oneshot(common::get("/files-tar")).await.unwrap();
    let files = common::tar_file_entries(&common::body_bytes(response).await);
    let mut paths: Vec<_> = files.iter().map(|(p, _)| p.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["notes.md", "src/lib.rs"]);
    let notes = files.iter().find(|(p, _)| p == "notes.md").unwrap();
    assert_eq!(notes.1, b"remember");
}

#[tokio::test]
async fn import_rejects_non_tar_content_types() {
    let root = TempDir::new().unwrap();
    let app = common::create_test_app(root.path());

    let response = app
        .clone()
        .oneshot(tar_request(b"{}".to_vec(), "application/json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn export_filter_restricts_entries() {
    let root = TempDir::new().unwrap();
    let app = common::create_test_app(root.path());

    for (path, content) in [
        ("/files/src/main.rs", "fn main() {}"),
        ("/files/src/deep/mod.rs", "mod x;"),
        ("/files/readme.md", "docs"),
    ] {
        app.clone().oneshot(common::post(path, content)).await.unwrap();
    }

    let response = app
        .clone()
        .oneshot(common::get("/files-tar?filter=**/*.rs"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let files = common::tar_file_entries(&common::body_bytes(response).await);
    let mut paths: Vec<_> = files.iter().map(|(p, _)| p.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["src/deep/mod.rs", "src/main.rs"]);
}

#[tokio::test]
async fn export_filter_rejects_invalid_patterns() {
    let root = TempDir::new().unwrap();
    let app = common::create_test_app(root.path());

    let response = app
        .clone()
        .oneshot(common::get("/files-tar?filter=%5Bunclosed"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
