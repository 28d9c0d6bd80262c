//! Multipart upload endpoint.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "X-COMPANION-TEST-BOUNDARY";

fn multipart_request(parts: &[(&str, &str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, filename, content) in parts {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; \
             name=\"{name}\"; filename=\"{filename}\"\r\n\r\n{content}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn uploads_land_under_their_filenames() {
    let root = TempDir::new().unwrap();
    let app = common::create_test_app(root.path());

    let response = app
        .clone()
        .oneshot(multipart_request(&[
            ("files", "readme.md", "docs"),
            ("files", "src/lib.rs", "pub fn x() {}"),
        ]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.clone().oneshot(common::get("/files/readme.md")).await.unwrap();
    assert_eq!(common::body_bytes(response).await, b"docs");

    // Parent directories are created on demand.
    let response = app.clone().oneshot(common::get("/files/src/lib.rs")).await.unwrap();
    assert_eq!(common::body_bytes(response).await, b"pub fn x() {}");
}

#[tokio::test]
async fn upload_without_file_parts_is_a_client_error() {
    let root = TempDir::new().unwrap();
    let app = common::create_test_app(root.path());

    let response = app
        .clone()
        .oneshot(multipart_request(&[("other", "x.txt", "ignored")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
