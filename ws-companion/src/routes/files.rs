use std::io::{self, Read};

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::ApiResult;
use crate::files::download_mime;
use crate::state::AppState;
use ws_core::WsError;

/// Bytes inspected for the content-type decision.
const SNIFF_LEN: usize = 8192;
const READ_CHUNK: usize = 64 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/files/{*path}", get(download))
        .route("/files/{*path}", post(create))
        .route("/files/{*path}", delete(remove))
}

/// Streams a single file. Only a bounded prefix is read up front to decide
/// the content type, which is forced per the preview rule: images keep
/// their type, everything else becomes inert text or bytes.
async fn download(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Response> {
    let store = state.files.as_ref().clone();
    let open_path = path.clone();
    let (mut file, prefix) = tokio::task::spawn_blocking(
        move || -> ws_core::Result<(std::fs::File, Vec<u8>)> {
            let resolved = store.resolve(&open_path)?;
            if !resolved.is_file() {
                return Err(WsError::not_found(open_path));
            }
            let mut file = std::fs::File::open(&resolved)?;
            let mut prefix = vec![0u8; SNIFF_LEN];
            let mut filled = 0;
            while filled < prefix.len() {
                let n = file.read(&mut prefix[filled..])?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            prefix.truncate(filled);
            Ok((file, prefix))
        },
    )
    .await
    .map_err(|e| WsError::Process(format!("read task failed: {e}")))??;

    let mime = download_mime(&path, &prefix);

    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(16);
    tokio::task::spawn_blocking(move || {
        if tx.blocking_send(Ok(Bytes::from(prefix))).is_err() {
            return;
        }
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            match file.read(&mut buf) {
                Ok(0) => return,
                Ok(n) => {
                    if tx.blocking_send(Ok(Bytes::copy_from_slice(&buf[..n]))).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    return;
                }
            }
        }
    });

    Ok((
        [(header::CONTENT_TYPE, mime)],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response())
}

/// Idempotent create. A trailing slash requests a directory; a request
/// body becomes the file content, and an empty body is a plain touch.
async fn create(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let store = state.files.as_ref().clone();
    tokio::task::spawn_blocking(move || {
        if path.ends_with('/') {
            store.create_dir(&path)
        } else if body.is_empty() {
            store.create_file(&path)
        } else {
            store.write_file(&path, &body)
        }
    })
    .await
    .map_err(|e| ws_core::WsError::Process(format!("create task failed: {e}")))??;
    Ok(StatusCode::CREATED)
}

async fn remove(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<StatusCode> {
    let store = state.files.as_ref().clone();
    tokio::task::spawn_blocking(move || store.delete(&path))
        .await
        .map_err(|e| ws_core::WsError::Process(format!("delete task failed: {e}")))??;
    Ok(StatusCode::NO_CONTENT)
}
