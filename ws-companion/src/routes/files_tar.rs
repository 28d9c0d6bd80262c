use std::io;

use axum::body::{Body, Bytes};
use axum::extract::{Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::archive::{build_filter, extract_archive, write_archive, ChannelReader, ChannelWriter};
use crate::error::ApiResult;
use crate::state::AppState;
use ws_core::WsError;

const TAR_CONTENT_TYPE: &str = "application/x-tar";

// Bounded so a slow client applies backpressure to the blocking encoder.
const STREAM_DEPTH: usize = 16;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/files-tar", get(export))
        .route("/files-tar", post(import))
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    filter: Option<String>,
}

/// Streams the whole tree as a tar archive, optionally restricted to one
/// glob pattern.
async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let patterns: Vec<String> = query.filter.into_iter().collect();
    let filter = build_filter(&patterns)?;

    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(STREAM_DEPTH);
    let store = state.files.as_ref().clone();
    tokio::task::spawn_blocking(move || {
        let writer = ChannelWriter::new(tx.clone());
        if let Err(e) = write_archive(&store, filter.as_ref(), writer) {
            // A send failure here means the client is already gone.
            let _ = tx.blocking_send(Err(io::Error::other(e.to_string())));
        }
    });

    Ok((
        [
            (header::CONTENT_TYPE, TAR_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"files.tar\"",
            ),
        ],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response())
}

/// Replaces the tree with the uploaded archive. Non-atomic: the tree is
/// purged before extraction starts, so a mid-stream failure leaves the
/// purged root and the caller must re-upload.
async fn import(State(state): State<AppState>, request: Request) -> ApiResult<StatusCode> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if content_type != TAR_CONTENT_TYPE && content_type != "application/octet-stream" {
        return Err(WsError::StructuralConflict(format!(
            "expected {TAR_CONTENT_TYPE} body, got {content_type:?}"
        ))
        .into());
    }

    let (tx, rx) = mpsc::channel::<Bytes>(STREAM_DEPTH);
    let store = state.files.as_ref().clone();
    let extraction =
        tokio::task::spawn_blocking(move || extract_archive(&store, ChannelReader::new(rx)));

    let mut body = request.into_body().into_data_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| WsError::Process(format!("upload aborted: {e}")))?;
        if tx.send(chunk).await.is_err() {
            // Extractor bailed early; its error is surfaced below.
            break;
        }
    }
    drop(tx);

    extraction
        .await
        .map_err(|e| WsError::Process(format!("import task failed: {e}")))??;
    Ok(StatusCode::NO_CONTENT)
}
