use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;

use crate::error::ApiResult;
use crate::state::AppState;
use ws_core::WsError;

pub fn routes() -> Router<AppState> {
    Router::new().route("/upload", post(upload))
}

/// Multipart upload of one or more `files` parts. The part filename is the
/// root-relative destination path; missing parent directories are created.
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<StatusCode> {
    let mut saved = 0usize;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WsError::StructuralConflict(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let path = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| {
                WsError::StructuralConflict("file part without a filename".to_string())
            })?;
        let content = field
            .bytes()
            .await
            .map_err(|e| WsError::Process(format!("upload aborted: {e}")))?;

        let store = state.files.as_ref().clone();
        tokio::task::spawn_blocking(move || store.write_file(&path, &content))
            .await
            .map_err(|e| WsError::Process(format!("upload task failed: {e}")))??;
        saved += 1;
    }

    if saved == 0 {
        return Err(WsError::StructuralConflict(
            "no `files` part in multipart body".to_string(),
        )
        .into());
    }
    Ok(StatusCode::CREATED)
}
