use std::collections::HashMap;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::activity::ConnectionGuard;
use crate::error::ApiResult;
use crate::state::AppState;
use ws_core::WsError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/process", post(spawn))
        .route("/process", get(list))
        .route("/process/{id}", get(attach))
        .route("/process/{id}", delete(purge))
}

#[derive(Debug, Deserialize)]
struct SpawnRequest {
    cmd: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct SpawnResponse {
    id: Uuid,
}

async fn spawn(
    State(state): State<AppState>,
    Json(request): Json<SpawnRequest>,
) -> ApiResult<(StatusCode, Json<SpawnResponse>)> {
    if request.cmd.is_empty() {
        return Err(WsError::StructuralConflict("empty command".to_string()).into());
    }
    let id = state.processes.spawn(request.cmd, request.env).await?;
    Ok((StatusCode::CREATED, Json(SpawnResponse { id })))
}

async fn list(State(state): State<AppState>) -> Json<Vec<Uuid>> {
    Json(state.processes.list())
}

async fn purge(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    state.processes.purge(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upgrades to the process websocket. The output subscription is taken
/// before the upgrade so an unknown id fails as a clean 404 instead of a
/// dropped socket.
async fn attach(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    if !state.processes.contains(id) {
        return Err(WsError::not_found(format!("process {id}")).into());
    }
    let output = state.processes.stdout(id)?;
    let guard = state.activity.acquire();
    Ok(ws
        .on_upgrade(move |socket| bridge(socket, state, id, output, guard))
        .into_response())
}

/// One gateway connection. The two copy directions run as independent
/// tasks; closing the socket drops the output subscription but never kills
/// the process.
async fn bridge(
    socket: WebSocket,
    state: AppState,
    id: Uuid,
    mut output: broadcast::Receiver<Bytes>,
    guard: ConnectionGuard,
) {
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            match output.recv().await {
                Ok(chunk) => {
                    if sender.send(Message::Binary(chunk)).await.is_err() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(%id, skipped, "slow websocket client lost output");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        // Process output ended; close with a normal status.
        let _ = sender
            .send(Message::Close(Some(CloseFrame {
                code: close_code::NORMAL,
                reason: "process exited".into(),
            })))
            .await;
    });

    let processes = state.processes.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            let data = match message {
                Message::Binary(data) => data.to_vec(),
                Message::Text(text) => text.as_bytes().to_vec(),
                Message::Close(_) => break,
                _ => continue,
            };
            if processes.write_stdin(id, data).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    drop(guard);
}
