use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
}

pub fn metrics_routes() -> Router<AppState> {
    Router::new().route("/metrics/connections", get(connections))
}

async fn live() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn ready() -> Json<Value> {
    // The companion is ready as soon as its state is constructed; the file
    // root exists by then.
    Json(json!({ "status": "ready" }))
}

/// Open-connection count polled by the control plane for idle detection.
async fn connections(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "connections": state.activity.connections() }))
}
