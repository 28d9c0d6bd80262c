pub mod files;
pub mod files_tar;
pub mod health;
pub mod process;
pub mod upload;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::state::AppState;

/// Builds the companion router. Probe endpoints stay open so the cluster
/// can health-check the pod; everything else sits behind the token
/// middleware.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(
            files::routes()
                .merge(files_tar::routes())
                .merge(upload::routes())
                .merge(process::routes())
                .merge(health::metrics_routes())
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    require_auth,
                )),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
