use axum::extract::{Request, State};
use axum::http::header;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use std::sync::Arc;
use ws_core::token::TokenValidator;
use ws_core::{WorkspaceId, WsError};

use crate::config::Config;
use crate::error::ApiError;
use crate::state::AppState;

/// Whether requests must carry a workspace token.
#[derive(Clone)]
pub enum AuthMode {
    /// Trusted-network fallback: every request is accepted.
    Disabled,
    Enabled(Arc<TokenValidator>),
}

/// Builds the auth mode from the companion config. Auth is only enabled
/// when both the shared secret and the workspace id are configured;
/// anything less falls back to open access with a loud warning.
pub fn auth_mode(config: &Config) -> AuthMode {
    match (&config.jwt_secret, &config.workspace_id) {
        (Some(secret), Some(raw_id)) => match WorkspaceId::parse(raw_id) {
            Ok(id) => AuthMode::Enabled(Arc::new(TokenValidator::new(secret, id))),
            Err(e) => {
                tracing::warn!(error = %e, "invalid workspace id, token auth DISABLED");
                AuthMode::Disabled
            }
        },
        _ => {
            tracing::warn!(
                "WS_COMPANION_JWT_SECRET or WS_COMPANION_WORKSPACE_ID not set, \
                 token auth DISABLED, all requests will be accepted"
            );
            AuthMode::Disabled
        }
    }
}

/// Middleware guarding every non-probe route.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let AuthMode::Enabled(validator) = &state.auth {
        let token = bearer_token(request.headers())
            .ok_or_else(|| WsError::Auth("missing bearer token".to_string()))?;
        validator.validate(token)?;
    }
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
