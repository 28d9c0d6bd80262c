use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use ws_core::WsError;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// HTTP-facing wrapper around the shared error taxonomy.
#[derive(Debug)]
pub struct ApiError(pub WsError);

impl<E> From<E> for ApiError
where
    E: Into<WsError>,
{
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WsError::PathValidation(_) | WsError::StructuralConflict(_) => {
                StatusCode::BAD_REQUEST
            }
            WsError::NotFound(_) => StatusCode::NOT_FOUND,
            WsError::Auth(_) => StatusCode::UNAUTHORIZED,
            WsError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
