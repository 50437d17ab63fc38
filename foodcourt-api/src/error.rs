use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use foodcourt_service::Error;
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not authorized, no token")]
    MissingToken,
    #[error("Not authorized, token failed")]
    InvalidToken,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Service(#[from] Error),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MissingToken | ApiError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Service(err) => match err {
                Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
                Error::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                Error::InvalidTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
                Error::Internal(cause) => {
                    error!(%cause, "request failed");
                    internal()
                }
            },
            ApiError::Internal(cause) => {
                error!(%cause, "request failed");
                internal()
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}
