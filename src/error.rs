use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("invalid coordinates: {0}")]
    Parse(String),

    #[error("navigation already active; complete or cancel the current delivery first")]
    AlreadyActive,

    #[error("navigation active toward {0}; complete or cancel it before selecting a new destination")]
    ActiveConflict(String),

    #[error("storage failure: {0}")]
    Persistence(String),

    #[error("no navigation handler for platform: {0}")]
    UnsupportedPlatform(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidLocation(_) | AppError::Parse(_) | AppError::UnsupportedPlatform(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::AlreadyActive | AppError::ActiveConflict(_) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::Persistence(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
