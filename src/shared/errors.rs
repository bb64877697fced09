use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::channels::Channel;

/// Errors surfaced by the ticket lifecycle and notification engine.
///
/// Translation failures never appear here: the translation adapter absorbs
/// them and falls back to the untranslated text.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("ticket not found")]
    NotFound,
    #[error("ticket has no {0} destination registered")]
    MissingContact(Channel),
    #[error("message could not be sent: {0}")]
    SendFailed(String),
    #[error("message was sent but the ticket update failed: {0}")]
    PartialFailure(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    InvalidTransition(String),
    #[error("storage error: {0}")]
    Store(String),
    #[error("server configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MissingContact(_) | Self::InvalidTransition(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::SendFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PartialFailure(_) | Self::Store(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<diesel::result::Error> for EngineError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Self::NotFound,
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for EngineError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::Store(format!("connection pool: {err}"))
    }
}
