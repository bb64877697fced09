use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::shared::errors::EngineError;
use crate::shared::state::AppState;
use crate::shared::utils::timing_safe_eq;

/// Staff API-key gate: `x-api-key` header or a bearer token, compared in
/// constant time. A server without a configured key refuses staff traffic
/// rather than running open.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.api_key.as_deref() else {
        return EngineError::Config("API key missing in server configuration".to_string())
            .into_response();
    };

    let headers = request.headers();
    let header_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")));

    let provided = header_key.or(bearer).unwrap_or("");
    if provided.is_empty() || !timing_safe_eq(provided, expected) {
        return EngineError::Unauthorized.into_response();
    }

    next.run(request).await
}
