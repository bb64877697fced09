//! Route assembly.
//!
//! Staff routes sit behind the API-key gate; the health probe and the
//! provider webhook are public (the webhook authenticates with its own
//! shared secret).

use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::shared::state::AppState;

pub fn configure_routes(state: Arc<AppState>) -> Router {
    let staff = Router::new()
        .merge(crate::tickets::configure_routes())
        .merge(crate::notify::configure_routes())
        .merge(crate::messages::configure_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_api_key,
        ));

    Router::new()
        .route("/api/health", get(health))
        .merge(crate::inbound::configure_routes())
        .merge(staff)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}
