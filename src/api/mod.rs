//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::auth::TokenIssuer;
use crate::store::Store;

pub use routes::create_router;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(store: impl Store + 'static, tokens: TokenIssuer) -> Self {
        Self {
            store: Arc::new(store),
            tokens: Arc::new(tokens),
        }
    }
}

/// Build the application router
pub fn build_app(state: AppState) -> Router {
    // Layers run last-added first: correlation id -> logging -> handler
    let api_routes = create_router()
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(axum::middleware::from_fn(
            middleware::correlation_id_middleware,
        ));

    Router::new()
        .route("/status", get(status))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness endpoint
async fn status() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
