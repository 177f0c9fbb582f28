//! API route handlers
//!
//! - `embed`: single and batch embedding (API key required)
//! - `health`: readiness report (public)

pub mod embed;
pub mod health;

use crate::error::ServerError;
use crate::state::ServerState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

/// API version and base info
///
/// Returns service information including version and available endpoints.
/// This is the root endpoint (GET /) and requires no authentication.
pub async fn api_info(State(state): State<Arc<ServerState>>) -> Json<Value> {
    let model = state.embedder.model_name();
    Json(json!({
        "name": "Embedding Service",
        "description": format!("API for generating text embeddings with {model}"),
        "version": env!("CARGO_PKG_VERSION"),
        "model": model,
        "dimension": state.embedder.dimension(),
        "endpoints": ["/embed", "/embed_batch", "/health"]
    }))
}

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
