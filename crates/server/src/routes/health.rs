use crate::state::ServerState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Health response
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub environment: String,
}

/// Health check endpoint. No authentication.
///
/// The model is loaded before the listener starts, so reaching this handler
/// means the service is ready.
pub async fn health_check(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.embedder.model_name().to_string(),
        environment: state.config.environment.to_string(),
    })
}
