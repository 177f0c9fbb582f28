use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request to embed a single text
#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub embedding: Vec<f32>,
}

/// Request to embed an ordered batch of texts
#[derive(Debug, Deserialize)]
pub struct EmbedBatchRequest {
    pub texts: Vec<String>,
}

/// `embeddings[i]` belongs to `texts[i]`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedBatchResponse {
    pub embeddings: Vec<Vec<f32>>,
}

/// Embed one text.
///
/// # Example
/// ```json
/// // Request
/// { "text": "hello world" }
///
/// // Response
/// { "embedding": [0.0123, -0.0456, ...] }
/// ```
pub async fn embed_text(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<EmbedRequest>, JsonRejection>,
) -> ServerResult<Json<EmbedResponse>> {
    let Json(request) = payload?;
    tracing::debug!(chars = request.text.chars().count(), "embedding single text");

    let embedder = state.embedder.clone();
    let embedding = tokio::task::spawn_blocking(move || embedder.embed(&request.text)).await??;

    Ok(Json(EmbedResponse { embedding }))
}

/// Embed a batch of texts in one inference call. An empty batch returns an
/// empty list; any failure fails the whole batch.
pub async fn embed_batch(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<EmbedBatchRequest>, JsonRejection>,
) -> ServerResult<Json<EmbedBatchResponse>> {
    let Json(request) = payload?;
    tracing::debug!(count = request.texts.len(), "embedding batch");

    let embedder = state.embedder.clone();
    let embeddings = tokio::task::spawn_blocking(move || {
        let texts: Vec<&str> = request.texts.iter().map(String::as_str).collect();
        embedder.embed_batch(&texts)
    })
    .await??;

    Ok(Json(EmbedBatchResponse { embeddings }))
}
