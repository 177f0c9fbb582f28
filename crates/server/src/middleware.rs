use crate::auth::{AuthGrant, AuthRejection, API_KEY_HEADER};
use crate::error::ServerError;
use crate::state::ServerState;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

/// API key authentication middleware. Runs before the body is read, so a
/// rejected request never reaches the model.
pub async fn api_key_auth(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let verdict = match request.headers().get(API_KEY_HEADER).map(|v| v.to_str()) {
        // non-UTF-8 bytes can never equal the configured secret
        Some(Err(_)) if !state.authenticator.bypass_active() => Err(AuthRejection::Invalid),
        Some(Err(_)) | None => state.authenticator.authorize(None),
        Some(Ok(key)) => state.authenticator.authorize(Some(key)),
    };

    match verdict {
        Ok(AuthGrant::DevBypass) => {
            tracing::debug!("auth bypassed in development mode");
            Ok(next.run(request).await)
        }
        Ok(AuthGrant::Key) => Ok(next.run(request).await),
        Err(rejection) => {
            tracing::warn!(reason = rejection.reason(), uri = %request.uri(), "request rejected");
            Err(rejection.into())
        }
    }
}

/// Request ID injection middleware
pub async fn request_id(mut request: Request, next: Next) -> Response {
    // Generate or extract request ID
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Request ID stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Logging middleware
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        request_id = %request_id,
        "Request completed"
    );

    response
}
