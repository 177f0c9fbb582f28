//! HTTP-level tests for the embedding API.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot` and a
//! deterministic stub model, so no weights or network are needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use semantic::{Embedder, SemanticError, StubEmbedder};
use serde_json::{json, Value};
use server::config::{EnvironmentMode, ServiceConfig};
use server::build_app;
use tower::ServiceExt;

const KEY: &str = "test-api-key";

/// Counts encode calls so tests can assert how often the model ran.
struct CountingEmbedder {
    inner: StubEmbedder,
    calls: AtomicUsize,
}

impl Embedder for CountingEmbedder {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SemanticError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }
}

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "broken"
    }

    fn dimension(&self) -> usize {
        384
    }

    fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, SemanticError> {
        Err(SemanticError::Inference("session exploded".into()))
    }
}

fn config(environment: EnvironmentMode, bypass: bool) -> ServiceConfig {
    ServiceConfig {
        environment,
        auth_bypass_enabled: bypass,
        api_key: KEY.to_string(),
        ..ServiceConfig::default()
    }
}

fn production() -> EnvironmentMode {
    EnvironmentMode::Other("production".into())
}

fn counting_app(cfg: ServiceConfig) -> (Router, Arc<CountingEmbedder>) {
    let embedder = Arc::new(CountingEmbedder {
        inner: StubEmbedder::new("all-MiniLM-L6-v2"),
        calls: AtomicUsize::new(0),
    });
    (build_app(cfg, embedder.clone()), embedder)
}

fn app(cfg: ServiceConfig) -> Router {
    counting_app(cfg).0
}

fn post(uri: &str, key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn as_vector(value: &Value) -> Vec<f32> {
    value
        .as_array()
        .expect("vector is an array")
        .iter()
        .map(|x| x.as_f64().unwrap() as f32)
        .collect()
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[tokio::test]
async fn embed_returns_unit_vector_of_model_dimension() {
    let (status, body) = send(
        app(config(production(), false)),
        post("/embed", Some(KEY), json!({"text": "hello world"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let v = as_vector(&body["embedding"]);
    assert_eq!(v.len(), 384);
    assert!((norm(&v) - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn embed_is_deterministic() {
    let app = app(config(production(), false));
    let (_, first) = send(
        app.clone(),
        post("/embed", Some(KEY), json!({"text": "hello world"})),
    )
    .await;
    let (_, second) = send(app, post("/embed", Some(KEY), json!({"text": "hello world"}))).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn embed_accepts_empty_text() {
    let (status, body) = send(
        app(config(production(), false)),
        post("/embed", Some(KEY), json!({"text": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_vector(&body["embedding"]).len(), 384);
}

#[tokio::test]
async fn batch_preserves_order_and_matches_single() {
    let app = app(config(production(), false));
    let texts = ["first", "second", "third", "first"];

    let (status, body) = send(
        app.clone(),
        post("/embed_batch", Some(KEY), json!({"texts": texts})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let embeddings = body["embeddings"].as_array().unwrap();
    assert_eq!(embeddings.len(), texts.len());

    for (text, from_batch) in texts.iter().zip(embeddings) {
        let (_, single) = send(app.clone(), post("/embed", Some(KEY), json!({"text": text}))).await;
        let a = as_vector(&single["embedding"]);
        let b = as_vector(from_batch);
        let max_diff = a.iter().zip(&b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max);
        assert!(max_diff < 1e-6, "{text} differs by {max_diff}");
    }
}

#[tokio::test]
async fn empty_batch_returns_empty_list() {
    let (status, body) = send(
        app(config(production(), false)),
        post("/embed_batch", Some(KEY), json!({"texts": []})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"embeddings": []}));
}

#[tokio::test]
async fn each_request_runs_exactly_one_encode() {
    let (app, embedder) = counting_app(config(production(), false));

    send(app.clone(), post("/embed", Some(KEY), json!({"text": "a"}))).await;
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

    send(app, post("/embed_batch", Some(KEY), json!({"texts": ["a", "b", "c"]}))).await;
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_key_is_forbidden_without_encoding() {
    let (app, embedder) = counting_app(config(production(), false));

    for uri in ["/embed", "/embed_batch"] {
        let body = if uri == "/embed" {
            json!({"text": "x"})
        } else {
            json!({"texts": ["x"]})
        };
        let (status, body) = send(app.clone(), post(uri, None, body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(body["error"]["reason"], "missing");
        assert_eq!(body["error"]["message"], "API key is missing");
    }
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_key_is_forbidden() {
    let (app, embedder) = counting_app(config(production(), false));
    let (status, body) = send(app, post("/embed", Some("nope"), json!({"text": "x"}))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["reason"], "invalid");
    assert_eq!(body["error"]["message"], "Invalid API key");
    assert!(body.get("detail").is_none());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn development_bypass_allows_missing_key() {
    let (status, _) = send(
        app(config(EnvironmentMode::Development, true)),
        post("/embed", None, json!({"text": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn development_without_bypass_still_requires_key() {
    let (status, body) = send(
        app(config(EnvironmentMode::Development, false)),
        post("/embed", None, json!({"text": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["reason"], "missing");
}

#[tokio::test]
async fn bypass_flag_is_ignored_outside_development() {
    let (status, _) = send(
        app(config(production(), true)),
        post("/embed_batch", None, json!({"texts": ["x"]})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_needs_no_key_in_any_environment() {
    for environment in [EnvironmentMode::Development, production()] {
        let expected_env = environment.to_string();
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(config(environment, false)), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "status": "ok",
                "model": "all-MiniLM-L6-v2",
                "environment": expected_env,
            })
        );
    }
}

#[tokio::test]
async fn malformed_body_is_client_error_without_encoding() {
    let (app, embedder) = counting_app(config(production(), false));

    let (status, body) = send(
        app.clone(),
        post("/embed", Some(KEY), json!({"texts": "wrong field"})),
    )
    .await;
    assert!(status.is_client_error());
    assert_ne!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let request = Request::builder()
        .method("POST")
        .uri("/embed_batch")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-API-Key", KEY)
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn auth_is_checked_before_body_validation() {
    let (status, body) = send(
        app(config(production(), false)),
        post("/embed", None, json!({"unexpected": true})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["reason"], "missing");
}

#[tokio::test]
async fn inference_failure_is_internal_error() {
    let app = build_app(config(production(), false), Arc::new(FailingEmbedder));
    let (status, body) = send(app, post("/embed_batch", Some(KEY), json!({"texts": ["a"]}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "EMBEDDING_ERROR");
    assert!(body.get("embeddings").is_none());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let request = Request::builder()
        .uri("/nope")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(config(production(), false)), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn root_describes_the_service() {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(app(config(production(), false)), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "all-MiniLM-L6-v2");
    assert_eq!(body["dimension"], 384);
}

#[tokio::test]
async fn stub_backend_is_reported_as_stub() {
    let app = build_app(
        config(production(), false),
        Arc::new(StubEmbedder::standing_in_for("all-MiniLM-L6-v2")),
    );
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "stub:all-MiniLM-L6-v2");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app(config(production(), false)).oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}
