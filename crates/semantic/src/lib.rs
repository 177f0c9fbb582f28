//! Sentence embeddings for the embedding service.
//!
//! This crate owns the model side of the service: it makes sure the weights
//! for one sentence-transformers model are present in a cache directory,
//! loads them once, and hands back an [`Embedder`] that turns text into
//! L2-normalized vectors.
//!
//! Two backends exist:
//!
//! - **ONNX** - the real thing. Downloads `onnx/model.onnx` and `tokenizer.json`
//!   from the hub on first start, then runs ONNX Runtime with mean pooling.
//! - **Stub** - deterministic hash-seeded vectors for offline development
//!   and tests. Only used when asked for explicitly; a failed ONNX load is an
//!   error, never a silent downgrade.
//!
//! ## Threading notes
//!
//! The returned handle is `Send + Sync` and meant to live in an `Arc` for the
//! whole process. Single-text and batch calls go through the same batched
//! inference path. Calls block, so async callers should use `spawn_blocking`.
//!
//! ## Quick example
//!
//! ```no_run
//! use semantic::{load_embedder, ModelConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), semantic::SemanticError> {
//!     let cfg = ModelConfig::with_cache_dir("/tmp/embedding-models");
//!     let embedder = load_embedder(&cfg).await?;
//!     let vectors = embedder.embed_batch(&["first", "second"])?;
//!     assert_eq!(vectors.len(), 2);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;

mod assets;
mod embedder;
mod normalize;
mod onnx;
mod stub;

pub use crate::config::{Backend, ModelConfig, DEFAULT_MODEL_NAME};
pub use crate::embedder::Embedder;
pub use crate::error::SemanticError;
pub use crate::onnx::OnnxEmbedder;
pub use crate::stub::{StubEmbedder, STUB_DIMENSION};

use std::sync::Arc;

use crate::assets::resolve_model_assets;

/// Loads the configured model, downloading missing assets into `cfg.cache_dir`.
///
/// This is a one-time, blocking-heavy startup step. Any failure is returned
/// to the caller, who is expected to abort startup.
pub async fn load_embedder(cfg: &ModelConfig) -> Result<Arc<dyn Embedder>, SemanticError> {
    cfg.validate()?;

    match cfg.backend {
        Backend::Stub => {
            tracing::warn!(model = %cfg.model_name, "using stub embedder; vectors are not semantic");
            Ok(Arc::new(StubEmbedder::standing_in_for(&cfg.model_name)))
        }
        Backend::Onnx => {
            let assets = resolve_model_assets(cfg).await?;
            let embedder = OnnxEmbedder::load(&assets, cfg)?;
            Ok(Arc::new(embedder))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_backend_loads_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ModelConfig {
            backend: Backend::Stub,
            ..ModelConfig::with_cache_dir(dir.path())
        };

        let embedder = load_embedder(&cfg).await.unwrap();
        assert_eq!(
            embedder.model_name(),
            format!("stub:{DEFAULT_MODEL_NAME}")
        );
        assert_eq!(embedder.dimension(), STUB_DIMENSION);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_loading() {
        let cfg = ModelConfig {
            backend: Backend::Stub,
            model_name: "  ".into(),
            ..Default::default()
        };
        let err = load_embedder(&cfg).await.err().unwrap();
        assert!(matches!(err, SemanticError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn onnx_backend_fails_when_assets_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ModelConfig {
            hub_url: "http://127.0.0.1:9".into(),
            ..ModelConfig::with_cache_dir(dir.path().join("cache"))
        };

        let err = load_embedder(&cfg).await.err().unwrap();
        assert!(matches!(err, SemanticError::Download(_)));
        // cache directory is still created up front
        assert!(dir.path().join("cache").is_dir());
    }
}
