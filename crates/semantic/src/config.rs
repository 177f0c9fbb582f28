use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the sentence-transformers model served by default.
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Base URL that model repositories are resolved against.
pub const DEFAULT_HUB_URL: &str = "https://huggingface.co/sentence-transformers";

/// Which encoder implementation backs the service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Real inference through ONNX Runtime.
    #[default]
    Onnx,
    /// Deterministic hash-seeded vectors. No downloads, no model.
    Stub,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onnx" => Ok(Backend::Onnx),
            "stub" => Ok(Backend::Stub),
            other => Err(format!("unknown model backend '{other}' (expected onnx|stub)")),
        }
    }
}

/// Describes which model to load and where its weights are cached.
///
/// # Example
/// ```no_run
/// use semantic::{load_embedder, ModelConfig};
///
/// # async fn run() -> Result<(), semantic::SemanticError> {
/// let cfg = ModelConfig::with_cache_dir("/tmp/embedding-models");
/// let embedder = load_embedder(&cfg).await?;
/// let vector = embedder.embed("hello world")?;
/// assert_eq!(vector.len(), embedder.dimension());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Model identifier, also the directory name under [`cache_dir`](Self::cache_dir).
    pub model_name: String,
    /// Directory holding downloaded weights. Created when missing.
    pub cache_dir: PathBuf,
    /// Encoder implementation.
    pub backend: Backend,
    /// Base URL for asset downloads; `<hub_url>/<model_name>/resolve/main/<file>`.
    pub hub_url: String,
    /// Tokens beyond this length are truncated.
    pub max_sequence_length: usize,
    /// ONNX Runtime intra-op threads.
    pub intra_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.into(),
            cache_dir: PathBuf::from("./.cache/embedding-models"),
            backend: Backend::Onnx,
            hub_url: DEFAULT_HUB_URL.into(),
            max_sequence_length: 256,
            intra_threads: 4,
        }
    }
}

impl ModelConfig {
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }

    /// Directory that holds this model's files inside the cache.
    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(&self.model_name)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::SemanticError> {
        if self.model_name.trim().is_empty() {
            return Err(crate::SemanticError::InvalidConfig(
                "model_name must not be empty".into(),
            ));
        }
        if self.max_sequence_length == 0 {
            return Err(crate::SemanticError::InvalidConfig(
                "max_sequence_length must be > 0".into(),
            ));
        }
        Ok(())
    }
}
