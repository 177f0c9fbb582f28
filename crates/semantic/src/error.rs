use std::io;
use thiserror::Error;

/// Errors surfaced while loading or running an embedding model.
#[derive(Debug, Error)]
pub enum SemanticError {
    /// Configuration is inconsistent (e.g., zero sequence length).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// Unable to download remote assets.
    #[error("download failed: {0}")]
    Download(String),
    /// Low-level IO failures while touching the cache directory.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// Tokenizer could not be loaded or configured.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    /// ONNX Runtime, pooling, or shape errors.
    #[error("inference failure: {0}")]
    Inference(String),
}
