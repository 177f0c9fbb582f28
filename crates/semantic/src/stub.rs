use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;
use crate::{Embedder, SemanticError};

/// Dimension of the stub vectors, chosen to match all-MiniLM-L6-v2.
pub const STUB_DIMENSION: usize = 384;

/// Deterministic encoder used for offline development and tests.
/// Generates sinusoid values derived from a hash of the input text so equal
/// texts always map to equal unit vectors with minimal CPU cost.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    model_name: String,
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            dimension: STUB_DIMENSION,
        }
    }

    /// Stub standing in for `model_name`. The reported name carries a `stub:`
    /// prefix so health and info endpoints never pass it off as the real model.
    pub fn standing_in_for(model_name: &str) -> Self {
        Self::new(format!("stub:{model_name}"))
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let h = hash64(text.as_bytes());
        let mut v: Vec<f32> = (0..self.dimension)
            .map(|idx| ((h >> (idx % 32)) as f32 * 0.0001 + idx as f32).sin())
            .collect();
        l2_normalize_in_place(&mut v);
        v
    }
}

impl Embedder for StubEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SemanticError> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}
