use crate::SemanticError;

/// A loaded sentence-embedding model.
///
/// Implementations are loaded once and then shared read-only across request
/// handlers, so every method takes `&self` and the trait requires `Send + Sync`.
/// Vectors are always L2-normalized.
pub trait Embedder: Send + Sync {
    /// Identifier of the loaded model.
    fn model_name(&self) -> &str;

    /// Length of every vector this model returns.
    fn dimension(&self) -> usize;

    /// Encodes `texts` in one inference pass. Output `i` belongs to input `i`.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SemanticError>;

    /// Encodes one text through the batch path so single and batch results agree.
    fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| SemanticError::Inference("model returned no outputs".into()))
    }
}
