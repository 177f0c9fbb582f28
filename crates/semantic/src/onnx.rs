//! ONNX Runtime encoder for sentence-transformers exports.

use ndarray::{Array, Array2};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::Value;
use std::sync::Mutex;
use tokenizers::{Tokenizer, TruncationParams};

use crate::assets::ModelAssets;
use crate::normalize::{l2_normalize_in_place, mean_pool};
use crate::{Embedder, ModelConfig, SemanticError};

/// Text probed at load time to discover the output dimension.
const PROBE_TEXT: &str = "dimension probe";

/// Optional BERT segment input; some exports drop it from the graph.
const TOKEN_TYPE_IDS: &str = "token_type_ids";

/// Sentence-transformer model running on ONNX Runtime.
///
/// `Session::run` needs `&mut Session`, so the session sits behind a mutex;
/// the tokenizer is shared without locking.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_name: String,
    dimension: usize,
    uses_token_type_ids: bool,
}

impl std::fmt::Debug for OnnxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbedder")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("uses_token_type_ids", &self.uses_token_type_ids)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbedder {
    pub(crate) fn load(assets: &ModelAssets, cfg: &ModelConfig) -> Result<Self, SemanticError> {
        let mut tokenizer = Tokenizer::from_file(&assets.tokenizer_path)
            .map_err(|e| SemanticError::Tokenizer(e.to_string()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: cfg.max_sequence_length,
                ..Default::default()
            }))
            .map_err(|e| SemanticError::Tokenizer(e.to_string()))?;
        // Padding is done per batch in `build_padded_arrays`.
        tokenizer.with_padding(None);

        let session = build_session(assets, cfg)?;
        let uses_token_type_ids =
            declares_token_type_ids(session.inputs.iter().map(|input| input.name.as_str()));

        let mut embedder = Self {
            session: Mutex::new(session),
            tokenizer,
            model_name: cfg.model_name.clone(),
            dimension: 0,
            uses_token_type_ids,
        };
        let probe = embedder.run_batch(&[PROBE_TEXT])?;
        embedder.dimension = probe.first().map(Vec::len).unwrap_or_default();
        if embedder.dimension == 0 {
            return Err(SemanticError::Inference(
                "model produced an empty probe embedding".into(),
            ));
        }

        tracing::info!(
            model = %embedder.model_name,
            dimension = embedder.dimension,
            token_type_ids = embedder.uses_token_type_ids,
            "ONNX embedding model loaded"
        );
        Ok(embedder)
    }

    fn run_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SemanticError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let (encoded, max_len) = encode_documents(&self.tokenizer, texts)?;
        let masks: Vec<Vec<i64>> = encoded.iter().map(|doc| doc.mask.clone()).collect();
        let (input_ids, attn_mask) = build_padded_arrays(encoded, max_len)?;
        let (batch, seq_len) = input_ids.dim();

        let (shape, flat) = self.execute_session(input_ids, attn_mask)?;
        let mut vectors = pool_outputs(&shape, &flat, &masks, batch, seq_len)?;
        for vector in &mut vectors {
            l2_normalize_in_place(vector);
        }
        Ok(vectors)
    }

    /// Runs the graph and copies the first output out while the session lock is held.
    fn execute_session(
        &self,
        input_ids: Array2<i64>,
        attn_mask: Array2<i64>,
    ) -> Result<(Vec<usize>, Vec<f32>), SemanticError> {
        let (batch, seq_len) = input_ids.dim();

        let input_ids = Value::from_array(input_ids).map_err(inference_err)?;
        let attn_mask = Value::from_array(attn_mask).map_err(inference_err)?;
        let mut inputs = ort::inputs![
            "input_ids" => input_ids,
            "attention_mask" => attn_mask
        ];
        if self.uses_token_type_ids {
            let token_type_ids = Array::from_elem((batch, seq_len), 0_i64);
            let token_type_ids = Value::from_array(token_type_ids).map_err(inference_err)?;
            inputs.push((TOKEN_TYPE_IDS.into(), token_type_ids.into()));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| SemanticError::Inference("ONNX session lock poisoned".into()))?;
        let outputs = session.run(inputs).map_err(inference_err)?;

        // Output names differ between exports; the first output is the hidden state.
        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(inference_err)?;
        let shape = tensor.shape().to_vec();
        let flat: Vec<f32> = tensor.iter().copied().collect();
        Ok((shape, flat))
    }
}

impl Embedder for OnnxEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SemanticError> {
        let vectors = self.run_batch(texts)?;
        if vectors.len() != texts.len() {
            return Err(SemanticError::Inference(format!(
                "model returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}

/// Whether the graph takes a `token_type_ids` input. Feeding a name the graph
/// does not declare fails every run.
fn declares_token_type_ids<'a>(input_names: impl IntoIterator<Item = &'a str>) -> bool {
    input_names.into_iter().any(|name| name == TOKEN_TYPE_IDS)
}

fn inference_err(e: impl std::fmt::Display) -> SemanticError {
    SemanticError::Inference(e.to_string())
}

fn base_builder(cfg: &ModelConfig) -> Result<SessionBuilder, SemanticError> {
    Session::builder()
        .map_err(inference_err)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(inference_err)?
        .with_intra_threads(cfg.intra_threads.max(1))
        .map_err(inference_err)
}

#[cfg(feature = "cuda")]
fn build_session(assets: &ModelAssets, cfg: &ModelConfig) -> Result<Session, SemanticError> {
    use ort::execution_providers::CUDAExecutionProvider;

    let cuda = base_builder(cfg)?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .map_err(inference_err)
        .and_then(|b| b.commit_from_file(&assets.model_path).map_err(inference_err));

    match cuda {
        Ok(session) => {
            tracing::info!("CUDA execution provider initialized");
            Ok(session)
        }
        Err(err) => {
            tracing::warn!(error = %err, "CUDA execution provider failed, falling back to CPU");
            build_cpu_session(assets, cfg)
        }
    }
}

#[cfg(not(feature = "cuda"))]
fn build_session(assets: &ModelAssets, cfg: &ModelConfig) -> Result<Session, SemanticError> {
    build_cpu_session(assets, cfg)
}

fn build_cpu_session(assets: &ModelAssets, cfg: &ModelConfig) -> Result<Session, SemanticError> {
    base_builder(cfg)?
        .commit_from_file(&assets.model_path)
        .map_err(|e| {
            SemanticError::Inference(format!(
                "failed to load ONNX model from {}: {e}",
                assets.model_path.display()
            ))
        })
}

#[derive(Debug)]
struct EncodedDoc {
    ids: Vec<i64>,
    mask: Vec<i64>,
}

fn encode_documents(
    tokenizer: &Tokenizer,
    texts: &[&str],
) -> Result<(Vec<EncodedDoc>, usize), SemanticError> {
    let mut encoded = Vec::with_capacity(texts.len());
    let mut max_len = 0usize;

    for text in texts {
        let encoding = tokenizer
            .encode(*text, true)
            .map_err(|e| SemanticError::Tokenizer(e.to_string()))?;
        let ids: Vec<i64> = encoding.get_ids().iter().map(|&x| x as i64).collect();
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&x| x as i64)
            .collect();
        max_len = max_len.max(ids.len());
        encoded.push(EncodedDoc { ids, mask });
    }

    Ok((encoded, max_len))
}

fn build_padded_arrays(
    encoded: Vec<EncodedDoc>,
    max_len: usize,
) -> Result<(Array2<i64>, Array2<i64>), SemanticError> {
    let seq_len = max_len.max(1);
    let batch = encoded.len();
    let mut id_storage = Vec::with_capacity(batch * seq_len);
    let mut mask_storage = Vec::with_capacity(batch * seq_len);

    for EncodedDoc { ids, mask } in encoded {
        if ids.len() != mask.len() {
            return Err(SemanticError::Inference(
                "tokenizer produced mismatched id/mask lengths".into(),
            ));
        }
        let pad = seq_len.saturating_sub(ids.len());
        id_storage.extend(ids);
        mask_storage.extend(mask);
        id_storage.extend(std::iter::repeat_n(0, pad));
        mask_storage.extend(std::iter::repeat_n(0, pad));
    }

    let input_ids = Array::from_shape_vec((batch, seq_len), id_storage).map_err(inference_err)?;
    let attn_mask = Array::from_shape_vec((batch, seq_len), mask_storage).map_err(inference_err)?;
    Ok((input_ids, attn_mask))
}

/// Turns the raw model output into one vector per input.
///
/// `[batch, seq, hidden]` outputs are mean pooled over real tokens;
/// `[batch, hidden]` outputs are already sentence embeddings.
fn pool_outputs(
    shape: &[usize],
    flat: &[f32],
    masks: &[Vec<i64>],
    batch: usize,
    seq_len: usize,
) -> Result<Vec<Vec<f32>>, SemanticError> {
    match shape {
        &[b, s, hidden] if b == batch && s == seq_len && hidden > 0 => Ok(flat
            .chunks_exact(s * hidden)
            .zip(masks)
            .map(|(tokens, mask)| mean_pool(tokens, mask, hidden))
            .collect()),
        &[b, hidden] if b == batch && hidden > 0 => {
            Ok(flat.chunks_exact(hidden).map(<[f32]>::to_vec).collect())
        }
        _ => Err(SemanticError::Inference(format!(
            "unexpected model output shape {shape:?} for batch {batch} x {seq_len}"
        ))),
    }
}
