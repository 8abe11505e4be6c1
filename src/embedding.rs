//! Synchronous sentence embeddings for card text.
//!
//! The default engine runs bge-small-en-v1.5 (384 dimensions) through ONNX
//! Runtime with mean pooling and L2 normalization.

use std::path::Path;

use hf_hub::api::sync::ApiBuilder;
use ort::inputs;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};

use crate::errors::Error;

/// Embedding dimensions for bge-small-en-v1.5 model.
pub const EMBEDDING_DIMS: usize = 384;

/// Longest token sequence fed to the model; longer text is truncated.
const MAX_TOKENS: usize = 512;

/// Anything that turns text into an `EMBEDDING_DIMS` vector.
///
/// `embed` takes `&mut self` because ONNX sessions mutate internal buffers
/// on every run. Callers that share an embedder across threads wrap it in a
/// mutex.
pub trait Embedder: Send {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>, Error>;
}

/// ONNX embedding engine backed by a HuggingFace model repo.
pub struct EmbeddingEngine {
    session: Session,
    tokenizer: Tokenizer,
    requires_token_type_ids: bool,
}

impl EmbeddingEngine {
    /// Load `model_id` from `cache_dir`, downloading it on first use.
    pub fn new(model_id: &str, cache_dir: &Path) -> Result<Self, Error> {
        let api = ApiBuilder::new()
            .with_cache_dir(cache_dir.to_path_buf())
            .with_progress(false)
            .build()?;
        let repo = api.model(model_id.to_string());

        let model_path = repo
            .get("onnx/model.onnx")
            .or_else(|_| repo.get("model.onnx"))?;
        let tokenizer_path = repo.get("tokenizer.json")?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)?;
        tokenizer
            .with_padding(None)
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level1)
            .map_err(ort::Error::from)?
            .commit_from_file(&model_path)?;

        let requires_token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        tracing::debug!(model_id, requires_token_type_ids, "embedding model loaded");

        Ok(EmbeddingEngine {
            session,
            tokenizer,
            requires_token_type_ids,
        })
    }

    /// Run the model and return the raw `last_hidden_state` as (seq_len, data).
    fn hidden_states(&mut self, ids: &[u32], mask: &[u32]) -> Result<Vec<f32>, Error> {
        let seq_len = ids.len();
        let to_i64 = |v: &[u32]| v.iter().map(|&x| x as i64).collect::<Vec<i64>>();

        let input_ids = Tensor::from_array(([1usize, seq_len], to_i64(ids)))?;
        let attention_mask = Tensor::from_array(([1usize, seq_len], to_i64(mask)))?;

        let outputs = if self.requires_token_type_ids {
            let token_type_ids = Tensor::from_array(([1usize, seq_len], vec![0i64; seq_len]))?;
            self.session.run(inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids
            ])?
        } else {
            self.session.run(inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask
            ])?
        };

        let (shape, data) = outputs
            .get("last_hidden_state")
            .or_else(|| outputs.get("token_embeddings"))
            .ok_or_else(|| Error::Inference("model produced no token embeddings".to_string()))?
            .try_extract_tensor::<f32>()?;

        if shape.len() != 3 || shape[0] != 1 || shape[2] as usize != EMBEDDING_DIMS {
            return Err(Error::Inference(format!(
                "unexpected output shape {shape:?}, wanted [1, seq_len, {EMBEDDING_DIMS}]"
            )));
        }

        Ok(data.to_vec())
    }
}

impl Embedder for EmbeddingEngine {
    /// Empty or token-less text maps to the zero vector.
    fn embed(&mut self, text: &str) -> Result<Vec<f32>, Error> {
        if text.is_empty() {
            return Ok(vec![0.0; EMBEDDING_DIMS]);
        }

        let encoding = self.tokenizer.encode(text, true)?;
        let ids = encoding.get_ids();
        let mask = encoding.get_attention_mask();
        if ids.is_empty() {
            return Ok(vec![0.0; EMBEDDING_DIMS]);
        }

        let hidden = self.hidden_states(ids, mask)?;
        Ok(l2_normalize(&mean_pool(&hidden, mask)))
    }
}

/// Average token vectors weighted by the attention mask.
fn mean_pool(hidden: &[f32], mask: &[u32]) -> Vec<f32> {
    let mut pooled = vec![0.0f32; EMBEDDING_DIMS];
    let mut weight = 0.0f32;

    for (token, &m) in hidden.chunks(EMBEDDING_DIMS).zip(mask) {
        let m = m as f32;
        weight += m;
        for (acc, &v) in pooled.iter_mut().zip(token) {
            *acc += v * m;
        }
    }

    let weight = weight.max(1e-9);
    pooled.iter_mut().for_each(|v| *v /= weight);
    pooled
}

fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-9);
    vec.iter().map(|x| x / norm).collect()
}
