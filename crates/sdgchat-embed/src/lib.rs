//! Dense question/document embeddings.
//!
//! `TransformerEmbedder` runs an XLM-RoBERTa-family model from local files
//! via candle. `HashEmbedder` is a deterministic bag-of-words stand-in used
//! by tests and by `APP_USE_FAKE_EMBEDDINGS=1` environments without model
//! weights. Both produce unit-norm vectors, so cosine similarity reduces to
//! a dot product over comparable scales.

pub mod device;
pub mod model;
pub mod pool;
pub mod tokenize;

use anyhow::Result;
use std::path::Path;

use sdgchat_core::types::EmbeddingTable;

pub use model::TransformerEmbedder;

pub trait Embedder: Send + Sync {
    /// Stable identifier recorded in the cache manifest; a change in
    /// embedder invalidates nothing by itself, but lets a mismatch be seen.
    fn id(&self) -> String;
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Deterministic hashing embedder for tests and model-less machines.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> String {
        format!("hash-{}", self.dim)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for token in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            v[idx] += (((h >> 32) as u32) as f32) / (u32::MAX as f32) + 0.1;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

/// Model selection: the hash embedder when `APP_USE_FAKE_EMBEDDINGS` is
/// set, otherwise the transformer loaded from `model_dir`.
pub fn default_embedder(model_dir: &Path) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        tracing::info!("using hash embedder (APP_USE_FAKE_EMBEDDINGS)");
        return Ok(Box::new(HashEmbedder::new(256)));
    }
    Ok(Box::new(TransformerEmbedder::load(model_dir)?))
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

/// Index of the most similar table row. The arg-max is accepted even when
/// similarity is low; this stage is the documented last resort.
pub fn best_match(table: &EmbeddingTable, query: &[f32]) -> Option<usize> {
    table
        .vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (i, cosine_similarity(query, v)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}
