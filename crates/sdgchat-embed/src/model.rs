use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;
use crate::Embedder;

const MAX_LEN: usize = 256;

/// XLM-RoBERTa sentence embedder loaded from a local model directory
/// (`tokenizer.json`, `config.json`, `pytorch_model.bin`). Multilingual,
/// so one vector space serves English and French questions.
pub struct TransformerEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    model_name: String,
}

impl TransformerEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        if !model_dir.exists() {
            return Err(anyhow!("model directory not found: {}", model_dir.display()));
        }
        let device = select_device();

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let dim = config.hidden_size;

        let weights_path = resolve_weights(model_dir)?;
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;

        let model_name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        tracing::info!("loaded embedding model '{}' (dim={})", model_name, dim);
        Ok(Self { model, tokenizer, device, dim, model_name })
    }
}

fn resolve_weights(model_dir: &Path) -> Result<PathBuf> {
    let candidate = model_dir.join("pytorch_model.bin");
    if candidate.exists() {
        return Ok(candidate);
    }
    Err(anyhow!("no model weights under {}", model_dir.display()))
}

impl Embedder for TransformerEmbedder {
    fn id(&self) -> String {
        format!("xlm-roberta:{}", self.model_name)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, MAX_LEN, &self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_LEN), DType::I64, &self.device)?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vector: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        anyhow::ensure!(vector.len() == self.dim, "unexpected embedding width {}", vector.len());
        Ok(vector)
    }
}
