use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::application::ports::{Embedder, EmbedderError, EmbedderInfo};
use crate::domain::Embedding;

/// Sentence-transformer (BERT family) embeddings computed in-process with Candle.
pub struct LocalCandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
}

fn load_err(what: &str) -> impl Fn(String) -> EmbedderError + '_ {
    move |e| EmbedderError::ModelLoadFailed(format!("{what}: {e}"))
}

fn infer_err(e: candle_core::Error) -> EmbedderError {
    EmbedderError::InferenceFailed(e.to_string())
}

impl LocalCandleEmbedder {
    pub fn new(model_id: &str, use_gpu: bool) -> Result<Self, EmbedderError> {
        let device = Self::select_device(use_gpu);
        tracing::info!(device = ?device, model = model_id, "Initializing local embedding model");

        let api = Api::new().map_err(|e| load_err("hub")(e.to_string()))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let fetch = |file: &str| repo.get(file).map_err(|e| load_err(file)(e.to_string()));
        let config_path = fetch("config.json")?;
        let tokenizer_path = fetch("tokenizer.json")?;
        let weights_path = fetch("model.safetensors")?;

        let config: BertConfig = std::fs::read_to_string(&config_path)
            .map_err(|e| load_err("read config")(e.to_string()))
            .and_then(|raw| {
                serde_json::from_str(&raw).map_err(|e| load_err("parse config")(e.to_string()))
            })?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| load_err("tokenizer")(e.to_string()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_position_embeddings,
                ..Default::default()
            }))
            .map_err(|e| load_err("truncation")(e.to_string()))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        let dtype = if device.is_cpu() {
            DType::F32
        } else {
            DType::F16
        };

        // SAFETY: the safetensors file is memory-mapped read-only and not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], dtype, &device)
                .map_err(|e| load_err("weights")(e.to_string()))?
        };
        let model =
            BertModel::load(vb, &config).map_err(|e| load_err("model")(e.to_string()))?;

        tracing::info!(model = model_id, "Local embedding model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            model_id: model_id.to_string(),
        })
    }

    fn select_device(use_gpu: bool) -> Device {
        if !use_gpu {
            return Device::Cpu;
        }
        match Device::cuda_if_available(0) {
            Ok(device) if device.is_cuda() => device,
            _ => Device::new_metal(0).unwrap_or(Device::Cpu),
        }
    }

    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbedderError::InferenceFailed(format!("tokenization: {e}")))?;

        let rows = encodings.len();
        let cols = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);
        let flatten = |select: fn(&Encoding) -> &[u32]| -> Vec<u32> {
            encodings.iter().flat_map(|e| select(e).to_vec()).collect()
        };

        let to_tensor = |values: Vec<u32>| {
            Tensor::from_vec(values, (rows, cols), &self.device).map_err(infer_err)
        };
        let input_ids = to_tensor(flatten(Encoding::get_ids))?;
        let type_ids = to_tensor(flatten(Encoding::get_type_ids))?;
        let mask = to_tensor(flatten(Encoding::get_attention_mask))?;

        let hidden = self
            .model
            .forward(&input_ids, &type_ids, Some(&mask))
            .and_then(|t| t.to_dtype(DType::F32))
            .map_err(infer_err)?;

        // mean pooling over non-padding tokens
        let mask = mask.to_dtype(DType::F32).map_err(infer_err)?;
        let summed = hidden
            .broadcast_mul(&mask.unsqueeze(2).map_err(infer_err)?)
            .and_then(|t| t.sum(1))
            .map_err(infer_err)?;
        let counts = mask
            .sum(1)
            .and_then(|t| t.unsqueeze(1))
            .map_err(infer_err)?;
        let pooled: Vec<Vec<f32>> = summed
            .broadcast_div(&counts)
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(infer_err)?;

        Ok(pooled
            .into_iter()
            .map(|mut v| {
                l2_normalize(&mut v);
                v
            })
            .collect())
    }
}

fn l2_normalize(v: &mut [f32]) {
    let length: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if length > 0.0 {
        v.iter_mut().for_each(|x| *x /= length);
    }
}

#[async_trait]
impl Embedder for LocalCandleEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedderError> {
        self.encode(&[text])?
            .into_iter()
            .next()
            .map(Embedding::new)
            .ok_or_else(|| EmbedderError::InferenceFailed("empty result".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .encode(texts)?
            .into_iter()
            .map(Embedding::new)
            .collect())
    }

    fn info(&self) -> EmbedderInfo {
        EmbedderInfo {
            provider: "local".to_string(),
            model: self.model_id.clone(),
            device: format!("{:?}", self.device),
        }
    }
}
