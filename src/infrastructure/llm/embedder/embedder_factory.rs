use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{Embedder, EmbedderInfo};
use crate::presentation::config::{EmbeddingProvider, Settings};

use super::{LazyEmbedder, LocalCandleEmbedder, OpenAiEmbedder};

pub struct EmbedderFactory;

#[derive(Debug, thiserror::Error)]
pub enum EmbedderFactoryError {
    #[error("missing API key: OpenAI embedder requires OPENAI_API_KEY")]
    MissingApiKey,
    #[error("model initialization failed: {0}")]
    InitializationFailed(String),
}

impl EmbedderFactory {
    pub fn create(
        provider: EmbeddingProvider,
        model: String,
        api_key: Option<String>,
        base_url: &str,
        use_gpu: bool,
        timeout: Duration,
    ) -> Result<Arc<dyn Embedder>, EmbedderFactoryError> {
        match provider {
            EmbeddingProvider::Local => {
                tracing::info!(model = %model, use_gpu, "Loading local embedding model");
                let embedder = LocalCandleEmbedder::new(&model, use_gpu)
                    .map_err(|e| EmbedderFactoryError::InitializationFailed(e.to_string()))?;
                Ok(Arc::new(embedder))
            }
            EmbeddingProvider::OpenAi => {
                let key = api_key
                    .filter(|k| !k.is_empty())
                    .ok_or(EmbedderFactoryError::MissingApiKey)?;
                tracing::info!(model = %model, "Using OpenAI embedding model");
                Ok(Arc::new(OpenAiEmbedder::new(key, model, base_url, timeout)))
            }
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Arc<dyn Embedder>, EmbedderFactoryError> {
        Self::create(
            settings.embedding_provider,
            settings.embedding_model.clone(),
            settings.openai_api_key.clone(),
            &settings.openai_base_url,
            settings.use_gpu,
            settings.request_timeout(),
        )
    }

    /// Embedder built from `settings` on first use.
    pub fn lazy_from_settings(settings: &Settings) -> Arc<dyn Embedder> {
        let info = EmbedderInfo {
            provider: settings.embedding_provider.as_str().to_string(),
            model: settings.embedding_model.clone(),
            device: match settings.embedding_provider {
                EmbeddingProvider::Local => "not loaded".to_string(),
                EmbeddingProvider::OpenAi => "remote".to_string(),
            },
        };
        let settings = settings.clone();
        Arc::new(LazyEmbedder::new(info, move || Self::from_settings(&settings)))
    }
}
