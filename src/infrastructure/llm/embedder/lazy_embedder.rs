use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use super::EmbedderFactoryError;
use crate::application::ports::{Embedder, EmbedderError, EmbedderInfo};
use crate::domain::Embedding;

type Loader = Box<dyn Fn() -> Result<Arc<dyn Embedder>, EmbedderFactoryError> + Send + Sync>;

/// Defers building the real embedder until the first text is embedded, so
/// modes that only read the store never load a model.
pub struct LazyEmbedder {
    loader: Loader,
    inner: OnceCell<Arc<dyn Embedder>>,
    info: EmbedderInfo,
}

impl LazyEmbedder {
    /// `info` is reported until the embedder is loaded.
    pub fn new<F>(info: EmbedderInfo, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Embedder>, EmbedderFactoryError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            inner: OnceCell::new(),
            info,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.initialized()
    }

    async fn inner(&self) -> Result<&Arc<dyn Embedder>, EmbedderError> {
        self.inner
            .get_or_try_init(|| async {
                tracing::debug!(model = %self.info.model, "Loading embedder on first use");
                (self.loader)().map_err(|e| EmbedderError::ModelLoadFailed(e.to_string()))
            })
            .await
    }
}

#[async_trait]
impl Embedder for LazyEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedderError> {
        self.inner().await?.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbedderError> {
        self.inner().await?.embed_batch(texts).await
    }

    fn info(&self) -> EmbedderInfo {
        match self.inner.get() {
            Some(embedder) => embedder.info(),
            None => self.info.clone(),
        }
    }
}
