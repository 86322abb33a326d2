use std::path::PathBuf;
use std::sync::Arc;

use super::indexing_service::{IndexReport, IndexingError, IndexingService};
use super::retrieval_service::{QueryResponse, RetrievalError, RetrievalOptions, RetrievalService};
use crate::application::ports::{
    CollectionStats, Embedder, EmbedderInfo, FileLoader, LlmClient, SearchResult, TextSplitter,
    VectorStore, VectorStoreError,
};
use crate::domain::Page;

/// The adapters a pipeline runs on.
pub struct PipelineComponents {
    pub file_loader: Arc<dyn FileLoader>,
    pub text_splitter: Arc<dyn TextSplitter>,
    pub embedder: Arc<dyn Embedder>,
    pub vector_store: Arc<dyn VectorStore>,
    pub llm_client: Arc<dyn LlmClient>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub pdf_path: PathBuf,
    pub collection_name: String,
    pub embedding_model: String,
    pub llm_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub similarity_threshold: f32,
    pub max_context_tokens: usize,
    pub batch_size: usize,
}

impl PipelineConfig {
    fn retrieval_options(&self) -> RetrievalOptions {
        RetrievalOptions {
            top_k: self.top_k,
            similarity_threshold: self.similarity_threshold,
            max_context_tokens: self.max_context_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexOutcome {
    /// An existing, populated collection was reused.
    Loaded { chunks: usize },
    Built(IndexReport),
}

#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub indexed: bool,
    pub vector_store: CollectionStats,
    pub embedder: EmbedderInfo,
    pub config: PipelineConfig,
    pub last_index: Option<IndexReport>,
}

/// Sequences extract → chunk → embed → store at build time and
/// retrieve → generate at query time.
pub struct RagPipeline {
    indexing: IndexingService<dyn FileLoader, dyn VectorStore, dyn TextSplitter>,
    retrieval: RetrievalService<dyn LlmClient, dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    config: PipelineConfig,
    indexed: bool,
    last_index: Option<IndexReport>,
}

impl RagPipeline {
    pub fn new(components: PipelineComponents, config: PipelineConfig) -> Self {
        let indexing = IndexingService::new(
            components.file_loader,
            components.embedder.clone(),
            components.vector_store.clone(),
            components.text_splitter,
            config.batch_size,
        );
        let retrieval = RetrievalService::new(
            components.embedder.clone(),
            components.llm_client,
            components.vector_store.clone(),
            config.retrieval_options(),
        );

        Self {
            indexing,
            retrieval,
            embedder: components.embedder,
            vector_store: components.vector_store,
            config,
            indexed: false,
            last_index: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Loads a completed collection, or indexes the document when the
    /// collection is missing or empty, when its last build never finished,
    /// or when `force_rebuild` is set.
    #[tracing::instrument(skip(self), fields(collection = %self.config.collection_name))]
    pub async fn build_index(&mut self, force_rebuild: bool) -> Result<IndexOutcome, PipelineError> {
        if force_rebuild {
            tracing::info!("Force rebuild requested, deleting collection");
            self.vector_store.delete_collection().await?;
            return self.run_indexing().await;
        }

        match self.vector_store.collection_stats().await {
            Ok(stats) if stats.total_chunks > 0 && stats.complete => {
                tracing::info!(chunks = stats.total_chunks, "Loaded existing index");
                self.indexed = true;
                Ok(IndexOutcome::Loaded {
                    chunks: stats.total_chunks,
                })
            }
            Ok(stats) if stats.total_chunks > 0 => {
                tracing::warn!(
                    chunks = stats.total_chunks,
                    "Previous build did not finish, rebuilding index"
                );
                self.vector_store.delete_collection().await?;
                self.run_indexing().await
            }
            Ok(_) => {
                tracing::warn!("Collection exists but is empty, indexing document");
                self.run_indexing().await
            }
            Err(e) if e.is_collection_not_found() => {
                tracing::info!("No existing index, building one");
                self.run_indexing().await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn run_indexing(&mut self) -> Result<IndexOutcome, PipelineError> {
        self.indexed = false;
        let report = self.indexing.index_file(&self.config.pdf_path).await?;
        self.indexed = true;
        self.last_index = Some(report.clone());
        Ok(IndexOutcome::Built(report))
    }

    pub async fn query(
        &mut self,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<QueryResponse, PipelineError> {
        if !self.indexed {
            self.build_index(false).await?;
        }
        Ok(self.retrieval.query(question, top_k).await?)
    }

    /// Pages of the configured document, for question generation.
    pub async fn extract_pages(&self) -> Result<Vec<Page>, PipelineError> {
        let (_, pages) = self.indexing.extract(&self.config.pdf_path).await?;
        Ok(pages)
    }

    /// Raw retrieval with an explicit threshold, no generation.
    pub async fn retrieve(
        &self,
        question: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>, PipelineError> {
        Ok(self.retrieval.retrieve(question, top_k, threshold).await?)
    }

    /// Store statistics; a missing collection reports zero chunks.
    pub async fn collection_stats(&self) -> Result<CollectionStats, PipelineError> {
        match self.vector_store.collection_stats().await {
            Ok(stats) => Ok(stats),
            Err(e) if e.is_collection_not_found() => Ok(CollectionStats {
                name: self.config.collection_name.clone(),
                total_chunks: 0,
                dimensions: None,
                complete: false,
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn stats(&self) -> Result<PipelineStats, PipelineError> {
        Ok(PipelineStats {
            indexed: self.indexed,
            vector_store: self.collection_stats().await?,
            embedder: self.embedder.info(),
            config: self.config.clone(),
            last_index: self.last_index.clone(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("indexing failed: {0}")]
    Indexing(#[from] IndexingError),
    #[error("query failed: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("vector store: {0}")]
    VectorStore(#[from] VectorStoreError),
}
