use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::application::ports::{
    Embedder, EmbedderError, FileLoader, FileLoaderError, TextSplitter, TextSplitterError,
    VectorStore, VectorStoreError,
};
use crate::domain::{ContentType, Document, Page};

/// Summary of one indexing run.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexReport {
    pub document: String,
    pub pages: usize,
    pub chunks: usize,
    pub dimensions: usize,
    pub elapsed: Duration,
}

pub struct IndexingService<F, V, T>
where
    F: FileLoader + ?Sized,
    V: VectorStore + ?Sized,
    T: TextSplitter + ?Sized,
{
    file_loader: Arc<F>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<V>,
    text_splitter: Arc<T>,
    batch_size: usize,
}

impl<F, V, T> IndexingService<F, V, T>
where
    F: FileLoader + ?Sized,
    V: VectorStore + ?Sized,
    T: TextSplitter + ?Sized,
{
    pub fn new(
        file_loader: Arc<F>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<V>,
        text_splitter: Arc<T>,
        batch_size: usize,
    ) -> Self {
        Self {
            file_loader,
            embedder,
            vector_store,
            text_splitter,
            batch_size: batch_size.max(1),
        }
    }

    /// Reads `path` and extracts its non-empty pages without touching the store.
    pub async fn extract(&self, path: &Path) -> Result<(Document, Vec<Page>), IndexingError> {
        if !path.exists() {
            return Err(IndexingError::DocumentNotFound(path.to_path_buf()));
        }
        let content_type = ContentType::from_path(path)
            .ok_or_else(|| IndexingError::UnsupportedDocument(path.to_path_buf()))?;
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| IndexingError::Io(path.to_path_buf(), e))?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let document = Document::new(filename, content_type, data.len() as u64);

        let pages = self.file_loader.extract_pages(&data, &document).await?;
        tracing::info!(pages = pages.len(), "Extracted document text");
        Ok((document, pages))
    }

    /// Extracts, chunks and embeds `path`, storing chunks batch by batch.
    /// The collection is created on the first batch once the embedding
    /// dimension is known and marked complete after the last one.
    #[tracing::instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn index_file(&self, path: &Path) -> Result<IndexReport, IndexingError> {
        let started = Instant::now();
        let (document, pages) = self.extract(path).await?;

        let chunks = self.text_splitter.split(&pages, document.id).await?;
        if chunks.is_empty() {
            return Err(IndexingError::NoChunks(path.to_path_buf()));
        }
        tracing::info!(chunks = chunks.len(), "Chunked document");

        let total_batches = chunks.len().div_ceil(self.batch_size);
        let mut dimensions = 0;

        for (index, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if index == 0 {
                dimensions = embeddings.first().map(|e| e.dimensions()).unwrap_or(0);
                self.ensure_collection(dimensions).await?;
            }

            self.vector_store.upsert(batch, &embeddings).await?;
            tracing::debug!(batch = index + 1, total_batches, "Stored embedding batch");
        }
        self.vector_store.mark_complete().await?;

        let report = IndexReport {
            document: document.filename,
            pages: pages.len(),
            chunks: chunks.len(),
            dimensions,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            chunks = report.chunks,
            pages = report.pages,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Index built"
        );

        Ok(report)
    }

    /// Creates the collection when the store reports it missing. Leftovers of
    /// an interrupted build and empty collections with another dimension are
    /// recreated; a populated one is a mismatch the caller must resolve with a
    /// rebuild.
    async fn ensure_collection(&self, dimensions: usize) -> Result<(), IndexingError> {
        match self.vector_store.collection_stats().await {
            Ok(stats) if stats.total_chunks > 0 && !stats.complete => {
                tracing::warn!(
                    chunks = stats.total_chunks,
                    "Discarding chunks of an interrupted build"
                );
                self.vector_store.delete_collection().await?;
                self.vector_store.create_collection(dimensions).await?;
                Ok(())
            }
            Ok(stats) if stats.dimensions == Some(dimensions) => Ok(()),
            Ok(stats) if stats.total_chunks == 0 => {
                tracing::warn!(
                    existing = ?stats.dimensions,
                    dimensions,
                    "Recreating empty collection with new embedding dimension"
                );
                self.vector_store.delete_collection().await?;
                self.vector_store.create_collection(dimensions).await?;
                Ok(())
            }
            Ok(stats) => Err(VectorStoreError::DimensionMismatch {
                expected: stats.dimensions.unwrap_or(0),
                actual: dimensions,
            }
            .into()),
            Err(e) if e.is_collection_not_found() => {
                tracing::info!(dimensions, "Collection missing, creating it");
                self.vector_store.create_collection(dimensions).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IndexingError {
    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),
    #[error("unsupported document type: {}", .0.display())]
    UnsupportedDocument(PathBuf),
    #[error("failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("no chunks produced from {}", .0.display())]
    NoChunks(PathBuf),
    #[error("file loading: {0}")]
    FileLoading(#[from] FileLoaderError),
    #[error("text splitting: {0}")]
    Splitting(#[from] TextSplitterError),
    #[error("embedding: {0}")]
    Embedding(#[from] EmbedderError),
    #[error("storage: {0}")]
    Storage(#[from] VectorStoreError),
}
