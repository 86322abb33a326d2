use async_trait::async_trait;

use crate::domain::{Document, Page};

#[async_trait]
pub trait FileLoader: Send + Sync {
    /// Extracts the non-empty pages of a document, numbered from 1.
    async fn extract_pages(
        &self,
        data: &[u8],
        document: &Document,
    ) -> Result<Vec<Page>, FileLoaderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FileLoaderError {
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("no extractable text in {0}")]
    NoTextFound(String),
}
