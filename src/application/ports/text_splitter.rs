use async_trait::async_trait;

use crate::domain::{Chunk, DocumentId, Page};

#[async_trait]
pub trait TextSplitter: Send + Sync {
    async fn split(
        &self,
        pages: &[Page],
        document_id: DocumentId,
    ) -> Result<Vec<Chunk>, TextSplitterError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TextSplitterError {
    #[error("invalid splitter parameters: {0}")]
    InvalidParameters(String),
    #[error("splitting failed: {0}")]
    SplittingFailed(String),
}
