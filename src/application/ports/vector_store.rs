use async_trait::async_trait;

use super::{CollectionStats, SearchResult, VectorStoreError};
use crate::domain::{Chunk, Embedding};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Returns `false` when the collection already existed. An existing
    /// collection without chunks takes `dimensions` and is marked incomplete.
    async fn create_collection(&self, dimensions: usize) -> Result<bool, VectorStoreError>;

    async fn collection_exists(&self) -> Result<bool, VectorStoreError>;

    /// Fails with [`VectorStoreError::CollectionNotFound`] for an absent collection.
    async fn collection_stats(&self) -> Result<CollectionStats, VectorStoreError>;

    /// Succeeds when the collection is already gone.
    async fn delete_collection(&self) -> Result<(), VectorStoreError>;

    /// Records that every batch of a build was stored.
    async fn mark_complete(&self) -> Result<(), VectorStoreError>;

    async fn upsert(
        &self,
        chunks: &[Chunk],
        embeddings: &[Embedding],
    ) -> Result<(), VectorStoreError>;

    async fn search(
        &self,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, VectorStoreError>;

    async fn peek(&self, limit: usize) -> Result<Vec<Chunk>, VectorStoreError>;
}
