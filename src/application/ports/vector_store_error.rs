#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("collection not found: {0}")]
    CollectionNotFound(String),
    #[error("collection creation failed: {0}")]
    CollectionCreationFailed(String),
    #[error("collection deletion failed: {0}")]
    CollectionDeletionFailed(String),
    #[error("embedding dimension mismatch: collection has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("upsert failed: {0}")]
    UpsertFailed(String),
    #[error("search failed: {0}")]
    SearchFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
}

const MISSING_COLLECTION_MARKERS: [&str; 4] = [
    "no such table",
    "does not exist",
    "not found",
    "no such collection",
];

impl VectorStoreError {
    pub fn is_collection_not_found(&self) -> bool {
        matches!(self, Self::CollectionNotFound(_))
    }

    /// Maps a backend failure to `CollectionNotFound` when its message says the
    /// collection is missing, otherwise wraps it with `fallback`.
    pub fn classify(
        collection: &str,
        message: impl Into<String>,
        fallback: fn(String) -> Self,
    ) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if MISSING_COLLECTION_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
        {
            Self::CollectionNotFound(collection.to_string())
        } else {
            fallback(message)
        }
    }
}
