use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use docqa::application::ports::{
    CollectionStats, Completion, CompletionRequest, Embedder, EmbedderError, EmbedderInfo,
    LlmClient, LlmClientError, SearchResult, VectorStore, VectorStoreError,
};
use docqa::domain::{Chunk, DocumentId, Embedding};

pub const HASH_DIMENSIONS: usize = 64;

/// Bag-of-words embedder: each lowercase word bumps one hashed bucket, so
/// texts sharing words score higher than unrelated ones.
pub struct HashEmbedder {
    pub dimensions: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            dimensions: HASH_DIMENSIONS,
        }
    }

    pub fn vector(&self, text: &str) -> Embedding {
        let mut values = vec![0.0_f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(7_usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
            values[bucket % self.dimensions] += 1.0;
        }
        Embedding::new(values)
    }
}

#[async_trait::async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedderError> {
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbedderError> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn info(&self) -> EmbedderInfo {
        EmbedderInfo {
            provider: "mock".to_string(),
            model: "hash".to_string(),
            device: "cpu".to_string(),
        }
    }
}

pub struct FailingEmbedder;

#[async_trait::async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding, EmbedderError> {
        Err(EmbedderError::InferenceFailed("boom".to_string()))
    }

    async fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Embedding>, EmbedderError> {
        Err(EmbedderError::InferenceFailed("boom".to_string()))
    }

    fn info(&self) -> EmbedderInfo {
        EmbedderInfo {
            provider: "mock".to_string(),
            model: "failing".to_string(),
            device: "cpu".to_string(),
        }
    }
}

/// Hash embeddings until the batch numbered `fail_on` (1-based), which is
/// rate limited.
pub struct FlakyEmbedder {
    inner: HashEmbedder,
    fail_on: usize,
    batches: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn failing_on_batch(fail_on: usize) -> Self {
        Self {
            inner: HashEmbedder::new(),
            fail_on,
            batches: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Embedder for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedderError> {
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbedderError> {
        let batch = self.batches.fetch_add(1, Ordering::SeqCst) + 1;
        if batch == self.fail_on {
            return Err(EmbedderError::RateLimited);
        }
        self.inner.embed_batch(texts).await
    }

    fn info(&self) -> EmbedderInfo {
        self.inner.info()
    }
}

/// Answers every request with a fixed text and counts calls.
pub struct MockLlmClient {
    pub answer: String,
    pub calls: AtomicUsize,
    pub last_request: Mutex<Option<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        Ok(Completion {
            text: self.answer.clone(),
            tokens_used: Some(42),
        })
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

pub struct FailingLlmClient;

#[async_trait::async_trait]
impl LlmClient for FailingLlmClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<Completion, LlmClientError> {
        Err(LlmClientError::RateLimited)
    }

    fn model(&self) -> &str {
        "failing-model"
    }
}

/// Returns canned search results regardless of the query.
pub struct StaticVectorStore {
    pub results: Vec<SearchResult>,
}

impl StaticVectorStore {
    pub fn with_scores(scores: &[f32]) -> Self {
        let document_id = DocumentId::new();
        Self {
            results: scores
                .iter()
                .enumerate()
                .map(|(i, score)| SearchResult {
                    chunk: Chunk::new(
                        format!("passage number {i}"),
                        document_id,
                        Some(i as u32 + 1),
                        0,
                    ),
                    score: *score,
                })
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl VectorStore for StaticVectorStore {
    async fn create_collection(&self, _dimensions: usize) -> Result<bool, VectorStoreError> {
        Ok(true)
    }

    async fn collection_exists(&self) -> Result<bool, VectorStoreError> {
        Ok(true)
    }

    async fn collection_stats(&self) -> Result<CollectionStats, VectorStoreError> {
        Ok(CollectionStats {
            name: "static".to_string(),
            total_chunks: self.results.len(),
            dimensions: Some(HASH_DIMENSIONS),
            complete: true,
        })
    }

    async fn delete_collection(&self) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn mark_complete(&self) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn upsert(
        &self,
        _chunks: &[Chunk],
        _embeddings: &[Embedding],
    ) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn search(
        &self,
        _embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, VectorStoreError> {
        Ok(self.results.iter().take(top_k).cloned().collect())
    }

    async fn peek(&self, limit: usize) -> Result<Vec<Chunk>, VectorStoreError> {
        Ok(self
            .results
            .iter()
            .take(limit)
            .map(|r| r.chunk.clone())
            .collect())
    }
}
