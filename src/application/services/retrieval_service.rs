use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use super::count_tokens;
use super::prompt::{FALLBACK_ANSWER, SYSTEM_PROMPT, render_context, render_user_prompt};
use crate::application::ports::{
    CompletionRequest, Embedder, EmbedderError, LlmClient, LlmClientError, SearchResult,
    VectorStore, VectorStoreError,
};
use crate::infrastructure::observability::sanitize_prompt;

#[derive(Debug, Clone, Copy)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub similarity_threshold: f32,
    pub max_context_tokens: usize,
}

pub struct RetrievalService<L, V>
where
    L: LlmClient + ?Sized,
    V: VectorStore + ?Sized,
{
    embedder: Arc<dyn Embedder>,
    llm_client: Arc<L>,
    vector_store: Arc<V>,
    options: RetrievalOptions,
}

impl<L, V> RetrievalService<L, V>
where
    L: LlmClient + ?Sized,
    V: VectorStore + ?Sized,
{
    pub fn new(
        embedder: Arc<dyn Embedder>,
        llm_client: Arc<L>,
        vector_store: Arc<V>,
        options: RetrievalOptions,
    ) -> Self {
        Self {
            embedder,
            llm_client,
            vector_store,
            options,
        }
    }

    pub fn options(&self) -> RetrievalOptions {
        self.options
    }

    /// Top-k search filtered by `score >= threshold`, then trimmed to the
    /// context token budget.
    #[tracing::instrument(skip(self, question), fields(question = %sanitize_prompt(question)))]
    pub async fn retrieve(
        &self,
        question: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RetrievalError::EmptyQuestion);
        }

        let query_embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(RetrievalError::Embedding)?;

        let results = self
            .vector_store
            .search(&query_embedding, top_k)
            .await
            .map_err(RetrievalError::Search)?;

        let candidates = results.len();
        let passing: Vec<SearchResult> = results
            .into_iter()
            .filter(|r| r.score >= threshold)
            .collect();
        let kept = apply_token_budget(passing, self.options.max_context_tokens);

        tracing::debug!(
            candidates,
            kept = kept.len(),
            threshold,
            "Retrieved passages"
        );

        Ok(kept)
    }

    pub async fn query(
        &self,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<QueryResponse, RetrievalError> {
        let started = Instant::now();
        let top_k = top_k.unwrap_or(self.options.top_k);

        let results = self
            .retrieve(question, top_k, self.options.similarity_threshold)
            .await?;
        let retrieval_time_ms = elapsed_ms(started);

        if results.is_empty() {
            tracing::info!("No passage passed the similarity threshold");
            return Ok(QueryResponse {
                question: question.trim().to_string(),
                answer: FALLBACK_ANSWER.to_string(),
                sources: Vec::new(),
                retrieval_time_ms,
                generation_time_ms: 0.0,
                total_time_ms: elapsed_ms(started),
                tokens_used: None,
            });
        }

        let generation_started = Instant::now();
        let request = CompletionRequest::new(
            SYSTEM_PROMPT,
            render_user_prompt(&render_context(&results), question.trim()),
        );
        let completion = self
            .llm_client
            .complete(&request)
            .await
            .map_err(RetrievalError::Completion)?;
        let generation_time_ms = elapsed_ms(generation_started);

        tracing::info!(
            sources = results.len(),
            tokens_used = ?completion.tokens_used,
            retrieval_time_ms,
            generation_time_ms,
            "Answer generated"
        );

        Ok(QueryResponse {
            question: question.trim().to_string(),
            answer: completion.text,
            sources: results.iter().map(SourceChunk::from_result).collect(),
            retrieval_time_ms,
            generation_time_ms,
            total_time_ms: elapsed_ms(started),
            tokens_used: completion.tokens_used,
        })
    }
}

/// Keeps passages in rank order while their cumulative token count fits in
/// `max_tokens`. The first passage is always kept.
pub fn apply_token_budget(results: Vec<SearchResult>, max_tokens: usize) -> Vec<SearchResult> {
    let mut used = 0;
    let mut kept = Vec::with_capacity(results.len());

    for result in results {
        let tokens = count_tokens(&result.chunk.text);
        if !kept.is_empty() && used + tokens > max_tokens {
            break;
        }
        used += tokens;
        kept.push(result);
    }

    kept
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceChunk>,
    pub retrieval_time_ms: f64,
    pub generation_time_ms: f64,
    pub total_time_ms: f64,
    pub tokens_used: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceChunk {
    pub chunk_id: String,
    pub page: Option<u32>,
    pub score: f32,
    pub text: String,
    pub preview: String,
}

impl SourceChunk {
    pub fn from_result(result: &SearchResult) -> Self {
        Self {
            chunk_id: result.chunk.id.to_string(),
            page: result.chunk.page,
            score: result.score,
            text: result.chunk.text.clone(),
            preview: result.chunk.preview(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("question is empty")]
    EmptyQuestion,
    #[error("embedding: {0}")]
    Embedding(EmbedderError),
    #[error("search: {0}")]
    Search(#[from] VectorStoreError),
    #[error("completion: {0}")]
    Completion(LlmClientError),
}
