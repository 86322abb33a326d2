use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ArtifactError, GeneratedQuestion, read_json, write_json};
use crate::application::services::pipeline::RagPipeline;
use crate::application::services::retrieval_service::SourceChunk;
use crate::infrastructure::observability::sanitize_prompt;

/// One answered (or failed) question from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<RecordedSource>,
    #[serde(default)]
    pub num_sources: usize,
    #[serde(default)]
    pub pages: Vec<u32>,
    #[serde(default)]
    pub retrieval_time_ms: f64,
    #[serde(default)]
    pub generation_time_ms: f64,
    #[serde(default)]
    pub total_time_ms: f64,
    #[serde(default)]
    pub tokens_used: Option<u32>,
    pub query_time_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_metadata: Option<GeneratedQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedSource {
    pub chunk_id: String,
    pub page: Option<u32>,
    pub score: f32,
    pub preview: String,
}

impl From<&SourceChunk> for RecordedSource {
    fn from(source: &SourceChunk) -> Self {
        Self {
            chunk_id: source.chunk_id.clone(),
            page: source.page,
            score: source.score,
            preview: source.preview.clone(),
        }
    }
}

impl QaRecord {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QaStatistics {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub avg_query_time_seconds: f64,
    pub avg_sources_per_query: f64,
    pub total_time_seconds: f64,
}

impl QaStatistics {
    pub fn from_records(records: &[QaRecord]) -> Self {
        let total = records.len();
        let successful = records.iter().filter(|r| r.is_success()).count();
        let total_time_seconds: f64 = records.iter().map(|r| r.query_time_seconds).sum();
        let total_sources: usize = records.iter().map(|r| r.num_sources).sum();

        let average = |sum: f64| if total > 0 { sum / total as f64 } else { 0.0 };

        Self {
            total,
            successful,
            failed: total - successful,
            success_rate: average(successful as f64),
            avg_query_time_seconds: average(total_time_seconds),
            avg_sources_per_query: if successful > 0 {
                average(total_sources as f64)
            } else {
                0.0
            },
            total_time_seconds,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordSet {
    qa_pairs: Vec<QaRecord>,
    metadata: RecordSetMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordSetMetadata {
    total_pairs: usize,
    timestamp: DateTime<Utc>,
}

/// Runs every question through the pipeline in order. A failed question is
/// recorded with its error and the batch continues.
pub async fn answer_batch(
    pipeline: &mut RagPipeline,
    questions: &[GeneratedQuestion],
    top_k: Option<usize>,
) -> Vec<QaRecord> {
    let total = questions.len();
    let mut records = Vec::with_capacity(total);

    for (index, item) in questions.iter().enumerate() {
        let question = item.question.trim();
        if question.is_empty() {
            tracing::warn!(index = index + 1, total, "Skipping empty question");
            continue;
        }

        let started = Instant::now();
        let outcome = pipeline.query(question, top_k).await;
        let query_time_seconds = started.elapsed().as_secs_f64();

        let record = match outcome {
            Ok(response) => {
                let pages: BTreeSet<u32> = response.sources.iter().filter_map(|s| s.page).collect();
                QaRecord {
                    question: question.to_string(),
                    answer: response.answer,
                    num_sources: response.sources.len(),
                    sources: response.sources.iter().map(RecordedSource::from).collect(),
                    pages: pages.into_iter().collect(),
                    retrieval_time_ms: response.retrieval_time_ms,
                    generation_time_ms: response.generation_time_ms,
                    total_time_ms: response.total_time_ms,
                    tokens_used: response.tokens_used,
                    query_time_seconds,
                    error: None,
                    timestamp: Utc::now(),
                    question_metadata: Some(item.clone()),
                }
            }
            Err(e) => {
                tracing::warn!(
                    index = index + 1,
                    question = %sanitize_prompt(question),
                    error = %e,
                    "Question failed"
                );
                QaRecord {
                    question: question.to_string(),
                    answer: String::new(),
                    sources: Vec::new(),
                    num_sources: 0,
                    pages: Vec::new(),
                    retrieval_time_ms: 0.0,
                    generation_time_ms: 0.0,
                    total_time_ms: 0.0,
                    tokens_used: None,
                    query_time_seconds,
                    error: Some(e.to_string()),
                    timestamp: Utc::now(),
                    question_metadata: Some(item.clone()),
                }
            }
        };

        tracing::info!(
            index = index + 1,
            total,
            ok = record.is_success(),
            sources = record.num_sources,
            "Question answered"
        );
        records.push(record);
    }

    records
}

/// Writes `{qa_pairs, metadata: {total_pairs, timestamp}}`.
pub fn save_records(records: &[QaRecord], path: &Path) -> Result<(), ArtifactError> {
    let set = RecordSet {
        qa_pairs: records.to_vec(),
        metadata: RecordSetMetadata {
            total_pairs: records.len(),
            timestamp: Utc::now(),
        },
    };
    write_json(path, &set)
}

pub fn load_records(path: &Path) -> Result<Vec<QaRecord>, ArtifactError> {
    Ok(read_json::<RecordSet>(path)?.qa_pairs)
}
