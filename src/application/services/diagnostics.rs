use super::pipeline::{PipelineError, RagPipeline};
use super::retrieval_service::SourceChunk;
use crate::application::ports::CollectionStats;

pub const DEFAULT_DIAGNOSTIC_QUESTION: &str = "What is this document about?";

const DIAGNOSTIC_TOP_K: usize = 10;
const THRESHOLD_MARGIN: f32 = 0.05;
const MIN_HEALTHY_CHUNKS: usize = 100;
const MAX_SANE_CHUNK_SIZE: usize = 10_000;

/// Findings of a retrieval health check, with no threshold applied to the
/// sample query so the raw score distribution is visible.
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub question: String,
    pub collection: CollectionStats,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub threshold: f32,
    pub top_results: Vec<SourceChunk>,
    pub passing: usize,
    pub best_score: Option<f32>,
    pub suggested_threshold: Option<f32>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl DiagnosticReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Queries the index with `question` and reports why answers might be poor:
/// an empty index, a threshold nothing clears, or suspicious chunking.
pub async fn diagnose(
    pipeline: &RagPipeline,
    question: Option<&str>,
) -> Result<DiagnosticReport, PipelineError> {
    let question = question
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or(DEFAULT_DIAGNOSTIC_QUESTION)
        .to_string();
    let config = pipeline.config();
    let threshold = config.similarity_threshold;
    let collection = pipeline.collection_stats().await?;

    let top_results: Vec<SourceChunk> = if collection.total_chunks == 0 {
        Vec::new()
    } else {
        pipeline
            .retrieve(&question, DIAGNOSTIC_TOP_K, 0.0)
            .await?
            .iter()
            .map(SourceChunk::from_result)
            .collect()
    };

    let passing = top_results.iter().filter(|r| r.score >= threshold).count();
    let best_score = top_results.first().map(|r| r.score);
    let suggested_threshold = match best_score {
        Some(best) if passing == 0 => Some((best - THRESHOLD_MARGIN).clamp(0.0, 1.0)),
        _ => None,
    };

    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if collection.total_chunks == 0 {
        issues.push("Vector store is empty".to_string());
        recommendations.push("Build the index with --rebuild-index".to_string());
    } else if collection.total_chunks < MIN_HEALTHY_CHUNKS {
        issues.push(format!(
            "Very few chunks in index ({})",
            collection.total_chunks
        ));
    }

    let interrupted = collection.total_chunks > 0 && !collection.complete;
    if interrupted {
        issues.push("Last index build did not finish".to_string());
    }

    if config.chunk_size > MAX_SANE_CHUNK_SIZE {
        issues.push(format!("CHUNK_SIZE is too large ({})", config.chunk_size));
        recommendations.push("Set CHUNK_SIZE to around 1200".to_string());
    }

    if let Some(best) = best_score.filter(|b| *b < threshold) {
        issues.push(format!(
            "Best similarity ({best:.3}) is below threshold ({threshold})"
        ));
    }

    if collection.total_chunks > 0 && passing == 0 {
        issues.push("No chunks pass the similarity threshold".to_string());
        if let Some(suggested) = suggested_threshold {
            recommendations.push(format!("Lower SIMILARITY_THRESHOLD to {suggested:.2}"));
        }
    }

    let needs_rebuild = interrupted
        || (collection.total_chunks > 0 && collection.total_chunks < MIN_HEALTHY_CHUNKS)
        || config.chunk_size > MAX_SANE_CHUNK_SIZE;
    if needs_rebuild {
        recommendations.push("Rebuild the index with --rebuild-index".to_string());
    }

    tracing::info!(
        chunks = collection.total_chunks,
        passing,
        best_score = ?best_score,
        issues = issues.len(),
        "Diagnostics complete"
    );

    Ok(DiagnosticReport {
        question,
        collection,
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
        top_k: config.top_k,
        threshold,
        top_results,
        passing,
        best_score,
        suggested_threshold,
        issues,
        recommendations,
    })
}
