mod batch_answerer;
mod question_generator;
mod tuning_advisor;

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use batch_answerer::{
    QaRecord, QaStatistics, RecordedSource, answer_batch, load_records, save_records,
};
pub use question_generator::{
    CoverageReport, GeneratedQuestion, PageCoverage, QuestionGenerationError, QuestionGenerator,
    load_questions,
};
pub use tuning_advisor::{
    AnswerAnalysis, CriticalIssue, Improvement, LlmSuggestions, ParameterRecommendation,
    ParameterSuggestion, Priority, PriorityAction, PromptSuggestion, RetrievalAnalysis,
    SuggestionError, TuningAdvisor, TuningReport, report_path,
};

/// Failure reading or writing an artifact (question sets, Q&A records, reports).
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact io: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact json: {0}")]
    Json(#[from] serde_json::Error),
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
