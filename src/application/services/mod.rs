mod diagnostics;
mod indexing_service;
mod pipeline;
mod prompt;
mod retrieval_service;
pub mod self_learning;
mod token_counter;

pub use diagnostics::{DEFAULT_DIAGNOSTIC_QUESTION, DiagnosticReport, diagnose};
pub use indexing_service::{IndexReport, IndexingError, IndexingService};
pub use pipeline::{
    IndexOutcome, PipelineComponents, PipelineConfig, PipelineError, PipelineStats, RagPipeline,
};
pub use prompt::{FALLBACK_ANSWER, SYSTEM_PROMPT, render_context, render_user_prompt};
pub use retrieval_service::{
    QueryResponse, RetrievalError, RetrievalOptions, RetrievalService, SourceChunk,
    apply_token_budget,
};
pub use token_counter::count_tokens;
