use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ArtifactError, QaRecord};
use crate::application::ports::{CompletionRequest, LlmClient, LlmClientError};
use crate::application::services::PipelineConfig;

static CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[Page \d+\]").expect("citation pattern is valid"));

const LOW_SOURCE_AVERAGE: f64 = 3.0;
const TOP_K_STEP: usize = 3;
const TOP_K_CEILING: usize = 15;
const NO_SOURCE_RATIO: f64 = 0.10;
const THRESHOLD_STEP: f32 = 0.05;
const THRESHOLD_FLOOR: f32 = 0.5;
const SUGGESTION_TEMPERATURE: f32 = 0.3;

const ADVISOR_SYSTEM_PROMPT: &str = "You are an expert in RAG systems and information retrieval. \
Provide specific, actionable recommendations for improving QA system performance.";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalAnalysis {
    pub avg_sources: f64,
    pub queries_with_no_sources: usize,
    pub no_sources_percentage: f64,
    pub avg_unique_pages: f64,
    /// Unique pages per retrieved source; 1.0 means no two sources share a page.
    pub diversity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnswerAnalysis {
    pub avg_words: f64,
    pub citation_rate: f64,
    pub avg_citations: f64,
    pub min_words: usize,
    pub max_words: usize,
    pub median_words: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    High,
    Medium,
}

impl Priority {
    fn label(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSuggestion {
    pub parameter: &'static str,
    pub current_value: String,
    pub suggested_value: String,
    pub rationale: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriorityAction {
    pub rank: u8,
    pub action: String,
    pub rationale: String,
    pub impact: Priority,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CriticalIssue {
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub solution: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Improvement {
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub expected_benefit: String,
}

/// Values stay raw JSON: models return numbers and strings interchangeably.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParameterRecommendation {
    #[serde(default)]
    pub parameter: String,
    #[serde(default)]
    pub current_value: Value,
    #[serde(default)]
    pub suggested_value: Value,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PromptSuggestion {
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub suggestion: String,
}

/// Model-written advice on top of the rule-based analysis.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LlmSuggestions {
    #[serde(default)]
    pub critical_issues: Vec<CriticalIssue>,
    #[serde(default)]
    pub retrieval_improvements: Vec<Improvement>,
    #[serde(default, alias = "answer_generation_improvements")]
    pub generation_improvements: Vec<Improvement>,
    #[serde(default)]
    pub parameter_recommendations: Vec<ParameterRecommendation>,
    #[serde(default, alias = "prompt_engineering")]
    pub prompt_suggestions: Vec<PromptSuggestion>,
}

impl LlmSuggestions {
    pub fn is_empty(&self) -> bool {
        self.critical_issues.is_empty()
            && self.retrieval_improvements.is_empty()
            && self.generation_improvements.is_empty()
            && self.parameter_recommendations.is_empty()
            && self.prompt_suggestions.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SuggestionError {
    #[error("completion: {0}")]
    Completion(#[from] LlmClientError),
    #[error("unparseable suggestions: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TuningReport {
    pub retrieval: RetrievalAnalysis,
    pub answers: AnswerAnalysis,
    pub parameters: Vec<ParameterSuggestion>,
    pub actions: Vec<PriorityAction>,
    /// `None` when no model was asked or the request failed.
    pub llm_suggestions: Option<LlmSuggestions>,
}

/// Rule-based tuning suggestions from a batch of answered questions,
/// optionally extended with a model's advice. Failed records carry no
/// retrieval signal and are left out.
pub struct TuningAdvisor {
    top_k: usize,
    similarity_threshold: f32,
    llm_client: Option<Arc<dyn LlmClient>>,
    current_config: Value,
}

impl TuningAdvisor {
    pub fn new(top_k: usize, similarity_threshold: f32) -> Self {
        Self {
            top_k,
            similarity_threshold,
            llm_client: None,
            current_config: json!({
                "TOP_K": top_k,
                "SIMILARITY_THRESHOLD": similarity_threshold,
            }),
        }
    }

    /// Advisor for a running pipeline; `advise` also asks `llm_client`.
    pub fn with_llm(llm_client: Arc<dyn LlmClient>, config: &PipelineConfig) -> Self {
        Self {
            top_k: config.top_k,
            similarity_threshold: config.similarity_threshold,
            llm_client: Some(llm_client),
            current_config: json!({
                "CHUNK_SIZE": config.chunk_size,
                "CHUNK_OVERLAP": config.chunk_overlap,
                "TOP_K": config.top_k,
                "SIMILARITY_THRESHOLD": config.similarity_threshold,
                "MAX_CONTEXT_TOKENS": config.max_context_tokens,
                "EMBEDDING_MODEL": config.embedding_model,
                "LLM_MODEL": config.llm_model,
            }),
        }
    }

    /// Rule-based analysis plus model suggestions when a client is set.
    /// A failed suggestion request is logged and the report goes without it.
    pub async fn advise(&self, records: &[QaRecord]) -> TuningReport {
        let mut report = self.analyze(records);
        let Some(llm_client) = &self.llm_client else {
            return report;
        };

        match self.llm_suggestions(llm_client.as_ref(), &report).await {
            Ok(suggestions) => {
                tracing::info!(
                    critical_issues = suggestions.critical_issues.len(),
                    parameters = suggestions.parameter_recommendations.len(),
                    "LLM suggestions received"
                );
                report.llm_suggestions = Some(suggestions);
            }
            Err(e) => tracing::warn!(error = %e, "LLM suggestion generation failed"),
        }
        report
    }

    #[tracing::instrument(skip_all, fields(model = llm_client.model()))]
    async fn llm_suggestions(
        &self,
        llm_client: &dyn LlmClient,
        report: &TuningReport,
    ) -> Result<LlmSuggestions, SuggestionError> {
        let request = CompletionRequest::new(
            ADVISOR_SYSTEM_PROMPT,
            suggestion_prompt(&report.retrieval, &report.answers, &self.current_config)?,
        )
        .with_temperature(SUGGESTION_TEMPERATURE)
        .json();

        let completion = llm_client.complete(&request).await?;
        Ok(serde_json::from_str(&completion.text)?)
    }

    pub fn analyze(&self, records: &[QaRecord]) -> TuningReport {
        let answered: Vec<&QaRecord> = records.iter().filter(|r| r.is_success()).collect();
        let retrieval = analyze_retrieval(&answered);
        let answers = analyze_answers(&answered);
        let parameters = self.suggest_parameters(&retrieval, answered.len());
        let actions = prioritize(&retrieval, &parameters);

        TuningReport {
            retrieval,
            answers,
            parameters,
            actions,
            llm_suggestions: None,
        }
    }

    fn suggest_parameters(
        &self,
        retrieval: &RetrievalAnalysis,
        answered: usize,
    ) -> Vec<ParameterSuggestion> {
        let mut suggestions = Vec::new();
        if answered == 0 {
            return suggestions;
        }

        if retrieval.avg_sources < LOW_SOURCE_AVERAGE {
            suggestions.push(ParameterSuggestion {
                parameter: "TOP_K",
                current_value: self.top_k.to_string(),
                suggested_value: (self.top_k + TOP_K_STEP).min(TOP_K_CEILING).to_string(),
                rationale: "Low average source count suggests retrieving more passages".to_string(),
                priority: Priority::High,
            });
        }

        if retrieval.queries_with_no_sources as f64 > answered as f64 * NO_SOURCE_RATIO {
            suggestions.push(ParameterSuggestion {
                parameter: "SIMILARITY_THRESHOLD",
                current_value: format!("{:.2}", self.similarity_threshold),
                suggested_value: format!(
                    "{:.2}",
                    (self.similarity_threshold - THRESHOLD_STEP).max(THRESHOLD_FLOOR)
                ),
                rationale: "Many queries return no sources, suggesting the threshold is too high"
                    .to_string(),
                priority: Priority::High,
            });
        }

        suggestions
    }
}

fn suggestion_prompt(
    retrieval: &RetrievalAnalysis,
    answers: &AnswerAnalysis,
    current_config: &Value,
) -> Result<String, serde_json::Error> {
    Ok(format!(
        "Analyze the following QA system performance data and provide specific, actionable improvement suggestions.

**Retrieval Analysis:**
{retrieval}

**Answer Pattern Analysis:**
{answers}

**Current Configuration:**
{config}

Based on this data, provide:

1. **Top 3 Critical Issues**: Most important problems to address
2. **Retrieval Improvements**: How to improve document retrieval
3. **Answer Generation Improvements**: How to improve answer quality
4. **Parameter Recommendations**: Specific parameter changes to try
5. **Prompt Engineering Suggestions**: How to improve system prompts

Return as JSON:
{{
    \"critical_issues\": [
        {{\"issue\": \"description\", \"impact\": \"high/medium/low\", \"solution\": \"suggested fix\"}}
    ],
    \"retrieval_improvements\": [
        {{\"recommendation\": \"description\", \"expected_benefit\": \"description\"}}
    ],
    \"generation_improvements\": [
        {{\"recommendation\": \"description\", \"expected_benefit\": \"description\"}}
    ],
    \"parameter_recommendations\": [
        {{\"parameter\": \"name\", \"current_value\": \"value\", \"suggested_value\": \"value\", \"rationale\": \"why\"}}
    ],
    \"prompt_suggestions\": [
        {{\"area\": \"system/user prompt\", \"suggestion\": \"description\"}}
    ]
}}",
        retrieval = serde_json::to_string_pretty(retrieval)?,
        answers = serde_json::to_string_pretty(answers)?,
        config = serde_json::to_string_pretty(current_config)?,
    ))
}

fn analyze_retrieval(records: &[&QaRecord]) -> RetrievalAnalysis {
    if records.is_empty() {
        return RetrievalAnalysis::default();
    }
    let total = records.len() as f64;

    let avg_sources = records.iter().map(|r| r.num_sources).sum::<usize>() as f64 / total;
    let queries_with_no_sources = records.iter().filter(|r| r.num_sources == 0).count();

    let unique_pages: Vec<usize> = records
        .iter()
        .filter(|r| !r.sources.is_empty())
        .map(|r| {
            r.sources
                .iter()
                .map(|s| s.page.unwrap_or(0))
                .collect::<BTreeSet<_>>()
                .len()
        })
        .collect();
    let avg_unique_pages = if unique_pages.is_empty() {
        0.0
    } else {
        unique_pages.iter().sum::<usize>() as f64 / unique_pages.len() as f64
    };

    RetrievalAnalysis {
        avg_sources,
        queries_with_no_sources,
        no_sources_percentage: queries_with_no_sources as f64 / total * 100.0,
        avg_unique_pages,
        diversity: if avg_sources > 0.0 {
            avg_unique_pages / avg_sources
        } else {
            0.0
        },
    }
}

fn analyze_answers(records: &[&QaRecord]) -> AnswerAnalysis {
    if records.is_empty() {
        return AnswerAnalysis::default();
    }
    let total = records.len() as f64;

    let mut lengths: Vec<usize> = records
        .iter()
        .map(|r| r.answer.split_whitespace().count())
        .collect();
    let citations: Vec<usize> = records
        .iter()
        .map(|r| CITATION.find_iter(&r.answer).count())
        .collect();
    lengths.sort_unstable();

    AnswerAnalysis {
        avg_words: lengths.iter().sum::<usize>() as f64 / total,
        citation_rate: citations.iter().filter(|c| **c > 0).count() as f64 / total,
        avg_citations: citations.iter().sum::<usize>() as f64 / total,
        min_words: lengths.first().copied().unwrap_or(0),
        max_words: lengths.last().copied().unwrap_or(0),
        median_words: lengths[lengths.len() / 2],
    }
}

fn prioritize(
    retrieval: &RetrievalAnalysis,
    parameters: &[ParameterSuggestion],
) -> Vec<PriorityAction> {
    let mut actions = Vec::new();

    if retrieval.no_sources_percentage > NO_SOURCE_RATIO * 100.0 {
        actions.push(PriorityAction {
            rank: 1,
            action: "Reduce SIMILARITY_THRESHOLD".to_string(),
            rationale: format!(
                "{:.1}% of queries return no sources",
                retrieval.no_sources_percentage
            ),
            impact: Priority::High,
        });
    }

    actions.extend(
        parameters
            .iter()
            .filter(|p| p.priority == Priority::High)
            .take(2)
            .map(|p| PriorityAction {
                rank: 2,
                action: format!(
                    "Tune {}: {} → {}",
                    p.parameter, p.current_value, p.suggested_value
                ),
                rationale: p.rationale.clone(),
                impact: Priority::Medium,
            }),
    );

    actions.sort_by_key(|a| a.rank);
    actions
}

impl TuningReport {
    pub fn render(&self) -> String {
        let rule = "=".repeat(80);
        let mut out = String::new();

        let _ = writeln!(out, "{rule}\nIMPROVEMENT SUGGESTIONS REPORT\n{rule}");

        let _ = writeln!(out, "\n## RETRIEVAL\n");
        let r = &self.retrieval;
        let _ = writeln!(out, "Average sources per query: {:.2}", r.avg_sources);
        let _ = writeln!(
            out,
            "Queries with no sources: {} ({:.1}%)",
            r.queries_with_no_sources, r.no_sources_percentage
        );
        let _ = writeln!(out, "Average unique pages: {:.2}", r.avg_unique_pages);
        let _ = writeln!(out, "Retrieval diversity: {:.2}", r.diversity);

        let _ = writeln!(out, "\n## ANSWERS\n");
        let a = &self.answers;
        let _ = writeln!(
            out,
            "Average length: {:.1} words (min {}, median {}, max {})",
            a.avg_words, a.min_words, a.median_words, a.max_words
        );
        let _ = writeln!(out, "Citation rate: {:.1}%", a.citation_rate * 100.0);
        let _ = writeln!(out, "Average citations per answer: {:.2}", a.avg_citations);

        let _ = writeln!(out, "\n## PRIORITY ACTIONS\n");
        if self.actions.is_empty() {
            let _ = writeln!(out, "None.");
        }
        for (i, action) in self.actions.iter().take(5).enumerate() {
            let _ = writeln!(out, "{}. [{}] {}", i + 1, action.impact.label(), action.action);
            let _ = writeln!(out, "   Rationale: {}\n", action.rationale);
        }

        let _ = writeln!(out, "\n## PARAMETER TUNING RECOMMENDATIONS\n");
        if self.parameters.is_empty() {
            let _ = writeln!(out, "None.");
        }
        for p in &self.parameters {
            let _ = writeln!(
                out,
                "- {}: {} → {}",
                p.parameter, p.current_value, p.suggested_value
            );
            let _ = writeln!(out, "  Rationale: {}\n", p.rationale);
        }

        if let Some(llm) = self.llm_suggestions.as_ref().filter(|l| !l.is_empty()) {
            render_llm_suggestions(&mut out, llm);
        }

        out.push_str(&rule);
        out
    }

    /// Writes the rendered report as text, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

/// `results/qa.json` → `results/qa_improvements.txt`.
pub fn report_path(results: &Path) -> PathBuf {
    let stem = results
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "qa_results".to_string());
    results.with_file_name(format!("{stem}_improvements.txt"))
}

fn render_llm_suggestions(out: &mut String, llm: &LlmSuggestions) {
    if !llm.critical_issues.is_empty() {
        let _ = writeln!(out, "\n## CRITICAL ISSUES\n");
        for issue in &llm.critical_issues {
            let impact = if issue.impact.is_empty() { "unknown" } else { issue.impact.as_str() };
            let _ = writeln!(out, "- [{}] {}", impact.to_uppercase(), or_na(&issue.issue));
            let _ = writeln!(out, "  Solution: {}\n", or_na(&issue.solution));
        }
    }

    for (title, improvements) in [
        ("RETRIEVAL IMPROVEMENTS", &llm.retrieval_improvements),
        ("ANSWER GENERATION IMPROVEMENTS", &llm.generation_improvements),
    ] {
        if improvements.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n## {title}\n");
        for improvement in improvements {
            let _ = writeln!(out, "- {}", or_na(&improvement.recommendation));
            let _ = writeln!(out, "  Expected Benefit: {}\n", or_na(&improvement.expected_benefit));
        }
    }

    if !llm.parameter_recommendations.is_empty() {
        let _ = writeln!(out, "\n## LLM PARAMETER RECOMMENDATIONS\n");
        for p in &llm.parameter_recommendations {
            let _ = writeln!(
                out,
                "- {}: {} → {}",
                or_na(&p.parameter),
                plain(&p.current_value),
                plain(&p.suggested_value)
            );
            let _ = writeln!(out, "  Rationale: {}\n", or_na(&p.rationale));
        }
    }

    if !llm.prompt_suggestions.is_empty() {
        let _ = writeln!(out, "\n## PROMPT SUGGESTIONS\n");
        for p in &llm.prompt_suggestions {
            let _ = writeln!(out, "- [{}] {}", or_na(&p.area), or_na(&p.suggestion));
        }
        out.push('\n');
    }
}

fn or_na(text: &str) -> &str {
    if text.trim().is_empty() { "N/A" } else { text }
}

fn plain(value: &Value) -> String {
    match value {
        Value::Null => "unknown".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
