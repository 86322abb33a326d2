use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ArtifactError, read_json, write_json};
use crate::application::ports::{CompletionRequest, LlmClient, LlmClientError};
use crate::domain::Page;

const MIN_PAGE_CHARS: usize = 100;
const PREVIEW_CHARS: usize = 200;
const GENERATION_TEMPERATURE: f32 = 0.7;

const GENERATOR_SYSTEM_PROMPT: &str = "You are an expert at generating educational questions from technical documents. \
Generate diverse, high-quality questions that test understanding at multiple levels.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    #[serde(alias = "text")]
    pub question: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub expected_answer: String,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub source_text_preview: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageCoverage {
    pub covered: bool,
    pub num_questions: usize,
    pub concepts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    pub pages_processed: usize,
    pub pages_covered: usize,
    pub coverage_percentage: f64,
    pub unique_concepts: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct QuestionSet {
    questions: Vec<GeneratedQuestion>,
    metadata: QuestionSetMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
struct QuestionSetMetadata {
    total_questions: usize,
    #[serde(default)]
    coverage: BTreeMap<u32, PageCoverage>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuestionFile {
    Set { questions: Vec<GeneratedQuestion> },
    Bare(Vec<GeneratedQuestion>),
}

#[derive(Debug, thiserror::Error)]
pub enum QuestionGenerationError {
    #[error("completion: {0}")]
    Completion(#[from] LlmClientError),
    #[error("unparseable question payload: {0}")]
    Parse(String),
}

/// Asks the model for study questions page by page and tracks which pages
/// and concepts the generated set covers.
pub struct QuestionGenerator<L: LlmClient + ?Sized> {
    llm_client: Arc<L>,
    coverage: BTreeMap<u32, PageCoverage>,
}

impl<L: LlmClient + ?Sized> QuestionGenerator<L> {
    pub fn new(llm_client: Arc<L>) -> Self {
        Self {
            llm_client,
            coverage: BTreeMap::new(),
        }
    }

    #[tracing::instrument(skip(self, page), fields(page = page.number))]
    pub async fn generate_for_page(
        &self,
        page: &Page,
        num_questions: usize,
    ) -> Result<Vec<GeneratedQuestion>, QuestionGenerationError> {
        let request = CompletionRequest::new(
            GENERATOR_SYSTEM_PROMPT,
            generation_prompt(&page.text, num_questions),
        )
        .with_temperature(GENERATION_TEMPERATURE)
        .json();

        let completion = self.llm_client.complete(&request).await?;
        let mut questions = parse_questions(&completion.text)?;

        let preview = format!(
            "{}...",
            page.text.chars().take(PREVIEW_CHARS).collect::<String>()
        );
        for question in &mut questions {
            question.page = Some(page.number);
            question.source_text_preview = preview.clone();
        }

        Ok(questions)
    }

    /// Generates `questions_per_page` questions for each page long enough to
    /// be worth asking about, up to `max_pages`. Pages whose generation fails
    /// are logged and skipped.
    pub async fn generate(
        &mut self,
        pages: &[Page],
        questions_per_page: usize,
        max_pages: Option<usize>,
    ) -> Vec<GeneratedQuestion> {
        let limit = max_pages.unwrap_or(pages.len()).min(pages.len());
        let mut all_questions = Vec::new();

        for page in &pages[..limit] {
            if page.text.trim().chars().count() < MIN_PAGE_CHARS {
                tracing::debug!(page = page.number, "Skipping short page");
                continue;
            }

            let questions = match self.generate_for_page(page, questions_per_page).await {
                Ok(questions) => questions,
                Err(e) => {
                    tracing::warn!(page = page.number, error = %e, "Question generation failed");
                    Vec::new()
                }
            };

            let concepts: BTreeSet<String> = questions
                .iter()
                .flat_map(|q| q.concepts.iter().cloned())
                .collect();
            self.coverage.insert(
                page.number,
                PageCoverage {
                    covered: true,
                    num_questions: questions.len(),
                    concepts: concepts.into_iter().collect(),
                },
            );

            tracing::info!(page = page.number, generated = questions.len(), "Page processed");
            all_questions.extend(questions);
        }

        tracing::info!(
            questions = all_questions.len(),
            pages = limit,
            "Question generation complete"
        );
        all_questions
    }

    pub fn coverage(&self) -> &BTreeMap<u32, PageCoverage> {
        &self.coverage
    }

    pub fn coverage_report(&self) -> CoverageReport {
        let pages_processed = self.coverage.len();
        let pages_covered = self.coverage.values().filter(|p| p.covered).count();
        let unique_concepts = self
            .coverage
            .values()
            .flat_map(|p| p.concepts.iter())
            .collect::<BTreeSet<_>>()
            .len();

        CoverageReport {
            pages_processed,
            pages_covered,
            coverage_percentage: if pages_processed > 0 {
                pages_covered as f64 / pages_processed as f64 * 100.0
            } else {
                0.0
            },
            unique_concepts,
        }
    }

    /// Writes `{questions, metadata: {total_questions, coverage}}`.
    pub fn save(&self, questions: &[GeneratedQuestion], path: &Path) -> Result<(), ArtifactError> {
        let set = QuestionSet {
            questions: questions.to_vec(),
            metadata: QuestionSetMetadata {
                total_questions: questions.len(),
                coverage: self.coverage.clone(),
            },
        };
        write_json(path, &set)
    }
}

/// Loads a saved question set; a bare JSON array of questions is accepted too.
pub fn load_questions(path: &Path) -> Result<Vec<GeneratedQuestion>, ArtifactError> {
    Ok(match read_json::<QuestionFile>(path)? {
        QuestionFile::Set { questions } => questions,
        QuestionFile::Bare(questions) => questions,
    })
}

/// Accepts `{"questions": [...]}`, `{"data": [...]}`, a single question
/// object, or a bare array; models in JSON mode vary in which they return.
fn parse_questions(raw: &str) -> Result<Vec<GeneratedQuestion>, QuestionGenerationError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| QuestionGenerationError::Parse(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("questions").or_else(|| map.remove("data")) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(QuestionGenerationError::Parse(format!(
                    "expected an array of questions, got {other}"
                )));
            }
            None if map.contains_key("question") => vec![Value::Object(map)],
            None => Vec::new(),
        },
        other => {
            return Err(QuestionGenerationError::Parse(format!(
                "unexpected payload: {other}"
            )));
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<GeneratedQuestion>(item).ok())
        .filter(|q| !q.question.trim().is_empty())
        .collect())
}

fn generation_prompt(text: &str, num_questions: usize) -> String {
    format!(
        "Generate {num_questions} diverse questions from the following text.

Create a mix of question types:
- Factual: Questions about specific facts, definitions, or details
- Conceptual: Questions about concepts, relationships, or principles
- Analytical: Questions requiring analysis, comparison, or evaluation

Text:
{text}

For each question, provide:
1. The question itself
2. The type (factual, conceptual, analytical)
3. The expected answer (brief, 2-3 sentences)
4. Key concepts covered

Return a JSON object with format:
{{
    \"questions\": [
        {{
            \"question\": \"...\",
            \"type\": \"...\",
            \"expected_answer\": \"...\",
            \"concepts\": [\"concept1\", \"concept2\"]
        }}
    ]
}}"
    )
}
