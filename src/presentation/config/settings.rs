use std::path::PathBuf;
use std::time::Duration;

use config::{Config, File};
use serde::Deserialize;

use super::Environment;
use crate::application::services::PipelineConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("{0}")]
    InvalidEnvironment(String),
    #[error("configuration validation failed:\n{}", format_problems(.0))]
    Invalid(Vec<String>),
}

fn format_problems(problems: &[String]) -> String {
    problems
        .iter()
        .map(|p| format!("  - {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Local,
    #[serde(rename = "openai")]
    OpenAi,
}

impl EmbeddingProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingProvider::Local => "local",
            EmbeddingProvider::OpenAi => "openai",
        }
    }
}

/// Flat runtime settings. Keys match the upper-cased environment variables
/// (`CHUNK_SIZE` → `chunk_size`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub pdf_path: PathBuf,
    pub embedding_provider: EmbeddingProvider,
    pub embedding_model: String,
    pub use_gpu: bool,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub persist_dir: PathBuf,
    pub collection_name: String,
    pub top_k: usize,
    pub similarity_threshold: f32,
    pub max_context_tokens: usize,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: usize,
    pub batch_size: usize,
    /// Request timeout in seconds for remote APIs and PDF parsing.
    pub timeout: u64,
}

impl Settings {
    /// Loads `.env`, then `appsettings.{environment}` if present, then the
    /// process environment, on top of built-in defaults.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let configuration = Config::builder()
            .set_default("openai_base_url", "https://api.openai.com/v1")?
            .set_default("pdf_path", "document.pdf")?
            .set_default("embedding_provider", "local")?
            .set_default("embedding_model", "sentence-transformers/all-MiniLM-L6-v2")?
            .set_default("use_gpu", false)?
            .set_default("chunk_size", 800_i64)?
            .set_default("chunk_overlap", 150_i64)?
            .set_default("persist_dir", "vector_db")?
            .set_default("collection_name", "documents")?
            .set_default("top_k", 7_i64)?
            .set_default("similarity_threshold", 0.65_f64)?
            .set_default("max_context_tokens", 6000_i64)?
            .set_default("llm_model", "gpt-4o-mini")?
            .set_default("llm_temperature", 0.2_f64)?
            .set_default("llm_max_tokens", 800_i64)?
            .set_default("batch_size", 32_i64)?
            .set_default("timeout", 30_i64)?
            .add_source(File::with_name(&environment.settings_file()).required(false))
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        let settings: Settings = configuration.try_deserialize()?;

        tracing::debug!(environment = %environment, "Configuration loaded");
        Ok(settings)
    }

    pub fn load_from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env().map_err(ConfigError::InvalidEnvironment)?;
        Self::load(environment)
    }

    pub fn with_top_k(mut self, top_k: Option<usize>) -> Self {
        if let Some(k) = top_k {
            self.top_k = k;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn has_api_key(&self) -> bool {
        self.openai_api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    /// Reports every problem at once. `require_pdf` is set for operations
    /// that may need to index the document.
    pub fn validate(&self, require_pdf: bool) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if !self.has_api_key() {
            problems.push("OPENAI_API_KEY is not set. Please add it to your .env file.".to_string());
        }
        if require_pdf && !self.pdf_path.exists() {
            problems.push(format!("PDF file not found at: {}", self.pdf_path.display()));
        }
        if self.chunk_size == 0 {
            problems.push("CHUNK_SIZE must be positive".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            problems.push("CHUNK_OVERLAP must be less than CHUNK_SIZE".to_string());
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            problems.push("SIMILARITY_THRESHOLD must be between 0 and 1".to_string());
        }
        if self.top_k == 0 {
            problems.push("TOP_K must be positive".to_string());
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            problems.push("LLM_TEMPERATURE must be between 0 and 2".to_string());
        }
        if self.batch_size == 0 {
            problems.push("BATCH_SIZE must be positive".to_string());
        }
        if self.llm_max_tokens == 0 {
            problems.push("LLM_MAX_TOKENS must be positive".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// Effective configuration as label/value rows, with the API key masked.
    pub fn display_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Embedding Provider", self.embedding_provider.as_str().to_string()),
            ("Embedding Model", self.embedding_model.clone()),
            ("Embedding Device", if self.use_gpu { "gpu" } else { "cpu" }.to_string()),
            ("Chunk Size", self.chunk_size.to_string()),
            ("Chunk Overlap", self.chunk_overlap.to_string()),
            ("Vector DB", self.persist_dir.display().to_string()),
            ("Collection", self.collection_name.clone()),
            ("Top-K Retrieval", self.top_k.to_string()),
            ("Similarity Threshold", self.similarity_threshold.to_string()),
            ("Max Context Tokens", self.max_context_tokens.to_string()),
            ("LLM Model", self.llm_model.clone()),
            ("LLM Temperature", self.llm_temperature.to_string()),
            ("Max Tokens", self.llm_max_tokens.to_string()),
            ("Batch Size", self.batch_size.to_string()),
            ("Timeout", format!("{}s", self.timeout)),
            ("PDF Path", self.pdf_path.display().to_string()),
            ("API Base URL", self.openai_base_url.clone()),
            ("API Key", self.masked_api_key()),
        ]
    }

    fn masked_api_key(&self) -> String {
        match self.openai_api_key.as_deref().map(str::trim) {
            Some(key) if key.chars().count() > 10 => {
                let head: String = key.chars().take(3).collect();
                let tail: String = key.chars().skip(key.chars().count() - 4).collect();
                format!("{head}...{tail}")
            }
            Some(key) if !key.is_empty() => "****".to_string(),
            _ => "not set".to_string(),
        }
    }
}

impl From<&Settings> for PipelineConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            pdf_path: settings.pdf_path.clone(),
            collection_name: settings.collection_name.clone(),
            embedding_model: settings.embedding_model.clone(),
            llm_model: settings.llm_model.clone(),
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            top_k: settings.top_k,
            similarity_threshold: settings.similarity_threshold,
            max_context_tokens: settings.max_context_tokens,
            batch_size: settings.batch_size,
        }
    }
}
