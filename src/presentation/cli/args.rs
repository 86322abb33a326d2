use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    version,
    about = "Ask questions about a PDF document using retrieval-augmented generation",
    after_help = "Examples:
  docqa                                   interactive mode
  docqa --query \"What are the benefits?\"  answer one question
  docqa --rebuild-index                   rebuild the vector index
  docqa --stats                           show pipeline statistics
  docqa --diagnose \"Why is X slow?\"       check retrieval health"
)]
pub struct Cli {
    /// Answer one question and exit
    #[arg(long, short = 'q')]
    pub query: Option<String>,

    /// Delete and rebuild the vector index, then exit
    #[arg(long, default_value_t = false)]
    pub rebuild_index: bool,

    /// Show pipeline statistics and exit
    #[arg(long, default_value_t = false)]
    pub stats: bool,

    /// Print the effective configuration and exit
    #[arg(long, default_value_t = false)]
    pub config: bool,

    /// Passages to retrieve for this run (overrides TOP_K)
    #[arg(long, value_parser = parse_positive)]
    pub top_k: Option<usize>,

    /// Show chunk ids, previews, timings and debug logs
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// Run retrieval diagnostics, optionally with a sample question
    #[arg(long, value_name = "QUESTION", num_args = 0..=1)]
    pub diagnose: Option<Option<String>>,

    /// Generate study questions from the document into a JSON file
    #[arg(long, value_name = "OUT")]
    pub generate_questions: Option<PathBuf>,

    /// Questions to generate per page
    #[arg(long, default_value_t = 3, value_parser = parse_positive)]
    pub questions_per_page: usize,

    /// Limit question generation to the first N pages
    #[arg(long, value_parser = parse_positive)]
    pub max_pages: Option<usize>,

    /// Answer every question in a JSON file and suggest tuning changes
    #[arg(long, value_name = "QUESTIONS_JSON")]
    pub evaluate: Option<PathBuf>,

    /// Where --evaluate writes its Q&A records
    #[arg(long, value_name = "OUT", default_value = "qa_results.json")]
    pub results: PathBuf,
}

/// What a single invocation does. Flags are checked in the order below; the
/// first one present wins.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    ShowConfig,
    RebuildIndex,
    Stats,
    Diagnose(Option<String>),
    GenerateQuestions {
        output: PathBuf,
        questions_per_page: usize,
        max_pages: Option<usize>,
    },
    Evaluate {
        questions: PathBuf,
        results: PathBuf,
    },
    Query(String),
    Interactive,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.config {
            Mode::ShowConfig
        } else if self.rebuild_index {
            Mode::RebuildIndex
        } else if self.stats {
            Mode::Stats
        } else if let Some(question) = &self.diagnose {
            Mode::Diagnose(question.clone())
        } else if let Some(output) = &self.generate_questions {
            Mode::GenerateQuestions {
                output: output.clone(),
                questions_per_page: self.questions_per_page,
                max_pages: self.max_pages,
            }
        } else if let Some(questions) = &self.evaluate {
            Mode::Evaluate {
                questions: questions.clone(),
                results: self.results.clone(),
            }
        } else if let Some(question) = &self.query {
            Mode::Query(question.clone())
        } else {
            Mode::Interactive
        }
    }
}

fn parse_positive(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(value) => Ok(value),
        Err(e) => Err(e.to_string()),
    }
}
