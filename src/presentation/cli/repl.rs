use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use super::render;
use crate::application::services::RagPipeline;

const PROMPT: &str = "Question> ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Stats,
    Help,
    Ask(String),
}

impl ReplCommand {
    /// `None` for blank input.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        Some(match line.to_ascii_lowercase().as_str() {
            "quit" | "exit" | "q" => ReplCommand::Quit,
            "stats" => ReplCommand::Stats,
            "help" => ReplCommand::Help,
            _ => ReplCommand::Ask(line.to_string()),
        })
    }
}

/// Reads questions until `quit`, Ctrl-C or Ctrl-D. A failed question is
/// reported and the loop keeps going.
pub async fn run(
    pipeline: &mut RagPipeline,
    top_k: Option<usize>,
    verbose: bool,
) -> Result<(), ReadlineError> {
    let mut editor = DefaultEditor::new()?;
    render::help();

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e),
        };

        let Some(command) = ReplCommand::parse(&line) else {
            continue;
        };
        let _ = editor.add_history_entry(line.trim());

        match command {
            ReplCommand::Quit => break,
            ReplCommand::Help => render::help(),
            ReplCommand::Stats => match pipeline.stats().await {
                Ok(stats) => render::stats(&stats),
                Err(e) => render::failure(&e, verbose),
            },
            ReplCommand::Ask(question) => match pipeline.query(&question, top_k).await {
                Ok(response) => render::response(&response, verbose),
                Err(e) => render::failure(&e, verbose),
            },
        }
    }

    println!("\nGoodbye!");
    Ok(())
}
