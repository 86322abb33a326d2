//! Terminal output for the CLI modes. Everything here writes to stdout;
//! logs go to stderr.

use std::error::Error;

use crate::application::services::self_learning::{CoverageReport, QaStatistics, TuningReport};
use crate::application::services::{DiagnosticReport, IndexOutcome, PipelineStats, QueryResponse};

const WIDTH: usize = 60;

fn rule() -> String {
    "=".repeat(WIDTH)
}

fn heading(title: &str) {
    println!("\n{}\n{title}\n{}", rule(), rule());
}

pub fn banner(document: &str) {
    heading("Document Q&A");
    println!("Document: {document}");
}

pub fn help() {
    println!("\nAsk a question about the document.");
    println!("Commands: 'stats' shows index statistics, 'help' shows this text, 'quit' exits.\n");
}

pub fn response(response: &QueryResponse, verbose: bool) {
    println!("\nAnswer:\n{}\n", response.answer);

    if response.sources.is_empty() {
        println!("Sources: none");
    } else {
        println!("Sources ({}):", response.sources.len());
        for (i, source) in response.sources.iter().enumerate() {
            let page = source
                .page
                .map_or_else(|| "?".to_string(), |p| p.to_string());
            println!("  {}. Page {page} (similarity {:.3})", i + 1, source.score);
            if verbose {
                println!("     chunk {}", source.chunk_id);
                println!("     {}", source.preview.replace('\n', " "));
            }
        }
    }

    if verbose {
        println!(
            "\nTiming: retrieval {:.0} ms, generation {:.0} ms, total {:.0} ms",
            response.retrieval_time_ms, response.generation_time_ms, response.total_time_ms
        );
        if let Some(tokens) = response.tokens_used {
            println!("Tokens used: {tokens}");
        }
    }
    println!();
}

pub fn stats(stats: &PipelineStats) {
    heading("Pipeline Statistics");
    println!("Indexed:            {}", if stats.indexed { "yes" } else { "no" });
    println!("Collection:         {}", stats.vector_store.name);
    println!("Chunks:             {}", stats.vector_store.total_chunks);
    if stats.vector_store.total_chunks > 0 && !stats.vector_store.complete {
        println!("Build:              interrupted, run --rebuild-index");
    }
    if let Some(dimensions) = stats.vector_store.dimensions {
        println!("Dimensions:         {dimensions}");
    }
    println!(
        "Embedder:           {} / {} ({})",
        stats.embedder.provider, stats.embedder.model, stats.embedder.device
    );
    println!("LLM:                {}", stats.config.llm_model);
    println!(
        "Chunking:           {} chars, {} overlap",
        stats.config.chunk_size, stats.config.chunk_overlap
    );
    println!(
        "Retrieval:          top {} at similarity >= {}",
        stats.config.top_k, stats.config.similarity_threshold
    );
    println!("Document:           {}", stats.config.pdf_path.display());
    if let Some(report) = &stats.last_index {
        println!(
            "Last index build:   {} pages, {} chunks in {:.1}s",
            report.pages,
            report.chunks,
            report.elapsed.as_secs_f64()
        );
    }
    println!();
}

pub fn config(rows: &[(&'static str, String)]) {
    heading("Configuration");
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in rows {
        println!("{label:<width$}  {value}");
    }
    println!();
}

pub fn index_outcome(outcome: &IndexOutcome) {
    match outcome {
        IndexOutcome::Loaded { chunks } => {
            println!("✓ Loaded existing index ({chunks} chunks)");
        }
        IndexOutcome::Built(report) => {
            println!(
                "✓ Indexed {}: {} pages, {} chunks, {} dimensions in {:.1}s",
                report.document,
                report.pages,
                report.chunks,
                report.dimensions,
                report.elapsed.as_secs_f64()
            );
        }
    }
}

pub fn diagnostics(report: &DiagnosticReport) {
    heading("Retrieval Diagnostics");
    println!("Collection:   {}", report.collection.name);
    println!("Chunks:       {}", report.collection.total_chunks);
    println!(
        "Chunking:     {} chars, {} overlap",
        report.chunk_size, report.chunk_overlap
    );
    println!("Top-K:        {}", report.top_k);
    println!("Threshold:    {}", report.threshold);
    println!("\nDiagnostic question: {}", report.question);

    if report.top_results.is_empty() {
        println!("No results.");
    } else {
        println!("\nTop results (no threshold):");
        for (i, result) in report.top_results.iter().enumerate() {
            let marker = if result.score >= report.threshold { "✓" } else { "✗" };
            let page = result
                .page
                .map_or_else(|| "?".to_string(), |p| p.to_string());
            let preview: String = result.preview.chars().take(80).collect();
            println!(
                "  {marker} {:>2}. {:.3}  page {page:<4} {}",
                i + 1,
                result.score,
                preview.replace('\n', " ")
            );
        }
        println!(
            "\n{} of {} results pass the threshold",
            report.passing,
            report.top_results.len()
        );
    }

    if report.is_healthy() {
        println!("\n✓ No issues found");
    } else {
        println!("\nIssues:");
        for issue in &report.issues {
            println!("  ✗ {issue}");
        }
    }
    if !report.recommendations.is_empty() {
        println!("\nRecommendations:");
        for recommendation in &report.recommendations {
            println!("  → {recommendation}");
        }
    }
    println!();
}

pub fn coverage(report: &CoverageReport, questions: usize) {
    heading("Question Generation");
    println!("Questions generated: {questions}");
    println!("Pages processed:     {}", report.pages_processed);
    println!(
        "Pages covered:       {} ({:.1}%)",
        report.pages_covered, report.coverage_percentage
    );
    println!("Unique concepts:     {}", report.unique_concepts);
    println!();
}

pub fn qa_statistics(stats: &QaStatistics) {
    heading("Batch Answering");
    println!("Questions:          {}", stats.total);
    println!(
        "Successful:         {} ({:.1}%)",
        stats.successful,
        stats.success_rate * 100.0
    );
    println!("Failed:             {}", stats.failed);
    println!("Avg query time:     {:.2}s", stats.avg_query_time_seconds);
    println!("Avg sources/query:  {:.2}", stats.avg_sources_per_query);
    println!("Total time:         {:.1}s", stats.total_time_seconds);
    println!();
}

pub fn tuning(report: &TuningReport) {
    println!("\n{}\n", report.render());
}

/// Prints `✗ error`; in verbose mode the whole source chain follows.
pub fn failure(error: &(dyn Error + 'static), verbose: bool) {
    println!("✗ Error: {error}");
    if verbose {
        let mut source = error.source();
        while let Some(cause) = source {
            println!("  caused by: {cause}");
            source = cause.source();
        }
    }
}
