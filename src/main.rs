use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use docqa::application::services::self_learning::{
    QaStatistics, QuestionGenerator, TuningAdvisor, answer_batch, load_questions, report_path,
    save_records,
};
use docqa::application::ports::FileLoader;
use docqa::application::services::{PipelineComponents, PipelineConfig, RagPipeline, diagnose};
use docqa::domain::ContentType;
use docqa::infrastructure::llm::{EmbedderFactory, OpenAiChatClient};
use docqa::infrastructure::observability::{TracingConfig, init_tracing};
use docqa::infrastructure::persistence::SqliteVectorStore;
use docqa::infrastructure::text_processing::{
    CompositeFileLoader, FixedSizeSplitter, PdfAdapter, PlainTextAdapter,
};
use docqa::presentation::cli::{Mode, render, repl};
use docqa::presentation::{Cli, Settings};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            println!("✗ Error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if verbose {
                println!("✗ Error: {e:?}");
            } else {
                println!("✗ Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load_from_env()?.with_top_k(cli.top_k);

    init_tracing(&TracingConfig {
        verbose: cli.verbose,
        ..TracingConfig::default()
    });

    let mode = cli.mode();
    if mode == Mode::ShowConfig {
        render::config(&settings.display_rows());
        return Ok(());
    }

    let needs_document = !matches!(mode, Mode::Stats | Mode::Diagnose(_));
    settings.validate(needs_document)?;

    let mut pipeline = build_pipeline(&settings).await?;
    let top_k = cli.top_k;

    match mode {
        Mode::ShowConfig => {}
        Mode::RebuildIndex => {
            let outcome = pipeline.build_index(true).await?;
            render::index_outcome(&outcome);
        }
        Mode::Stats => {
            let stats = pipeline.stats().await?;
            render::stats(&stats);
        }
        Mode::Diagnose(question) => {
            let report = diagnose(&pipeline, question.as_deref()).await?;
            render::diagnostics(&report);
        }
        Mode::GenerateQuestions {
            output,
            questions_per_page,
            max_pages,
        } => {
            let pages = pipeline.extract_pages().await?;
            let llm_client = Arc::new(OpenAiChatClient::from_settings(&settings)?);
            let mut generator = QuestionGenerator::new(llm_client);
            let questions = generator
                .generate(&pages, questions_per_page, max_pages)
                .await;
            generator
                .save(&questions, &output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            render::coverage(&generator.coverage_report(), questions.len());
            println!("✓ Questions saved to {}", output.display());
        }
        Mode::Evaluate { questions, results } => {
            let questions = load_questions(&questions)
                .with_context(|| format!("failed to read {}", questions.display()))?;
            let outcome = pipeline.build_index(false).await?;
            render::index_outcome(&outcome);

            let records = answer_batch(&mut pipeline, &questions, top_k).await;
            save_records(&records, &results)
                .with_context(|| format!("failed to write {}", results.display()))?;
            render::qa_statistics(&QaStatistics::from_records(&records));

            let llm_client = Arc::new(OpenAiChatClient::from_settings(&settings)?);
            let advisor = TuningAdvisor::with_llm(llm_client, pipeline.config());
            let report = advisor.advise(&records).await;
            render::tuning(&report);
            println!("✓ Results saved to {}", results.display());

            let report_file = report_path(&results);
            report
                .save(&report_file)
                .with_context(|| format!("failed to write {}", report_file.display()))?;
            println!("✓ Improvement report saved to {}", report_file.display());
        }
        Mode::Query(question) => {
            let response = pipeline.query(&question, top_k).await?;
            render::response(&response, cli.verbose);
        }
        Mode::Interactive => {
            render::banner(&settings.pdf_path.display().to_string());
            let outcome = pipeline.build_index(false).await?;
            render::index_outcome(&outcome);
            repl::run(&mut pipeline, top_k, cli.verbose).await?;
        }
    }

    Ok(())
}

async fn build_pipeline(settings: &Settings) -> anyhow::Result<RagPipeline> {
    let file_loader = Arc::new(CompositeFileLoader::new(vec![
        (
            ContentType::Pdf,
            Arc::new(PdfAdapter::with_timeout(settings.request_timeout())) as Arc<dyn FileLoader>,
        ),
        (ContentType::Text, Arc::new(PlainTextAdapter) as Arc<dyn FileLoader>),
    ]));
    let text_splitter = Arc::new(FixedSizeSplitter::new(
        settings.chunk_size,
        settings.chunk_overlap,
    ));
    let embedder = EmbedderFactory::lazy_from_settings(settings);
    let vector_store = Arc::new(
        SqliteVectorStore::open(&settings.persist_dir, settings.collection_name.clone())
            .await
            .context("failed to open the vector store")?,
    );
    let llm_client = Arc::new(OpenAiChatClient::from_settings(settings)?);

    tracing::info!(
        document = %settings.pdf_path.display(),
        store = %vector_store.db_path().display(),
        llm_model = %settings.llm_model,
        "Pipeline components ready"
    );

    Ok(RagPipeline::new(
        PipelineComponents {
            file_loader,
            text_splitter,
            embedder,
            vector_store,
            llm_client,
        },
        PipelineConfig::from(settings),
    ))
}
