use std::sync::Arc;

use chrono::Utc;
use docqa::application::services::PipelineConfig;
use docqa::application::services::self_learning::{
    GeneratedQuestion, Priority, QaRecord, QaStatistics, QuestionGenerator, RecordedSource,
    TuningAdvisor, load_questions, load_records, report_path, save_records,
};
use docqa::domain::Page;

use crate::helpers::{FailingLlmClient, MockLlmClient};

const QUESTIONS_JSON: &str = r#"{"questions":[
    {"question":"What do solar panels convert?","type":"factual","expected_answer":"Sunlight.","concepts":["solar","photovoltaics"]},
    {"question":"Why store energy?","type":"conceptual","concepts":["storage"]}
]}"#;

fn record(num_sources: usize, answer: &str, error: Option<&str>) -> QaRecord {
    let sources: Vec<RecordedSource> = (0..num_sources)
        .map(|i| RecordedSource {
            chunk_id: format!("chunk-{i}"),
            page: Some(i as u32 % 2 + 1),
            score: 0.8,
            preview: "preview".to_string(),
        })
        .collect();
    QaRecord {
        question: "question?".to_string(),
        answer: answer.to_string(),
        num_sources,
        pages: sources.iter().filter_map(|s| s.page).collect(),
        sources,
        retrieval_time_ms: 10.0,
        generation_time_ms: 20.0,
        total_time_ms: 30.0,
        tokens_used: Some(100),
        query_time_seconds: 0.5,
        error: error.map(str::to_string),
        timestamp: Utc::now(),
        question_metadata: None,
    }
}

const SUGGESTIONS_JSON: &str = r#"{
    "critical_issues": [
        {"issue": "Half the questions retrieve nothing", "impact": "high", "solution": "Lower the threshold"}
    ],
    "retrieval_improvements": [
        {"recommendation": "Use overlapping chunks", "expected_benefit": "Fewer split facts"}
    ],
    "answer_generation_improvements": [
        {"recommendation": "Cite every claim", "expected_benefit": "Verifiable answers"}
    ],
    "parameter_recommendations": [
        {"parameter": "TOP_K", "current_value": 7, "suggested_value": "10", "rationale": "More context"}
    ],
    "prompt_engineering": [
        {"area": "system prompt", "suggestion": "Ask for page citations"}
    ]
}"#;

fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        pdf_path: "manual.pdf".into(),
        collection_name: "docs".to_string(),
        embedding_model: "hash".to_string(),
        llm_model: "mock-model".to_string(),
        chunk_size: 1200,
        chunk_overlap: 200,
        top_k: 7,
        similarity_threshold: 0.65,
        max_context_tokens: 6000,
        batch_size: 32,
    }
}

fn sparse_records() -> Vec<QaRecord> {
    vec![
        record(2, "Answer [Page 1]", None),
        record(0, "No info.", None),
    ]
}

fn question(text: &str) -> GeneratedQuestion {
    GeneratedQuestion {
        question: text.to_string(),
        kind: "factual".to_string(),
        expected_answer: String::new(),
        concepts: Vec::new(),
        page: Some(1),
        source_text_preview: String::new(),
    }
}

#[test]
fn given_sparse_retrieval_when_analyzing_then_suggests_higher_top_k_and_lower_threshold() {
    let records = vec![
        record(2, "Answer [Page 1]", None),
        record(0, "No info.", None),
        record(0, "No info.", None),
        record(2, "Answer [Page 2] and [Page 1]", None),
    ];

    let report = TuningAdvisor::new(7, 0.65).analyze(&records);

    assert_eq!(report.retrieval.avg_sources, 1.0);
    assert_eq!(report.retrieval.queries_with_no_sources, 2);
    let top_k = report.parameters.iter().find(|p| p.parameter == "TOP_K").unwrap();
    assert_eq!(top_k.suggested_value, "10");
    let threshold = report
        .parameters
        .iter()
        .find(|p| p.parameter == "SIMILARITY_THRESHOLD")
        .unwrap();
    assert_eq!(threshold.current_value, "0.65");
    assert_eq!(threshold.suggested_value, "0.60");
    assert_eq!(report.actions[0].rank, 1);
    assert_eq!(report.actions[0].action, "Reduce SIMILARITY_THRESHOLD");
    assert_eq!(report.actions[0].impact, Priority::High);
}

#[test]
fn given_top_k_near_ceiling_when_analyzing_then_caps_suggestion_at_fifteen() {
    let records = vec![record(1, "Answer [Page 1]", None)];

    let report = TuningAdvisor::new(14, 0.52).analyze(&records);

    let top_k = report.parameters.iter().find(|p| p.parameter == "TOP_K").unwrap();
    assert_eq!(top_k.suggested_value, "15");
}

#[test]
fn given_healthy_records_when_analyzing_then_suggests_nothing() {
    let records = vec![record(5, "Answer [Page 1]", None); 4];

    let report = TuningAdvisor::new(7, 0.65).analyze(&records);

    assert!(report.parameters.is_empty());
    assert!(report.actions.is_empty());
    assert_eq!(report.answers.citation_rate, 1.0);
    assert_eq!(report.retrieval.avg_unique_pages, 2.0);
    assert!(report.render().contains("IMPROVEMENT SUGGESTIONS REPORT"));
}

#[test]
fn given_failed_records_when_analyzing_then_excludes_them() {
    let records = vec![
        record(5, "Answer [Page 1]", None),
        record(0, "", Some("rate limited")),
    ];

    let report = TuningAdvisor::new(7, 0.65).analyze(&records);

    assert_eq!(report.retrieval.queries_with_no_sources, 0);
    assert!(report.parameters.is_empty());
}

#[test]
fn given_mixed_records_when_computing_statistics_then_counts_failures() {
    let records = vec![
        record(3, "a", None),
        record(1, "b", None),
        record(0, "", Some("boom")),
    ];

    let stats = QaStatistics::from_records(&records);

    assert_eq!(stats.total, 3);
    assert_eq!(stats.successful, 2);
    assert_eq!(stats.failed, 1);
    assert!((stats.success_rate - 2.0 / 3.0).abs() < 1e-9);
    assert!((stats.total_time_seconds - 1.5).abs() < 1e-9);
}

#[test]
fn given_saved_records_when_loading_then_returns_same_questions_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results").join("qa.json");
    let records = vec![record(2, "a [Page 1]", None), record(0, "", Some("boom"))];

    save_records(&records, &path).unwrap();
    let loaded = load_records(&path).unwrap();

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].num_sources, 2);
    assert_eq!(loaded[1].error.as_deref(), Some("boom"));
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"total_pairs\": 2"));
}

#[test]
fn given_bare_question_array_when_loading_then_accepts_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("questions.json");
    std::fs::write(&path, r#"[{"text":"Legacy key?"},{"question":"New key?"}]"#).unwrap();

    let questions = load_questions(&path).unwrap();

    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].question, "Legacy key?");
}

#[test]
fn given_missing_question_file_when_loading_then_returns_error() {
    assert!(load_questions(std::path::Path::new("/nonexistent/questions.json")).is_err());
}

#[tokio::test]
async fn given_pages_when_generating_then_skips_short_pages_and_tracks_coverage() {
    let llm = Arc::new(MockLlmClient::new(QUESTIONS_JSON));
    let mut generator = QuestionGenerator::new(llm.clone());
    let pages = vec![
        Page::new(1, "Too short."),
        Page::new(2, "Solar panels convert sunlight into electricity. ".repeat(5)),
        Page::new(3, "Batteries store surplus energy for later use. ".repeat(5)),
    ];

    let questions = generator.generate(&pages, 2, Some(2)).await;

    assert_eq!(llm.call_count(), 1);
    assert_eq!(questions.len(), 2);
    assert!(questions.iter().all(|q| q.page == Some(2)));
    assert!(questions[0].source_text_preview.ends_with("..."));
    let coverage = generator.coverage_report();
    assert_eq!(coverage.pages_processed, 1);
    assert_eq!(coverage.unique_concepts, 3);
}

#[tokio::test]
async fn given_generated_questions_when_saved_then_load_back_with_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("questions.json");
    let mut generator = QuestionGenerator::new(Arc::new(MockLlmClient::new(QUESTIONS_JSON)));
    let pages = vec![Page::new(1, "Wind turbines capture kinetic energy. ".repeat(5))];
    let questions = generator.generate(&pages, 2, None).await;

    generator.save(&questions, &path).unwrap();
    let loaded = load_questions(&path).unwrap();

    assert_eq!(loaded, questions);
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"total_questions\": 2"));
}

#[tokio::test]
async fn given_unparseable_model_output_when_generating_then_page_is_skipped() {
    let mut generator = QuestionGenerator::new(Arc::new(MockLlmClient::new("not json")));
    let pages = vec![Page::new(1, "Long enough page text to be processed. ".repeat(5))];

    let questions = generator.generate(&pages, 3, None).await;

    assert!(questions.is_empty());
    assert_eq!(generator.coverage_report().pages_covered, 1);
    assert!(generator.coverage()[&1].num_questions == 0);
}

#[test]
fn given_question_when_serialized_then_uses_type_key() {
    let json = serde_json::to_string(&question("Q?")).unwrap();

    assert!(json.contains("\"type\":\"factual\""));
}

#[tokio::test]
async fn given_llm_client_when_advising_then_requests_json_at_low_temperature_with_analysis_and_config() {
    let llm = Arc::new(MockLlmClient::new(SUGGESTIONS_JSON));
    let advisor = TuningAdvisor::with_llm(llm.clone(), &pipeline_config());

    let report = advisor.advise(&sparse_records()).await;

    let request = llm.last_request().unwrap();
    assert!(request.json_mode);
    assert_eq!(request.temperature, Some(0.3));
    assert!(request.user.contains("avg_sources"));
    assert!(request.user.contains("citation_rate"));
    assert!(request.user.contains("\"CHUNK_SIZE\": 1200"));
    assert!(!report.parameters.is_empty());

    let suggestions = report.llm_suggestions.unwrap();
    assert_eq!(suggestions.critical_issues[0].impact, "high");
    assert_eq!(suggestions.retrieval_improvements.len(), 1);
    assert_eq!(suggestions.generation_improvements[0].recommendation, "Cite every claim");
    assert_eq!(suggestions.parameter_recommendations[0].parameter, "TOP_K");
    assert_eq!(suggestions.prompt_suggestions[0].area, "system prompt");
}

#[tokio::test]
async fn given_llm_suggestions_when_rendering_then_adds_their_sections() {
    let llm = Arc::new(MockLlmClient::new(SUGGESTIONS_JSON));
    let report = TuningAdvisor::with_llm(llm, &pipeline_config())
        .advise(&sparse_records())
        .await;

    let text = report.render();

    assert!(text.contains("## CRITICAL ISSUES"));
    assert!(text.contains("- [HIGH] Half the questions retrieve nothing"));
    assert!(text.contains("  Solution: Lower the threshold"));
    assert!(text.contains("## RETRIEVAL IMPROVEMENTS"));
    assert!(text.contains("## ANSWER GENERATION IMPROVEMENTS"));
    assert!(text.contains("- TOP_K: 7 → 10"));
    assert!(text.contains("## PROMPT SUGGESTIONS"));
    assert!(text.contains("- [system prompt] Ask for page citations"));
}

#[tokio::test]
async fn given_failing_llm_when_advising_then_keeps_rule_based_report() {
    let advisor = TuningAdvisor::with_llm(Arc::new(FailingLlmClient), &pipeline_config());

    let report = advisor.advise(&sparse_records()).await;

    assert!(report.llm_suggestions.is_none());
    assert_eq!(report, TuningAdvisor::new(7, 0.65).analyze(&sparse_records()));
    assert!(!report.render().contains("## CRITICAL ISSUES"));
}

#[tokio::test]
async fn given_non_json_suggestions_when_advising_then_skips_them() {
    let llm = Arc::new(MockLlmClient::new("I would lower the threshold."));
    let advisor = TuningAdvisor::with_llm(llm.clone(), &pipeline_config());

    let report = advisor.advise(&sparse_records()).await;

    assert_eq!(llm.call_count(), 1);
    assert!(report.llm_suggestions.is_none());
}

#[tokio::test]
async fn given_advisor_without_llm_when_advising_then_matches_rule_based_analysis() {
    let advisor = TuningAdvisor::new(7, 0.65);

    let report = advisor.advise(&sparse_records()).await;

    assert_eq!(report, advisor.analyze(&sparse_records()));
}

#[tokio::test]
async fn given_results_path_when_saving_report_then_writes_rendered_text_next_to_it() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("runs").join("qa_results.json");
    let llm = Arc::new(MockLlmClient::new(SUGGESTIONS_JSON));
    let report = TuningAdvisor::with_llm(llm, &pipeline_config())
        .advise(&sparse_records())
        .await;

    let path = report_path(&results);
    report.save(&path).unwrap();

    assert_eq!(path, dir.path().join("runs").join("qa_results_improvements.txt"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), report.render());
}
