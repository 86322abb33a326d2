use docqa::application::ports::SearchResult;
use docqa::application::services::{SYSTEM_PROMPT, count_tokens, render_context, render_user_prompt};
use docqa::domain::{Chunk, DocumentId};

fn result(text: &str, page: Option<u32>, score: f32) -> SearchResult {
    SearchResult {
        chunk: Chunk::new(text.to_string(), DocumentId::new(), page, 0),
        score,
    }
}

#[test]
fn given_passages_when_rendering_context_then_labels_each_with_page_and_similarity() {
    let context = render_context(&[
        result("  Solar panels convert light. ", Some(3), 0.8734),
        result("Unpaged text", None, 0.7),
    ]);

    assert_eq!(
        context,
        "[Page 3] (similarity 0.873)\nSolar panels convert light.\n\n[Page ?] (similarity 0.700)\nUnpaged text"
    );
}

#[test]
fn given_context_and_question_when_rendering_prompt_then_includes_both() {
    let prompt = render_user_prompt("[Page 1] (similarity 0.900)\nfacts", "What are the facts?");

    assert!(prompt.contains("[Page 1] (similarity 0.900)\nfacts"));
    assert!(prompt.contains("Question: What are the facts?"));
    assert!(prompt.trim_end().ends_with("Answer:"));
}

#[test]
fn given_system_prompt_when_inspected_then_requires_page_citations() {
    assert!(SYSTEM_PROMPT.contains("[Page X]"));
}

#[test]
fn given_text_when_counting_tokens_then_longer_text_has_more_tokens() {
    let short = count_tokens("hello world");
    let long = count_tokens(&"hello world ".repeat(50));

    assert!(short > 0);
    assert!(long > short);
    assert_eq!(count_tokens(""), 0);
}
