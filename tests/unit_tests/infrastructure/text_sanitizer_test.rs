use docqa::infrastructure::text_processing::sanitize_extracted_text;

#[test]
fn given_ligatures_when_sanitizing_then_normalizes_to_plain_letters() {
    assert_eq!(sanitize_extracted_text("ﬁnance and ﬂow"), "finance and flow");
}

#[test]
fn given_word_hyphenated_across_lines_when_sanitizing_then_joins_it() {
    assert_eq!(
        sanitize_extracted_text("retrieval knowl-\nedge base"),
        "retrieval knowledge base"
    );
}

#[test]
fn given_runs_of_spaces_and_blank_lines_when_sanitizing_then_collapses_them() {
    let raw = "First   line\n\n\n\n   Second\tline  \n";

    assert_eq!(sanitize_extracted_text(raw), "First line\n\nSecond line");
}

#[test]
fn given_control_characters_when_sanitizing_then_drops_them() {
    assert_eq!(sanitize_extracted_text("page\u{0007} text\u{000C}"), "page text");
}

#[test]
fn given_whitespace_only_input_when_sanitizing_then_returns_empty() {
    assert!(sanitize_extracted_text(" \n\t \n").is_empty());
}
