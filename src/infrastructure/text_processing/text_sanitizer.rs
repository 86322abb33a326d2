use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static BROKEN_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<head>\w)[-\u{00AD}][ \t]*\r?\n[ \t]*(?P<tail>\w)")
        .expect("broken-word pattern is valid")
});

/// Cleans raw PDF page text: NFKC (ligatures), joins words hyphenated across
/// line breaks, drops control characters, collapses runs of spaces and blank
/// lines.
pub fn sanitize_extracted_text(raw: &str) -> String {
    let normalized: String = raw
        .nfkc()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    let joined = BROKEN_WORD.replace_all(&normalized, "$head$tail");

    let mut paragraphs: Vec<Vec<String>> = vec![Vec::new()];
    for line in joined.lines() {
        let collapsed = collapse_whitespace(line);
        if collapsed.is_empty() {
            if paragraphs.last().is_some_and(|p| !p.is_empty()) {
                paragraphs.push(Vec::new());
            }
        } else if let Some(current) = paragraphs.last_mut() {
            current.push(collapsed);
        }
    }

    paragraphs
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}
