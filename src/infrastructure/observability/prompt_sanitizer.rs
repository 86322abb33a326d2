const MAX_VISIBLE_CHARS: usize = 100;

const SECRET_PREFIXES: [(&str, &str); 6] = [
    ("Bearer ", "Bearer [REDACTED]"),
    ("sk-", "[REDACTED]"),
    ("api_key=", "api_key=[REDACTED]"),
    ("password=", "password=[REDACTED]"),
    ("secret=", "secret=[REDACTED]"),
    ("token=", "token=[REDACTED]"),
];

/// Sanitizes a question or prompt for safe logging: trimmed, truncated on a
/// character boundary, with credential-looking values redacted.
pub fn sanitize_prompt(prompt: &str) -> String {
    let trimmed = prompt.trim();

    if trimmed.is_empty() {
        return String::from("[EMPTY]");
    }

    let total_chars = trimmed.chars().count();
    let visible = if total_chars > MAX_VISIBLE_CHARS {
        let head: String = trimmed.chars().take(MAX_VISIBLE_CHARS).collect();
        format!("{head}... ({total_chars} chars total)")
    } else {
        trimmed.to_string()
    };

    redact_secrets(&visible)
}

fn redact_secrets(text: &str) -> String {
    let mut result = text.to_string();
    for (prefix, replacement) in SECRET_PREFIXES {
        let mut search_from = 0;
        while let Some(found) = result[search_from..].find(prefix) {
            let start = search_from + found;
            let glued_to_word = result[..start]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric);
            if glued_to_word {
                search_from = start + prefix.len();
                continue;
            }
            let value_start = start + prefix.len();
            let end = result[value_start..]
                .find(|c: char| c.is_whitespace() || matches!(c, '&' | '"' | '\''))
                .map(|i| value_start + i)
                .unwrap_or(result.len());
            result.replace_range(start..end, replacement);
            search_from = start + replacement.len();
        }
    }
    result
}
