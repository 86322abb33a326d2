use std::sync::LazyLock;

use tiktoken_rs::CoreBPE;

static TOKENIZER: LazyLock<Option<CoreBPE>> = LazyLock::new(|| match tiktoken_rs::cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        tracing::warn!(error = %e, "cl100k tokenizer unavailable, estimating token counts");
        None
    }
});

/// Counts cl100k tokens, or estimates four characters per token when the
/// tokenizer cannot be built.
pub fn count_tokens(text: &str) -> usize {
    match TOKENIZER.as_ref() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => text.chars().count().div_ceil(4),
    }
}
