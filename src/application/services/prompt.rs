use crate::application::ports::SearchResult;

/// Answer returned without calling the model when no passage clears the
/// similarity threshold.
pub const FALLBACK_ANSWER: &str = "I couldn't find any relevant information in the document to answer this question. \
Try rephrasing it, or lower SIMILARITY_THRESHOLD if relevant passages are being filtered out.";

pub const SYSTEM_PROMPT: &str = "You are an expert assistant answering questions about a single document.
Your role is to answer questions based on the provided context passages from that document.

Guidelines:
1. Use ONLY information from the provided context passages to construct your answer
2. Always cite page numbers when referencing specific information using the format [Page X]
3. If the context contains related or relevant information, synthesize it to answer the question
4. If you can infer or derive an answer from the context, do so and cite the relevant pages
5. Only say \"I cannot find this information\" if the context has NO relevant information at all
6. When multiple pages discuss related concepts, integrate them into a coherent answer
7. Be precise, concise, and technical when appropriate";

/// Renders retrieved passages as `[Page X] (similarity 0.873)` headers
/// followed by the passage text, separated by blank lines.
pub fn render_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| {
            let page = r
                .chunk
                .page
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".to_string());
            format!("[Page {page}] (similarity {:.3})\n{}", r.score, r.chunk.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_user_prompt(context: &str, question: &str) -> String {
    format!(
        "Context passages from the document:
{context}

Question: {question}

Instructions:
- Carefully read all the context passages above
- Answer the question using information from the context
- Synthesize information from multiple passages if needed
- Always cite page numbers using [Page X] format for all information used
- If the context contains related information but doesn't directly answer the question, explain what the context does say that's relevant
- Only say \"I cannot find this information in the provided context\" if NONE of the passages are relevant to the question
- Provide a complete, well-structured answer

Answer:"
    )
}
