//! Prompt composition: materials excerpts + web evidence + question.

use crate::corpus::MaterialRecord;
use crate::search::SearchResult;

/// Characters of each material included in the prompt.
pub const MATERIAL_EXCERPT_CHARS: usize = 1000;

/// Build the single prompt handed to the answer generator.
///
/// Deterministic for identical inputs. Materials are cut at
/// [`MATERIAL_EXCERPT_CHARS`] characters with no word-boundary handling;
/// the prompt as a whole is not capped.
pub fn compose(question: &str, materials: &[MaterialRecord], web_results: &[SearchResult]) -> String {
    let materials_context = if materials.is_empty() {
        String::new()
    } else {
        let blocks: Vec<String> = materials
            .iter()
            .map(|m| format!("{}:\n{}...", m.label, excerpt(&m.text)))
            .collect();
        format!("\n\nUploaded Materials Context:\n{}", blocks.join("\n\n"))
    };

    let web_context = if web_results.is_empty() {
        String::new()
    } else {
        let blocks: Vec<String> = web_results
            .iter()
            .map(|r| format!("{}:\n{}\nSource: {}", r.title, r.snippet, r.link))
            .collect();
        format!("\n\nWeb Search Results:\n{}", blocks.join("\n\n"))
    };

    format!(
        "You are a helpful educational assistant. Answer the student's question based on the following information:

{materials_context}
{web_context}

Student Question: {question}

IMPORTANT INSTRUCTIONS:
1. ALWAYS answer the question FIRST using the uploaded materials if available and relevant
2. If you use information from uploaded materials, cite the filename like this: \"According to [filename]: [quote or paraphrase]\"
3. After addressing the question with uploaded materials, you can provide additional information from your knowledge
4. If you use web search results, include the exact URL as a hyperlink: \"[Title](URL)\"
5. Be educational, clear, and comprehensive
6. Always mention which materials you referenced in your response

Answer:"
    )
}

/// First [`MATERIAL_EXCERPT_CHARS`] characters of `text`.
pub fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(MATERIAL_EXCERPT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
