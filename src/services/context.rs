use crate::services::chunker::Chunk;

pub const DEFAULT_ROLE: &str = "You are a professional business reporting assistant.";
pub const DEFAULT_FALLBACK_ANSWER: &str = "Information not found in the document.";

/// Join the first `limit` chunks, in index order, with a single space.
///
/// Selection is positional only. The question plays no part, so later chunks
/// are never consulted even when they hold the answer.
pub fn select_context(chunks: &[Chunk], limit: usize) -> String {
    chunks
        .iter()
        .take(limit)
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number of chunks `select_context` will use for a sequence of `total` chunks.
pub fn context_chunk_count(total: usize, limit: usize) -> usize {
    total.min(limit)
}

/// Assemble the single instruction string handed to the generation service.
pub fn build_prompt(role: &str, fallback_answer: &str, context: &str, question: &str) -> String {
    format!(
        "{role}\n\n\
         Answer ONLY using the context below.\n\
         If the answer is not available, say:\n\
         \"{fallback_answer}\"\n\n\
         Context:\n\
         {context}\n\n\
         Question:\n\
         {question}\n"
    )
}

/// Whether an answer is the fallback phrase, ignoring quotes, case and surrounding whitespace.
pub fn is_fallback_answer(answer: &str, fallback_answer: &str) -> bool {
    let normalize = |s: &str| {
        s.trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .trim()
            .to_lowercase()
    };
    normalize(answer) == normalize(fallback_answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            index,
            start: index * 10,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_select_context_takes_prefix() {
        let chunks = vec![chunk(0, "c0"), chunk(1, "c1"), chunk(2, "c2"), chunk(3, "c3")];
        assert_eq!(select_context(&chunks, 3), "c0 c1 c2");
        assert_eq!(select_context(&chunks, 1), "c0");
        assert_eq!(select_context(&chunks, 10), "c0 c1 c2 c3");
    }

    #[test]
    fn test_select_context_empty() {
        assert_eq!(select_context(&[], 3), "");
    }

    #[test]
    fn test_context_chunk_count() {
        assert_eq!(context_chunk_count(5, 3), 3);
        assert_eq!(context_chunk_count(2, 3), 2);
        assert_eq!(context_chunk_count(0, 4), 0);
    }

    #[test]
    fn test_build_prompt_embeds_inputs_verbatim() {
        let context = "Revenue grew 12% in Q3.\n  Margins held.";
        let question = "How much did revenue grow?";
        let prompt = build_prompt(DEFAULT_ROLE, DEFAULT_FALLBACK_ANSWER, context, question);

        assert!(prompt.starts_with(DEFAULT_ROLE));
        assert!(prompt.contains("Answer ONLY using the context below."));
        assert!(prompt.contains(&format!("\"{DEFAULT_FALLBACK_ANSWER}\"")));
        assert!(prompt.contains(&format!("Context:\n{context}\n")));
        assert!(prompt.contains(&format!("Question:\n{question}\n")));

        let context_at = prompt.find("Context:").unwrap();
        let question_at = prompt.find("Question:").unwrap();
        assert!(context_at < question_at);
    }

    #[test]
    fn test_is_fallback_answer() {
        assert!(is_fallback_answer(
            "  \"Information not found in the document.\"\n",
            DEFAULT_FALLBACK_ANSWER
        ));
        assert!(is_fallback_answer(
            "information not found in the document.",
            DEFAULT_FALLBACK_ANSWER
        ));
        assert!(!is_fallback_answer("Revenue grew 12%.", DEFAULT_FALLBACK_ANSWER));
    }
}
