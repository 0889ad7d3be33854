//! Grounded prompt assembly.
//!
//! The layout of the user message is part of the contract with the chat
//! model: retrieved text sits between `---` delimiter lines and the question
//! follows under an explicit `Question:` label.

use serde::{Deserialize, Serialize};

use crate::document::SearchResult;

/// System instruction used when none is configured.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are an AI assistant helping users explore PDF \
     content. Provide accurate and clear responses based on the uploaded document.";

const CONTEXT_PREAMBLE: &str = "Refer to the following content and answer the question clearly:";
const CONTEXT_DELIMITER: &str = "---";

/// A model-ready request: system instruction plus grounded user message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prompt {
    /// Fixed instruction sent as the system message.
    pub system_instruction: String,
    /// Delimited context followed by the question.
    pub user_message: String,
}

impl Prompt {
    /// The whole prompt as one string.
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.system_instruction, self.user_message)
    }
}

/// Build a prompt from segment texts in ranked order.
///
/// # Example
///
/// ```rust
/// use docinsight_rag::assemble;
///
/// let prompt = assemble(&["A.", "B."], "What is A?", "SYS");
/// assert_eq!(prompt.system_instruction, "SYS");
/// assert!(prompt.user_message.contains("---\nA.\nB.\n---"));
/// assert!(prompt.user_message.ends_with("Question: What is A?"));
/// ```
pub fn assemble<S: AsRef<str>>(segments: &[S], query: &str, system_instruction: &str) -> Prompt {
    let context = segments.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("\n");
    let user_message = format!(
        "{CONTEXT_PREAMBLE}\n\n{CONTEXT_DELIMITER}\n{context}\n{CONTEXT_DELIMITER}\n\nQuestion: {query}"
    );
    Prompt { system_instruction: system_instruction.to_string(), user_message }
}

/// [`assemble`] over retrieval results.
pub fn assemble_from_results(
    results: &[SearchResult],
    query: &str,
    system_instruction: &str,
) -> Prompt {
    let contents: Vec<&str> = results.iter().map(|r| r.segment.content.as_str()).collect();
    assemble(&contents, query, system_instruction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_has_all_three_parts() {
        let prompt = assemble(&["A.", "B."], "What is A?", "SYS");
        let text = prompt.render();

        assert!(text.starts_with("SYS\n\n"));
        let open = text.find("---\n").unwrap();
        let close = text.rfind("\n---").unwrap();
        let context = &text[open + 4..close];
        assert_eq!(context, "A.\nB.");
        assert!(text.contains("Question: What is A?"));
        assert!(text.find("Question:").unwrap() > close);
    }

    #[test]
    fn matches_expected_layout_exactly() {
        let prompt = assemble(&["one"], "q?", DEFAULT_SYSTEM_INSTRUCTION);
        assert_eq!(
            prompt.user_message,
            "Refer to the following content and answer the question clearly:\n\n---\none\n---\n\nQuestion: q?"
        );
        assert_eq!(prompt.system_instruction, DEFAULT_SYSTEM_INSTRUCTION);
    }

    #[test]
    fn ranked_order_is_preserved() {
        let prompt = assemble(&["second best", "best"], "q", "s");
        assert!(
            prompt.user_message.find("second best").unwrap()
                < prompt.user_message.find("\nbest").unwrap()
        );
    }
}
