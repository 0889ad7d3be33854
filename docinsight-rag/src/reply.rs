//! Structured chat replies.
//!
//! Reasoning models emit their chain of thought wrapped in
//! `<think>…</think>`, usually first but sometimes after a stray newline or
//! a short preamble. [`ChatReply`] separates that span from the answer so
//! front ends can render it differently without searching for markers.

use serde::{Deserialize, Serialize};

/// Tag opening a reasoning span.
pub const REASONING_OPEN: &str = "<think>";
/// Tag closing a reasoning span.
pub const REASONING_CLOSE: &str = "</think>";

/// A chat model's reply split into reasoning and the visible answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    /// Text between the first pair of reasoning tags, verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// The reply with the reasoning span (tags included) cut out.
    pub visible_answer: String,
    /// Byte offset in `visible_answer` where the span was cut out.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub reasoning_at: usize,
}

pub(crate) fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl ChatReply {
    /// A reply with no reasoning span.
    pub fn answer(text: impl Into<String>) -> Self {
        Self { reasoning: None, visible_answer: text.into(), reasoning_at: 0 }
    }

    /// Split a raw model response.
    ///
    /// The first [`REASONING_OPEN`] followed by a [`REASONING_CLOSE`] marks
    /// the span, wherever it sits. Text before and after it forms the visible
    /// answer. Without a complete pair the whole response is visible answer.
    /// [`to_raw`](Self::to_raw) reverses this exactly.
    pub fn parse(raw: &str) -> Self {
        let Some(open) = raw.find(REASONING_OPEN) else {
            return Self::answer(raw);
        };
        let body_start = open + REASONING_OPEN.len();
        let Some(len) = raw[body_start..].find(REASONING_CLOSE) else {
            return Self::answer(raw);
        };
        let body_end = body_start + len;

        let mut visible_answer = String::with_capacity(raw.len() - (body_end - open));
        visible_answer.push_str(&raw[..open]);
        visible_answer.push_str(&raw[body_end + REASONING_CLOSE.len()..]);

        Self {
            reasoning: Some(raw[body_start..body_end].to_string()),
            visible_answer,
            reasoning_at: open,
        }
    }

    /// Rebuild the raw response this reply was parsed from.
    pub fn to_raw(&self) -> String {
        let Some(reasoning) = &self.reasoning else {
            return self.visible_answer.clone();
        };
        let at = self.split_point();
        format!(
            "{}{REASONING_OPEN}{reasoning}{REASONING_CLOSE}{}",
            &self.visible_answer[..at],
            &self.visible_answer[at..]
        )
    }

    fn split_point(&self) -> usize {
        let mut at = self.reasoning_at.min(self.visible_answer.len());
        while !self.visible_answer.is_char_boundary(at) {
            at -= 1;
        }
        at
    }

    /// The reasoning with surrounding whitespace removed, if non-blank.
    pub fn reasoning_text(&self) -> Option<&str> {
        self.reasoning.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }

    /// The answer with surrounding whitespace removed.
    pub fn answer_text(&self) -> &str {
        self.visible_answer.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_leading_reasoning() {
        let raw = "<think>\nThe page says so.\n</think>\n\nGrass is green.";
        let reply = ChatReply::parse(raw);
        assert_eq!(reply.reasoning.as_deref(), Some("\nThe page says so.\n"));
        assert_eq!(reply.visible_answer, "\n\nGrass is green.");
        assert_eq!(reply.reasoning_at, 0);
        assert_eq!(reply.reasoning_text(), Some("The page says so."));
        assert_eq!(reply.answer_text(), "Grass is green.");
        assert_eq!(reply.to_raw(), raw);
    }

    #[test]
    fn leading_whitespace_before_the_span() {
        let raw = "\n<think>plan</think>\nAnswer.";
        let reply = ChatReply::parse(raw);
        assert_eq!(reply.reasoning.as_deref(), Some("plan"));
        assert_eq!(reply.visible_answer, "\n\nAnswer.");
        assert_eq!(reply.reasoning_at, 1);
        assert_eq!(reply.answer_text(), "Answer.");
        assert_eq!(reply.to_raw(), raw);
    }

    #[test]
    fn preamble_stays_in_the_answer() {
        let raw = "Sure. <think>check page 2</think>It is green.";
        let reply = ChatReply::parse(raw);
        assert_eq!(reply.reasoning_text(), Some("check page 2"));
        assert_eq!(reply.answer_text(), "Sure. It is green.");
        assert_eq!(reply.to_raw(), raw);
    }

    #[test]
    fn plain_answer_has_no_reasoning() {
        let reply = ChatReply::parse("Just an answer.");
        assert_eq!(reply, ChatReply::answer("Just an answer."));
        assert_eq!(reply.to_raw(), "Just an answer.");
    }

    #[test]
    fn unterminated_span_is_answer_text() {
        let raw = "Hmm <think>still thinking";
        let reply = ChatReply::parse(raw);
        assert!(reply.reasoning.is_none());
        assert_eq!(reply.visible_answer, raw);
        assert_eq!(reply.to_raw(), raw);
    }

    #[test]
    fn empty_reasoning_round_trips() {
        let raw = "<think></think>ok";
        let reply = ChatReply::parse(raw);
        assert_eq!(reply.reasoning.as_deref(), Some(""));
        assert_eq!(reply.reasoning_text(), None);
        assert_eq!(reply.to_raw(), raw);
    }

    #[test]
    fn only_the_first_pair_is_split() {
        let raw = "<think>a</think>b</think>c<think>d</think>";
        let reply = ChatReply::parse(raw);
        assert_eq!(reply.reasoning.as_deref(), Some("a"));
        assert_eq!(reply.visible_answer, "b</think>c<think>d</think>");
        assert_eq!(reply.to_raw(), raw);
    }

    #[test]
    fn offset_is_omitted_from_json_when_zero() {
        let json = serde_json::to_value(ChatReply::parse("<think>x</think>y")).unwrap();
        assert_eq!(json, serde_json::json!({ "reasoning": "x", "visible_answer": "y" }));

        let json = serde_json::to_value(ChatReply::parse("a<think>x</think>y")).unwrap();
        assert_eq!(json["reasoning_at"], 1);
    }
}
