//! Terminal rendering of answers and history.

use docinsight_rag::{Answer, ChatMessage, ChatReply, Role, SearchResult};

const REASONING_GUTTER: &str = "  │ ";

/// Format an answer for stdout.
///
/// The reasoning span, when present and `show_reasoning` is set, is printed
/// first behind a gutter so it reads apart from the answer.
pub fn answer(answer: &Answer, show_reasoning: bool) -> String {
    match answer {
        Answer::Grounded { reply, sources } => {
            let mut out = reply_text(reply, show_reasoning);
            let cited = source_list(sources);
            if !cited.is_empty() {
                out.push_str(&format!("\n\n[sources: {cited}]"));
            }
            out
        }
        other => other.text().to_string(),
    }
}

fn reply_text(reply: &ChatReply, show_reasoning: bool) -> String {
    let mut out = String::new();
    if let Some(reasoning) = reply.reasoning_text().filter(|_| show_reasoning) {
        out.push_str("Reasoning:\n");
        for line in reasoning.lines() {
            out.push_str(REASONING_GUTTER);
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str(reply.answer_text());
    out
}

/// Pages (or segment ids for unpaged documents) of the retrieved segments.
fn source_list(sources: &[SearchResult]) -> String {
    let mut cited: Vec<String> = Vec::new();
    for result in sources {
        let label = match result.segment.page() {
            Some(page) => format!("p. {page}"),
            None => result.segment.id.clone(),
        };
        if !cited.contains(&label) {
            cited.push(label);
        }
    }
    cited.join(", ")
}

/// Format the chat history, one message per paragraph.
pub fn history(messages: &[ChatMessage], show_reasoning: bool) -> String {
    messages
        .iter()
        .map(|message| {
            let speaker = match message.role {
                Role::User => "you",
                Role::Assistant => "docinsight",
            };
            let body = match message.role {
                Role::User => message.content.clone(),
                Role::Assistant => reply_text(&message.to_reply(), show_reasoning),
            };
            format!("{speaker}> {body}")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use docinsight_rag::{NO_RELEVANT_CONTENT_MESSAGE, Segment};

    use super::*;

    fn result(id: &str, page: Option<&str>) -> SearchResult {
        let mut metadata = HashMap::new();
        if let Some(page) = page {
            metadata.insert("page".to_string(), page.to_string());
        }
        SearchResult {
            segment: Segment { id: id.to_string(), content: "text".to_string(), metadata },
            score: 0.5,
        }
    }

    #[test]
    fn reasoning_is_shown_behind_a_gutter() {
        let answer = Answer::Grounded {
            reply: ChatReply::parse("<think>\nstep one\nstep two\n</think>\n\nGreen."),
            sources: vec![result("doc#1", Some("2")), result("doc#2", Some("2"))],
        };

        let shown = super::answer(&answer, true);
        assert_eq!(shown, "Reasoning:\n  │ step one\n  │ step two\n\nGreen.\n\n[sources: p. 2]");

        let hidden = super::answer(&answer, false);
        assert_eq!(hidden, "Green.\n\n[sources: p. 2]");
    }

    #[test]
    fn unpaged_sources_use_segment_ids() {
        let answer = Answer::Grounded {
            reply: ChatReply::answer("Blue."),
            sources: vec![result("notes.txt#0", None)],
        };
        assert_eq!(super::answer(&answer, true), "Blue.\n\n[sources: notes.txt#0]");
    }

    #[test]
    fn fallback_answers_render_their_message() {
        assert_eq!(super::answer(&Answer::NoRelevantContent, true), NO_RELEVANT_CONTENT_MESSAGE);
    }

    #[test]
    fn history_labels_speakers() {
        let messages = vec![ChatMessage::user("Hi?"), ChatMessage::assistant("Hello.")];
        assert_eq!(history(&messages, false), "you> Hi?\n\ndocinsight> Hello.");
    }
}
