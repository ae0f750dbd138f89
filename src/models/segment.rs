use serde::{Deserialize, Serialize};

/// One renderable piece of an assistant reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerSegment {
    Text { text: String },
    Link { href: String, label: String },
    /// Anything the client does not know how to render, kept as raw JSON.
    Other {
        kind: Option<String>,
        value: serde_json::Value,
    },
}

impl AnswerSegment {
    pub fn text(text: impl Into<String>) -> Self {
        AnswerSegment::Text { text: text.into() }
    }

    /// Plain-text rendering used for copy and de-duplication.
    pub fn plain_text(&self) -> String {
        match self {
            AnswerSegment::Text { text } => text.clone(),
            AnswerSegment::Link { href, label } => format!("{} ({})", label, href),
            AnswerSegment::Other { value, .. } => value.to_string(),
        }
    }
}

pub fn segments_to_text(segments: &[AnswerSegment]) -> String {
    segments
        .iter()
        .map(AnswerSegment::plain_text)
        .collect::<Vec<_>>()
        .join("\n\n")
}
