use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::segment::{segments_to_text, AnswerSegment};
use super::trace::RequestTrace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Map the loose role names the backend uses in thread history.
    pub fn from_backend(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "customer" | "human" => Role::User,
            "assistant" | "bot" | "ai" => Role::Assistant,
            _ => Role::System,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub segments: Option<Vec<AnswerSegment>>,
    #[serde(default)]
    pub trace: Option<RequestTrace>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            created_at: Utc::now(),
            segments: None,
            trace: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// Assistant message whose text is derived from its segments.
    pub fn assistant(segments: Vec<AnswerSegment>) -> Self {
        let mut msg = Self::new(Role::Assistant, segments_to_text(&segments));
        msg.segments = Some(segments);
        msg
    }

    pub fn with_trace(mut self, trace: RequestTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}
