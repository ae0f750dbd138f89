use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::{AnswerSegment, Message, Role};

/// The in-memory message list of the chat view.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    messages: Vec<Message>,
    dedup_window: Duration,
    /// When the most recent message was appended, which may differ from its
    /// `created_at` for replayed history.
    last_appended_at: Option<DateTime<Utc>>,
}

impl ConversationLog {
    pub fn new(dedup_window: Duration) -> Self {
        Self {
            messages: Vec::new(),
            dedup_window,
            last_appended_at: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: Message) {
        self.push_at(message, Utc::now());
    }

    fn push_at(&mut self, message: Message, now: DateTime<Utc>) {
        self.messages.push(message);
        self.last_appended_at = Some(now);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.last_appended_at = None;
    }

    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.last_appended_at = Some(Utc::now());
    }

    /// The backend moved to a new thread: keep only the user message that
    /// triggered it and the reply, wherever they sit in the log.
    pub fn start_new_session(&mut self, user_message_id: &str, reply: Message) {
        self.messages.retain(|m| m.id == user_message_id);
        self.push(reply);
    }

    /// Append an assistant message that arrived over the push channel.
    /// Returns `None` when it duplicates the most recent assistant message,
    /// which happens when the HTTP reply already surfaced the same text.
    pub fn append_pushed(&mut self, text: &str, now: DateTime<Utc>) -> Option<Message> {
        if self.is_recent_duplicate(text, now) {
            tracing::debug!("Dropping duplicate pushed message");
            return None;
        }
        let message = Message::assistant(vec![AnswerSegment::text(text)])
            .with_created_at(now);
        self.push_at(message.clone(), now);
        Some(message)
    }

    fn is_recent_duplicate(&self, text: &str, now: DateTime<Utc>) -> bool {
        let (Some(last), Some(appended_at)) = (self.messages.last(), self.last_appended_at) else {
            return false;
        };
        if last.role == Role::User {
            return false;
        }
        let age = now.signed_duration_since(appended_at);
        let within_window = age
            .to_std()
            .map(|age| age <= self.dedup_window)
            .unwrap_or(true);
        within_window && last.text.trim() == text.trim()
    }
}
