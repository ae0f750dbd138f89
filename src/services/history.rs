use chrono::{DateTime, Utc};
use serde_json::Value;
use url::Url;

use super::answer::parse_answer_value;
use crate::models::{Message, Role};

/// Replay a thread history payload into chat messages, oldest first.
pub fn history_to_messages(payload: &Value, current_location: Option<&Url>) -> Vec<Message> {
    let items = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => ["data", "messages", "items"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    };

    let mut messages: Vec<Message> = items
        .iter()
        .filter_map(|item| item_to_message(item, current_location))
        .collect();
    messages.sort_by_key(|m| m.created_at);
    messages
}

fn item_to_message(item: &Value, current_location: Option<&Url>) -> Option<Message> {
    let obj = item.as_object()?;

    let role = ["role", "sender", "author"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(Role::from_backend)
        .unwrap_or(Role::System);

    let content = ["content", "text", "message", "body"]
        .iter()
        .find_map(|key| obj.get(*key).filter(|v| !v.is_null()))?;

    let created_at = ["created_at", "timestamp", "sent_at"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(parse_timestamp))
        .unwrap_or_else(Utc::now);

    let message = match (role, content) {
        (Role::User, Value::String(text)) | (Role::System, Value::String(text)) => {
            Message::new(role, text.clone())
        }
        (Role::Assistant, answer) => {
            let segments = parse_answer_value(answer, current_location);
            if segments.is_empty() {
                return None;
            }
            Message::assistant(segments)
        }
        (_, other) => Message::new(role, other.to_string()),
    };
    Some(message.with_created_at(created_at))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
        Value::Number(n) => {
            let secs = n.as_i64()?;
            // Values this large are milliseconds
            if secs > 10_000_000_000 {
                DateTime::from_timestamp_millis(secs)
            } else {
                DateTime::from_timestamp(secs, 0)
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerSegment;
    use serde_json::json;

    #[test]
    fn test_history_from_wrapped_object() {
        let payload = json!({"data": [
            {"role": "assistant", "content": ["Welcome back", "How can I help?"], "created_at": "2025-03-01T10:00:05Z"},
            {"role": "user", "content": "hi", "created_at": "2025-03-01T10:00:00Z"}
        ]});
        let messages = history_to_messages(&payload, None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].text, "hi");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(
            messages[1].segments.as_deref(),
            Some(&[
                AnswerSegment::text("Welcome back"),
                AnswerSegment::text("How can I help?")
            ][..])
        );
    }

    #[test]
    fn test_history_from_bare_array_with_loose_roles() {
        let payload = json!([
            {"sender": "customer", "text": "oi", "timestamp": 1735725600},
            {"sender": "bot", "message": "olá", "timestamp": 1735725601000i64},
            {"sender": "operator", "body": "transferred"}
        ]);
        let messages = history_to_messages(&payload, None);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].text, "olá");
        assert_eq!(messages[2].role, Role::System);
    }

    #[test]
    fn test_history_skips_unusable_items() {
        let payload = json!({"messages": [
            "not an object",
            {"role": "user"},
            {"role": "assistant", "content": []},
            {"role": "user", "content": "kept", "created_at": "2025-01-01T00:00:00Z"}
        ]});
        let messages = history_to_messages(&payload, None);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "kept");
    }

    #[test]
    fn test_unexpected_payload_is_empty() {
        assert!(history_to_messages(&json!("oops"), None).is_empty());
        assert!(history_to_messages(&json!({"error": "not found"}), None).is_empty());
    }
}
