use serde_json::Value;

use crate::models::ConversationContext;

const MAX_SEARCH_DEPTH: usize = 6;

/// Backend-signalled actions that end the current thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadAction {
    Close,
    DeleteUser,
}

impl ThreadAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "close" => Some(ThreadAction::Close),
            "delete-user" => Some(ThreadAction::DeleteUser),
            _ => None,
        }
    }

    pub fn notice(&self) -> &'static str {
        match self {
            ThreadAction::Close => "Conversation closed by the assistant",
            ThreadAction::DeleteUser => "Customer data deleted; the conversation was reset",
        }
    }
}

/// Pull whatever identifiers a reply carries. Both flat keys
/// (`thread_id`) and nested objects (`thread.id`) are recognised.
pub fn extract_context(reply: &Value) -> ConversationContext {
    ConversationContext {
        assistant_id: find_id(reply, "assistant_id", "assistant"),
        customer_id: find_id(reply, "customer_id", "customer"),
        company_id: find_id(reply, "company_id", "company"),
        thread_id: find_id(reply, "thread_id", "thread"),
        platform: find_string(reply, "platform", 0),
        external_customer_id: find_string(reply, "external_customer_id", 0),
        external_thread_id: find_string(reply, "external_thread_id", 0),
    }
}

/// First `action` field anywhere in the reply that names a known action.
pub fn extract_action(reply: &Value) -> Option<ThreadAction> {
    fn walk(value: &Value, depth: usize) -> Option<ThreadAction> {
        if depth > MAX_SEARCH_DEPTH {
            return None;
        }
        match value {
            Value::Object(obj) => {
                if let Some(action) = obj
                    .get("action")
                    .and_then(Value::as_str)
                    .and_then(ThreadAction::parse)
                {
                    return Some(action);
                }
                obj.values().find_map(|v| walk(v, depth + 1))
            }
            Value::Array(items) => items.iter().find_map(|v| walk(v, depth + 1)),
            _ => None,
        }
    }
    walk(reply, 0)
}

fn find_id(value: &Value, flat_key: &str, object_key: &str) -> Option<String> {
    find_string(value, flat_key, 0).or_else(|| find_nested_id(value, object_key, 0))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Keys at the current level win over nested ones.
fn find_string(value: &Value, key: &str, depth: usize) -> Option<String> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::Object(obj) => obj.get(key).and_then(scalar_to_string).or_else(|| {
            obj.values()
                .filter(|v| v.is_object())
                .find_map(|v| find_string(v, key, depth + 1))
        }),
        _ => None,
    }
}

fn find_nested_id(value: &Value, key: &str, depth: usize) -> Option<String> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::Object(obj) => obj
            .get(key)
            .and_then(|nested| nested.get("id"))
            .and_then(scalar_to_string)
            .or_else(|| {
                obj.values()
                    .filter(|v| v.is_object())
                    .find_map(|v| find_nested_id(v, key, depth + 1))
            }),
        _ => None,
    }
}
