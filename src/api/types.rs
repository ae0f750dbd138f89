use serde_json::Value;
use thiserror::Error;

use crate::models::RequestTrace;

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Backend reported failure: {0}")]
    Backend(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Read-only lookups used by the inspector panel and thread resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Companies,
    Company(String),
    Customer(String),
    Assistant(String),
    ThreadMessages(String),
    OpenThread {
        company_id: String,
        customer_phone: String,
    },
}

impl Resource {
    pub fn path_segments(&self) -> Vec<&str> {
        match self {
            Resource::Companies => vec!["v1", "companies"],
            Resource::Company(id) => vec!["v1", "companies", id.as_str()],
            Resource::Customer(id) => vec!["v1", "customers", id.as_str()],
            Resource::Assistant(id) => vec!["v1", "assistants", id.as_str()],
            Resource::ThreadMessages(id) => vec!["v1", "threads", id.as_str(), "messages"],
            Resource::OpenThread { .. } => vec!["v1", "threads", "open"],
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        match self {
            Resource::OpenThread {
                company_id,
                customer_phone,
            } => vec![
                ("company_id", company_id.as_str()),
                ("customer_phone", customer_phone.as_str()),
            ],
            _ => Vec::new(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            Resource::Companies => "Companies".to_string(),
            Resource::Company(id) => format!("Company {}", id),
            Resource::Customer(id) => format!("Customer {}", id),
            Resource::Assistant(id) => format!("Assistant {}", id),
            Resource::ThreadMessages(id) => format!("Thread {}", id),
            Resource::OpenThread { customer_phone, .. } => {
                format!("Open thread for {}", customer_phone)
            }
        }
    }
}

/// Result of a message send. The trace is kept even when the send failed so
/// the failed exchange can still be inspected.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub trace: RequestTrace,
    pub result: Result<Value, ApiError>,
}

/// Best-effort human-readable message from an error body.
pub fn error_message(body: &Value) -> String {
    let candidates = [
        body.get("error").and_then(|e| e.get("message")),
        body.get("error"),
        body.get("detail"),
        body.get("message"),
    ];
    for candidate in candidates.into_iter().flatten() {
        match candidate {
            Value::String(s) if !s.trim().is_empty() => return s.clone(),
            Value::Null => continue,
            Value::String(_) => continue,
            other if !other.is_object() => return other.to_string(),
            _ => continue,
        }
    }
    match body {
        Value::String(s) if !s.is_empty() => truncate(s, 200),
        Value::Null => "Request failed".to_string(),
        other => truncate(&other.to_string(), 200),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}
