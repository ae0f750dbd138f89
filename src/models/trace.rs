use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request/response pair captured for the inspector panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTrace {
    pub method: String,
    pub url: String,
    pub request_body: Option<Value>,
    pub status: Option<u16>,
    pub response_body: Option<Value>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl RequestTrace {
    pub fn start(method: &str, url: &str, request_body: Option<Value>) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            request_body,
            status: None,
            response_body: None,
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    pub fn finish(&mut self, status: Option<u16>, response_body: Option<Value>) {
        self.status = status;
        self.response_body = response_body;
        let elapsed = Utc::now() - self.started_at;
        self.elapsed_ms = elapsed.num_milliseconds().max(0) as u64;
    }

    pub fn request_json(&self) -> Value {
        serde_json::json!({
            "method": self.method,
            "url": self.url,
            "body": self.request_body,
        })
    }

    pub fn response_json(&self) -> Value {
        serde_json::json!({
            "status": self.status,
            "elapsed_ms": self.elapsed_ms,
            "body": self.response_body,
        })
    }
}
