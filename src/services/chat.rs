use std::sync::Arc;

use serde_json::Value;
use url::Url;

use super::answer::parse_answer;
use super::context::{extract_action, extract_context, ThreadAction};
use super::history::history_to_messages;
use super::inspector::error_value;
use crate::api::{ApiError, Backend, Resource, SimpleMessageRequest};
use crate::models::{AnswerSegment, ConversationContext, Message, RequestTrace, Role, Settings};

const EMPTY_REPLY_TEXT: &str = "(the reply carried no answer)";

/// Everything the chat view needs from one send, successful or not.
#[derive(Debug, Clone)]
pub struct ChatResult {
    /// Assistant reply, or a synthetic assistant message describing the failure.
    pub reply: Message,
    pub context: ConversationContext,
    pub action: Option<ThreadAction>,
    pub trace: RequestTrace,
    pub error: Option<String>,
}

pub fn build_request(settings: &Settings, text: &str) -> SimpleMessageRequest {
    SimpleMessageRequest {
        message: text.to_string(),
        customer_phone: settings.customer_phone.clone(),
        customer_name: settings.customer_name.clone(),
    }
}

/// Send one user message. Never fails: errors come back as a synthetic reply.
pub async fn send_message(
    backend: Arc<dyn Backend>,
    settings: Settings,
    text: String,
    location: Option<Url>,
) -> ChatResult {
    let request = build_request(&settings, &text);
    let outcome = backend
        .send_simple_message(&settings.company_id, request)
        .await;

    match outcome.result {
        Ok(body) => {
            let segments = parse_answer(&body, location.as_ref());
            let reply = if segments.is_empty() {
                tracing::warn!("Reply carried no answer segments");
                Message::assistant(vec![AnswerSegment::text(EMPTY_REPLY_TEXT)])
            } else {
                Message::assistant(segments)
            };
            ChatResult {
                reply: reply.with_trace(outcome.trace.clone()),
                context: extract_context(&body),
                action: extract_action(&body),
                trace: outcome.trace,
                error: None,
            }
        }
        Err(e) => {
            let error = e.to_string();
            let context = outcome
                .trace
                .response_body
                .as_ref()
                .map(extract_context)
                .unwrap_or_default();
            ChatResult {
                reply: Message::new(Role::Assistant, format!("Request failed: {}", error))
                    .with_trace(outcome.trace.clone()),
                context,
                action: None,
                trace: outcome.trace,
                error: Some(error),
            }
        }
    }
}

pub async fn load_history(
    backend: Arc<dyn Backend>,
    thread_id: String,
    location: Option<Url>,
) -> Result<Vec<Message>, ApiError> {
    let payload = backend
        .fetch(&Resource::ThreadMessages(thread_id.clone()))
        .await?;
    let messages = history_to_messages(&payload, location.as_ref());
    tracing::info!("Loaded {} messages for thread {}", messages.len(), thread_id);
    Ok(messages)
}

/// Inspector loads show failures as an error object instead of failing.
pub async fn load_resource(backend: Arc<dyn Backend>, resource: Resource) -> Value {
    match backend.fetch(&resource).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to load {}: {}", resource.title(), e);
            error_value(&e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::SendOutcome;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct FakeBackend {
        reply: Result<Value, ApiError>,
        sent: Mutex<Vec<(String, SimpleMessageRequest)>>,
        fetched: Mutex<Vec<Resource>>,
    }

    impl FakeBackend {
        fn new(reply: Result<Value, ApiError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                sent: Mutex::new(Vec::new()),
                fetched: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn send_simple_message(
            &self,
            company_id: &str,
            request: SimpleMessageRequest,
        ) -> SendOutcome {
            let mut trace = RequestTrace::start(
                "POST",
                &format!("http://test/v1/messages/simple/{}", company_id),
                serde_json::to_value(&request).ok(),
            );
            let body = match &self.reply {
                Ok(v) => Some(v.clone()),
                Err(ApiError::Backend(msg)) => Some(json!({"success": false, "error": msg})),
                Err(_) => None,
            };
            trace.finish(body.as_ref().map(|_| 200), body);
            self.sent
                .lock()
                .unwrap()
                .push((company_id.to_string(), request));
            SendOutcome {
                trace,
                result: self.reply.clone(),
            }
        }

        async fn fetch(&self, resource: &Resource) -> Result<Value, ApiError> {
            self.fetched.lock().unwrap().push(resource.clone());
            self.reply.clone()
        }
    }

    fn settings() -> Settings {
        Settings {
            company_id: "acme".into(),
            customer_phone: "+5511".into(),
            customer_name: Some("Ana".into()),
            api_base_url: None,
        }
    }

    #[tokio::test]
    async fn test_send_parses_reply_and_context() {
        let backend = FakeBackend::new(Ok(json!({
            "success": true,
            "provider": "openai",
            "data": {
                "thread_id": "thr_1",
                "disparo": {"answer": ["Hello", "How can I help?"]}
            }
        })));
        let result = send_message(backend.clone(), settings(), "hi".into(), None).await;

        assert!(result.error.is_none());
        assert_eq!(result.reply.role, Role::Assistant);
        assert_eq!(result.reply.segments.as_ref().map(Vec::len), Some(2));
        assert!(result.reply.trace.is_some());
        assert_eq!(result.context.thread_id.as_deref(), Some("thr_1"));
        assert_eq!(result.action, None);

        let sent = backend.sent.lock().unwrap();
        assert_eq!(sent[0].0, "acme");
        assert_eq!(sent[0].1.message, "hi");
        assert_eq!(sent[0].1.customer_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_send_failure_becomes_synthetic_reply() {
        let backend = FakeBackend::new(Err(ApiError::Backend("company disabled".into())));
        let result = send_message(backend, settings(), "hi".into(), None).await;

        assert_eq!(
            result.error.as_deref(),
            Some("Backend reported failure: company disabled")
        );
        assert_eq!(result.reply.role, Role::Assistant);
        assert!(result.reply.text.contains("company disabled"));
        let trace = result.reply.trace.expect("failed reply keeps its trace");
        assert_eq!(trace.status, Some(200));
        assert!(trace.request_body.is_some());
    }

    #[tokio::test]
    async fn test_send_with_empty_answer() {
        let backend = FakeBackend::new(Ok(json!({"success": true, "data": {}})));
        let result = send_message(backend, settings(), "hi".into(), None).await;
        assert_eq!(result.reply.text, EMPTY_REPLY_TEXT);
    }

    #[tokio::test]
    async fn test_load_history_uses_thread_resource() {
        let backend = FakeBackend::new(Ok(json!([
            {"role": "user", "content": "hello", "created_at": "2025-01-01T00:00:00Z"}
        ])));
        let messages = load_history(backend.clone(), "thr_9".into(), None)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            backend.fetched.lock().unwrap().as_slice(),
            &[Resource::ThreadMessages("thr_9".into())]
        );
    }

    #[tokio::test]
    async fn test_load_resource_failure_is_error_object() {
        let backend = FakeBackend::new(Err(ApiError::Http {
            status: 404,
            message: "not found".into(),
        }));
        let value = load_resource(backend, Resource::Company("x".into())).await;
        assert_eq!(value, json!({"error": "HTTP 404: not found"}));
    }
}
