use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::models::{SimpleMessageRequest, SimpleMessageResponse};
use super::traits::Backend;
use super::types::{error_message, ApiError, Resource, SendOutcome};
use crate::models::RequestTrace;

/// HTTP client for the messaging backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn http(&self) -> Client {
        self.client.clone()
    }

    /// Join percent-encoded path segments onto the base URL.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn resource_url(&self, resource: &Resource) -> Result<Url, ApiError> {
        let mut url = self.endpoint(&resource.path_segments())?;
        let pairs = resource.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    pub fn stream_url(&self, thread_id: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint(&["v1", "stream"])?;
        url.query_pairs_mut().append_pair("session_id", thread_id);
        Ok(url)
    }

    /// Read a response body as JSON, falling back to the raw text.
    async fn read_body(response: reqwest::Response) -> Result<Value, ApiError> {
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to read body: {}", e)))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    async fn post_message(
        &self,
        url: &Url,
        request: &SimpleMessageRequest,
        trace: &mut RequestTrace,
    ) -> Result<Value, ApiError> {
        let response = match self.client.post(url.clone()).json(request).send().await {
            Ok(r) => r,
            Err(e) => {
                trace.finish(None, None);
                return Err(ApiError::Network(e.to_string()));
            }
        };

        let status = response.status();
        let body = match Self::read_body(response).await {
            Ok(body) => body,
            Err(e) => {
                trace.finish(Some(status.as_u16()), None);
                return Err(e);
            }
        };
        trace.finish(Some(status.as_u16()), Some(body.clone()));

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        if !body.is_object() {
            return Err(ApiError::InvalidResponse(
                "Expected a JSON object".to_string(),
            ));
        }

        let envelope: SimpleMessageResponse = serde_json::from_value(body.clone())
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        if envelope.success == Some(false) {
            let message = envelope
                .error
                .as_ref()
                .map(|e| match e {
                    Value::String(s) => s.clone(),
                    other => error_message(&serde_json::json!({ "error": other })),
                })
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(ApiError::Backend(message));
        }

        tracing::debug!(
            "Message accepted by provider {}",
            envelope.provider.as_deref().unwrap_or("unknown")
        );
        Ok(body)
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn send_simple_message(
        &self,
        company_id: &str,
        request: SimpleMessageRequest,
    ) -> SendOutcome {
        let url = match self.endpoint(&["v1", "messages", "simple", company_id]) {
            Ok(url) => url,
            Err(e) => {
                let mut trace = RequestTrace::start(
                    "POST",
                    self.base.as_str(),
                    serde_json::to_value(&request).ok(),
                );
                trace.finish(None, None);
                return SendOutcome {
                    trace,
                    result: Err(e),
                };
            }
        };

        let mut trace = RequestTrace::start(
            "POST",
            url.as_str(),
            serde_json::to_value(&request).ok(),
        );
        let result = self.post_message(&url, &request, &mut trace).await;
        if let Err(e) = &result {
            tracing::warn!("Send to {} failed: {}", url, e);
        }
        SendOutcome { trace, result }
    }

    async fn fetch(&self, resource: &Resource) -> Result<Value, ApiError> {
        let url = self.resource_url(resource)?;
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to connect to {}: {}", url, e)))?;

        let status = response.status();
        let body = Self::read_body(response).await?;
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(body)
    }
}
