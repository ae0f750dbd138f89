use async_trait::async_trait;
use serde_json::Value;

use super::models::SimpleMessageRequest;
use super::types::{ApiError, Resource, SendOutcome};

#[async_trait]
pub trait Backend: std::fmt::Debug + Send + Sync {
    async fn send_simple_message(
        &self,
        company_id: &str,
        request: SimpleMessageRequest,
    ) -> SendOutcome;

    async fn fetch(&self, resource: &Resource) -> Result<Value, ApiError>;
}
