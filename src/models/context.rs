use serde::{Deserialize, Serialize};

/// Identifiers picked up from backend replies. Purely a cache for the
/// inspector panel and thread tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub assistant_id: Option<String>,
    pub customer_id: Option<String>,
    pub company_id: Option<String>,
    pub thread_id: Option<String>,
    pub platform: Option<String>,
    pub external_customer_id: Option<String>,
    pub external_thread_id: Option<String>,
}

impl ConversationContext {
    /// Overlay fields present in `newer`; absent ones keep their cached value.
    pub fn merge(&mut self, newer: ConversationContext) {
        fn take(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.assistant_id, newer.assistant_id);
        take(&mut self.customer_id, newer.customer_id);
        take(&mut self.company_id, newer.company_id);
        take(&mut self.thread_id, newer.thread_id);
        take(&mut self.platform, newer.platform);
        take(&mut self.external_customer_id, newer.external_customer_id);
        take(&mut self.external_thread_id, newer.external_thread_id);
    }

    pub fn is_empty(&self) -> bool {
        *self == ConversationContext::default()
    }
}
