use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifiers collected at onboarding and reused on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub company_id: String,
    pub customer_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("Company ID is required")]
    MissingCompanyId,

    #[error("Customer phone is required")]
    MissingPhone,
}

impl Settings {
    /// Build settings from raw form input. Required fields are trimmed,
    /// blank optional fields become `None`.
    pub fn from_form(
        company_id: &str,
        customer_phone: &str,
        customer_name: &str,
        api_base_url: &str,
    ) -> Result<Self, SettingsError> {
        let company_id = company_id.trim();
        if company_id.is_empty() {
            return Err(SettingsError::MissingCompanyId);
        }
        let customer_phone = customer_phone.trim();
        if customer_phone.is_empty() {
            return Err(SettingsError::MissingPhone);
        }

        Ok(Self {
            company_id: company_id.to_string(),
            customer_phone: customer_phone.to_string(),
            customer_name: non_blank(customer_name),
            api_base_url: non_blank(api_base_url).map(|s| s.trim_end_matches('/').to_string()),
        })
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_form_trims_and_drops_blanks() {
        let settings = Settings::from_form(" acme ", " +5511999990000", "  ", "http://api.local/")
            .unwrap();
        assert_eq!(settings.company_id, "acme");
        assert_eq!(settings.customer_phone, "+5511999990000");
        assert_eq!(settings.customer_name, None);
        assert_eq!(settings.api_base_url.as_deref(), Some("http://api.local"));
    }

    #[test]
    fn test_from_form_requires_ids() {
        assert_eq!(
            Settings::from_form("", "123", "", ""),
            Err(SettingsError::MissingCompanyId)
        );
        assert_eq!(
            Settings::from_form("acme", " ", "", ""),
            Err(SettingsError::MissingPhone)
        );
    }
}
