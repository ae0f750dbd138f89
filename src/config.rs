use std::time::Duration;

pub const APP_ID: &str = "com.chatprobe.ChatProbe";
pub const APP_NAME: &str = "Chat Probe";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Scheme and host of the session location shown in the header bar.
pub const LOCATION_BASE: &str = "chatprobe://chat";

/// Key of the single persisted settings record.
pub const SETTINGS_NAMESPACE: &str = "chatprobe.settings";

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const API_BASE_ENV: &str = "CHATPROBE_API_BASE";

/// Delay before the push channel reconnects when the server gave no `retry:`.
pub const PUSH_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Window in which a pushed message identical to the last appended one is dropped.
pub const PUSH_DEDUP_WINDOW: Duration = Duration::from_secs(5);

pub const INSPECTOR_MAX_DEPTH: usize = 8;

/// Resolve the backend base URL: explicit setting, then environment, then default.
pub fn resolve_api_base(configured: Option<&str>) -> String {
    configured
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| {
            std::env::var(API_BASE_ENV)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_base_wins_and_is_trimmed() {
        assert_eq!(
            resolve_api_base(Some(" https://api.example.com/ ")),
            "https://api.example.com"
        );
    }

    #[test]
    fn test_blank_base_falls_through() {
        let resolved = resolve_api_base(Some("   "));
        assert!(!resolved.is_empty());
        assert!(!resolved.ends_with('/'));
    }
}
