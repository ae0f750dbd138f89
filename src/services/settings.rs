use anyhow::Result;

use super::database::Database;
use crate::config::SETTINGS_NAMESPACE;
use crate::models::Settings;

/// Persists the last-used settings under a fixed namespace.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// A missing or unreadable record loads as `None`.
    pub async fn load(&self) -> Result<Option<Settings>> {
        let Some(json) = self.db.get_item(SETTINGS_NAMESPACE).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(settings) => Ok(Some(settings)),
            Err(e) => {
                tracing::warn!("Discarding unreadable settings record: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.db.set_item(SETTINGS_NAMESPACE, &json).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.db.remove_item(SETTINGS_NAMESPACE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Settings {
        Settings {
            company_id: "acme".to_string(),
            customer_phone: "+5511999990000".to_string(),
            customer_name: Some("Ana".to_string()),
            api_base_url: Some("https://api.example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = SettingsStore::new(Database::new_in_memory().unwrap());
        assert!(store.load().await.unwrap().is_none());

        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(sample()));
    }

    #[tokio::test]
    async fn test_round_trip_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        let minimal = Settings {
            customer_name: None,
            api_base_url: None,
            ..sample()
        };
        SettingsStore::new(Database::open(&path).unwrap())
            .save(&minimal)
            .await
            .unwrap();

        let store = SettingsStore::new(Database::open(&path).unwrap());
        assert_eq!(store.load().await.unwrap(), Some(minimal));
    }

    #[tokio::test]
    async fn test_clear() {
        let store = SettingsStore::new(Database::new_in_memory().unwrap());
        store.save(&sample()).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_loads_as_none() {
        let db = Database::new_in_memory().unwrap();
        db.set_item(SETTINGS_NAMESPACE, "{not json").await.unwrap();
        let store = SettingsStore::new(db);
        assert!(store.load().await.unwrap().is_none());
    }
}
