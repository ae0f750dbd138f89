use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;

/// Local key/value storage. Each key is a namespace holding one serialized record.
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub async fn new() -> Result<Self> {
        let path = Self::db_path()?;
        task::spawn_blocking(move || Self::open(&path)).await?
    }

    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        tracing::info!("Opened local storage at {}", path.display());
        Ok(db)
    }

    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn db_path() -> Result<PathBuf> {
        let data_dir = match std::env::var("XDG_DATA_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                let home = std::env::var("HOME").context("Neither XDG_DATA_HOME nor HOME is set")?;
                PathBuf::from(home).join(".local/share")
            }
        };
        Ok(data_dir.join("chatprobe").join("chatprobe.db"))
    }

    fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
        conn.lock().map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = Self::lock(&self.conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            );",
        )?;

        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE local_storage (
                    namespace TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                INSERT INTO schema_version (version) VALUES (1);",
            )?;
        }

        Ok(())
    }

    pub async fn get_item(&self, namespace: &str) -> Result<Option<String>> {
        let conn = self.conn.clone();
        let namespace = namespace.to_string();
        task::spawn_blocking(move || {
            let conn = Self::lock(&conn)?;
            let result: Option<String> = conn
                .query_row(
                    "SELECT value FROM local_storage WHERE namespace = ?1",
                    params![namespace],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(result)
        })
        .await?
    }

    pub async fn set_item(&self, namespace: &str, value: &str) -> Result<()> {
        let conn = self.conn.clone();
        let namespace = namespace.to_string();
        let value = value.to_string();
        task::spawn_blocking(move || {
            let conn = Self::lock(&conn)?;
            conn.execute(
                "INSERT INTO local_storage (namespace, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(namespace) DO UPDATE SET value = ?2, updated_at = ?3",
                params![namespace, value, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await?
    }

    pub async fn remove_item(&self, namespace: &str) -> Result<()> {
        let conn = self.conn.clone();
        let namespace = namespace.to_string();
        task::spawn_blocking(move || {
            let conn = Self::lock(&conn)?;
            conn.execute(
                "DELETE FROM local_storage WHERE namespace = ?1",
                params![namespace],
            )?;
            Ok(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_initialization() {
        let db = Database::new_in_memory().unwrap();
        assert!(db.get_item("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_item_crud() {
        let db = Database::new_in_memory().unwrap();

        db.set_item("ns", "one").await.unwrap();
        assert_eq!(db.get_item("ns").await.unwrap().as_deref(), Some("one"));

        db.set_item("ns", "two").await.unwrap();
        assert_eq!(db.get_item("ns").await.unwrap().as_deref(), Some("two"));

        db.remove_item("ns").await.unwrap();
        assert!(db.get_item("ns").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reopen_keeps_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");

        let db = Database::open(&path).unwrap();
        db.set_item("ns", "kept").await.unwrap();
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.get_item("ns").await.unwrap().as_deref(), Some("kept"));
    }
}
