//! Durable key/value storage for the set of seen vessels.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::{
    errors::PersistenceError,
    models::{Mmsi, SeenSet},
};

/// Key under which the seen MMSIs are stored
pub const SEEN_KEY: &str = "seen_mmsi";

/// Single-table key/value store on SQLite
///
/// Opening never fails: if the database cannot be opened the store is
/// disabled and every operation reports [`PersistenceError::Unavailable`].
#[derive(Clone)]
pub struct KvStore {
    pool: Option<SqlitePool>,
}

impl KvStore {
    /// Open or create the store at `path`
    pub async fn open(path: &Path) -> Self {
        match Self::open_pool(path).await {
            Ok(pool) => {
                info!("Opened store at {}", path.display());
                Self { pool: Some(pool) }
            }
            Err(e) => {
                warn!(
                    "Failed to open store at {}: {}; continuing without persistence",
                    path.display(),
                    e
                );
                Self::disabled()
            }
        }
    }

    /// Store that persists nothing
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    pub fn is_available(&self) -> bool {
        self.pool.is_some()
    }

    async fn open_pool(path: &Path) -> Result<SqlitePool, PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistenceError::DatabaseError(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(pool)
    }

    fn pool(&self) -> Result<&SqlitePool, PersistenceError> {
        self.pool.as_ref().ok_or(PersistenceError::Unavailable)
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool()?)
            .await?;
        Ok(row.map(|r| r.get("value")))
    }

    pub async fn put(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool()?)
        .await?;
        Ok(())
    }
}

/// Seen-set persistence on top of [`KvStore`]
#[derive(Clone)]
pub struct SeenStore {
    kv: KvStore,
}

impl SeenStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// Load the seen set, falling back to empty on any failure
    pub async fn load(&self) -> SeenSet {
        match self.try_load().await {
            Ok(seen) => {
                info!("Loaded {} seen vessels", seen.len());
                seen
            }
            Err(PersistenceError::Unavailable) => SeenSet::new(),
            Err(e) => {
                warn!("Could not load seen vessels, starting empty: {}", e);
                SeenSet::new()
            }
        }
    }

    async fn try_load(&self) -> Result<SeenSet, PersistenceError> {
        let Some(raw) = self.kv.get(SEEN_KEY).await? else {
            return Ok(SeenSet::new());
        };
        let values: Vec<u32> = serde_json::from_str(&raw)?;
        values
            .into_iter()
            .map(|v| {
                Mmsi::try_from(v).map_err(|_| {
                    PersistenceError::CorruptValue(serde::de::Error::custom(format!(
                        "invalid MMSI {}",
                        v
                    )))
                })
            })
            .collect()
    }

    /// Write the seen set. Failures are logged and otherwise ignored.
    pub async fn persist(&self, seen: &SeenSet) {
        if let Err(e) = self.try_persist(seen).await {
            match e {
                PersistenceError::Unavailable => debug!("Store disabled, seen set not persisted"),
                e => warn!("Failed to persist seen vessels: {}", e),
            }
        }
    }

    async fn try_persist(&self, seen: &SeenSet) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(&seen.to_sorted_values())?;
        self.kv.put(SEEN_KEY, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn mmsi(v: u32) -> Mmsi {
        Mmsi::try_from(v).unwrap()
    }

    #[tokio::test]
    async fn test_persist_and_reload() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("seen.db");

        let store = SeenStore::new(KvStore::open(&path).await);
        assert!(store.load().await.is_empty());

        let seen: SeenSet = [mmsi(257000001), mmsi(123456)].into_iter().collect();
        store.persist(&seen).await;

        // Simulate a restart
        let reopened = SeenStore::new(KvStore::open(&path).await);
        assert_eq!(reopened.load().await, seen);
    }

    #[tokio::test]
    async fn test_stored_as_sorted_json_array() {
        let temp_dir = tempdir().unwrap();
        let kv = KvStore::open(&temp_dir.path().join("seen.db")).await;
        let store = SeenStore::new(kv.clone());

        let seen: SeenSet = [mmsi(30), mmsi(10), mmsi(20)].into_iter().collect();
        store.persist(&seen).await;

        assert_eq!(kv.get(SEEN_KEY).await.unwrap().as_deref(), Some("[10,20,30]"));
    }

    #[tokio::test]
    async fn test_corrupt_value_loads_empty() {
        let temp_dir = tempdir().unwrap();
        let kv = KvStore::open(&temp_dir.path().join("seen.db")).await;
        let store = SeenStore::new(kv.clone());

        for corrupt in ["not json", r#"{"a":1}"#, r#"["x"]"#, "[1, 2000000000]"] {
            kv.put(SEEN_KEY, corrupt).await.unwrap();
            assert!(store.load().await.is_empty(), "{} should load empty", corrupt);
        }
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades() {
        let temp_dir = tempdir().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let kv = KvStore::open(&blocker.join("seen.db")).await;
        assert!(!kv.is_available());

        let store = SeenStore::new(kv);
        store.persist(&[mmsi(1)].into_iter().collect()).await;
        assert!(store.load().await.is_empty());
    }
}
