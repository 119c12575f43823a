//! Keyed string storage with time-to-live semantics

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::update::error::StoreError;

/// Durable keyed storage with expiry, shared across requests.
///
/// Concurrent writers race last-writer-wins; a lost write self-corrects
/// within one TTL window.
#[cfg_attr(test, automock)]
pub trait TransientStore: Send + Sync {
    /// Store `value` under `key` for at most `ttl`.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Read the value under `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// SQLite-backed store, the durable default.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        info!("Initializing transient store at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;

        debug!("Transient store initialized");
        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS transients (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_expires_at ON transients(expires_at)",
            [],
        )?;

        Ok(())
    }
}

impl TransientStore for SqliteStore {
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Utc::now().timestamp_millis() + ttl.as_millis() as i64;

        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO transients (key, value, expires_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
            (key, value, expires_at),
        )?;

        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Utc::now().timestamp_millis();

        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT value, expires_at FROM transients WHERE key = ?1",
            [key],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        );

        match result {
            Ok((value, expires_at)) if expires_at > now => Ok(Some(value)),
            Ok(_) => {
                // Expired entries are removed lazily on read.
                conn.execute(
                    "DELETE FROM transients WHERE key = ?1 AND expires_at <= ?2",
                    (key, now),
                )?;
                Ok(None)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store for single-process runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, i64)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransientStore for MemoryStore {
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Utc::now().timestamp_millis() + ttl.as_millis() as i64;
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Utc::now().timestamp_millis();
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > now => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
