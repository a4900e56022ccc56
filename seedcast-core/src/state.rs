//! Persisted application state: a thin SQLite key-value layer.
//!
//! Holds the scalar state the service exposes over HTTP: the current magnet
//! URI and the view counter. Values are stored JSON-encoded so both strings
//! and integers round-trip through one TEXT column.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::Connection;
use serde_json::Value;

use crate::fsutil::sanitize_path;

/// Key under which the view counter is stored.
pub const KEY_VIEWS: &str = "views";
/// Key under which the current magnet URI is stored.
pub const KEY_MAGNET_URI: &str = "magnetURI";

/// Errors raised by the state store.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The backing database could not be opened. Fatal at startup.
    #[error("failed to open state database {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// A statement against the open database failed.
    #[error("state database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored value could not be encoded or decoded.
    #[error("state value codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Persisted key-value store for application state.
///
/// Thread-safe: the inner SQLite connection is protected by a `Mutex`, which
/// also serializes `atomic_add` against concurrent callers.
pub struct AppStateStore {
    table: String,
    conn: Mutex<Connection>,
}

impl AppStateStore {
    /// Opens (or creates) the store at `db_path`.
    ///
    /// The table identifier is sanitized before it is interpolated into the
    /// schema statement, since SQLite identifiers cannot be bound as
    /// parameters.
    ///
    /// # Errors
    /// - `StateError::Open` - The database file could not be opened or the
    ///   schema could not be created. The process cannot serve state-backed
    ///   endpoints without the store, so callers treat this as fatal.
    pub fn open(db_path: &Path, table: &str) -> Result<Self, StateError> {
        let conn = Connection::open(db_path).map_err(|source| StateError::Open {
            path: db_path.to_path_buf(),
            source,
        })?;

        let table = sanitize_path(table);
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );"
        ))
        .map_err(|source| StateError::Open {
            path: db_path.to_path_buf(),
            source,
        })?;

        tracing::info!(db = %db_path.display(), table = %table, "state store opened");

        Ok(Self {
            table,
            conn: Mutex::new(conn),
        })
    }

    /// Returns the stored value for `key`, or `None` if absent.
    ///
    /// # Errors
    /// - `StateError::Sqlite` - Query failed
    /// - `StateError::Codec` - Stored text is not valid JSON
    pub fn get(&self, key: &str) -> Result<Option<Value>, StateError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT value FROM \"{}\" WHERE key = ?1",
            self.table
        ))?;
        let row: Option<String> = match stmt.query_row([key], |row| row.get(0)) {
            Ok(text) => Some(text),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };
        match row {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Returns the stored integer for `key`, or `default` when the key is
    /// absent or holds a non-integer value.
    ///
    /// # Errors
    /// - `StateError::Sqlite` - Query failed
    pub fn get_i64(&self, key: &str, default: i64) -> Result<i64, StateError> {
        Ok(self
            .get(key)?
            .and_then(|value| value.as_i64())
            .unwrap_or(default))
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// - `StateError::Sqlite` - Statement failed
    /// - `StateError::Codec` - Value could not be encoded
    pub fn set(&self, key: &str, value: &Value) -> Result<(), StateError> {
        let text = serde_json::to_string(value)?;
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO \"{}\" (key, value) VALUES (?1, ?2)",
                self.table
            ),
            rusqlite::params![key, text],
        )?;
        Ok(())
    }

    /// Atomically adds `delta` to the integer stored under `key`.
    ///
    /// A missing key behaves as 0 before the add. The read-modify-write runs
    /// inside a single transaction while holding the connection lock, so
    /// concurrent increments never lose updates.
    ///
    /// # Errors
    /// - `StateError::Sqlite` - Transaction failed
    pub fn atomic_add(&self, key: &str, delta: i64) -> Result<(), StateError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let current: Option<String> = match tx.query_row(
            &format!("SELECT value FROM \"{}\" WHERE key = ?1", self.table),
            [key],
            |row| row.get(0),
        ) {
            Ok(text) => Some(text),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };
        let current = current
            .as_deref()
            .and_then(|text| serde_json::from_str::<Value>(text).ok())
            .and_then(|value| value.as_i64())
            .unwrap_or(0);
        tx.execute(
            &format!(
                "INSERT OR REPLACE INTO \"{}\" (key, value) VALUES (?1, ?2)",
                self.table
            ),
            rusqlite::params![key, (current + delta).to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Removes all keys.
    ///
    /// # Errors
    /// - `StateError::Sqlite` - Statement failed
    pub fn clear(&self) -> Result<(), StateError> {
        let conn = self.conn.lock();
        conn.execute(&format!("DELETE FROM \"{}\"", self.table), [])?;
        Ok(())
    }

    /// Returns every stored key and value, for diagnostic reporting.
    ///
    /// # Errors
    /// - `StateError::Sqlite` - Query failed
    /// - `StateError::Codec` - A stored value is not valid JSON
    pub fn snapshot(&self) -> Result<BTreeMap<String, Value>, StateError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT key, value FROM \"{}\"", self.table))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = BTreeMap::new();
        for row in rows {
            let (key, text) = row?;
            out.insert(key, serde_json::from_str(&text)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn open_store(dir: &TempDir) -> AppStateStore {
        AppStateStore::open(&dir.path().join("app.sqlite"), "app").unwrap()
    }

    #[test]
    fn test_get_missing_key_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(store.get(KEY_MAGNET_URI).unwrap().is_none());
        assert_eq!(store.get_i64(KEY_VIEWS, 0).unwrap(), 0);
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.set(KEY_MAGNET_URI, &json!("magnet:?xt=abc")).unwrap();
        assert_eq!(
            store.get(KEY_MAGNET_URI).unwrap(),
            Some(json!("magnet:?xt=abc"))
        );
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir);
            store.set(KEY_VIEWS, &json!(7)).unwrap();
        }
        let store = open_store(&dir);
        assert_eq!(store.get_i64(KEY_VIEWS, 0).unwrap(), 7);
    }

    #[test]
    fn test_atomic_add_from_missing_key() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.atomic_add(KEY_VIEWS, 1).unwrap();
        assert_eq!(store.get_i64(KEY_VIEWS, 0).unwrap(), 1);
    }

    #[test]
    fn test_concurrent_atomic_add_loses_no_updates() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open_store(&dir));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        store.atomic_add(KEY_VIEWS, 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get_i64(KEY_VIEWS, 0).unwrap(), 100);
    }

    #[test]
    fn test_clear_removes_all_keys() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.set(KEY_MAGNET_URI, &json!("magnet:?xt=abc")).unwrap();
        store.atomic_add(KEY_VIEWS, 3).unwrap();
        store.clear().unwrap();
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_lists_everything() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.set(KEY_MAGNET_URI, &json!("magnet:?xt=abc")).unwrap();
        store.atomic_add(KEY_VIEWS, 2).unwrap();
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[KEY_MAGNET_URI], json!("magnet:?xt=abc"));
    }

    #[test]
    fn test_table_name_is_sanitized() {
        let dir = TempDir::new().unwrap();
        let store =
            AppStateStore::open(&dir.path().join("app.sqlite"), "app\"; DROP TABLE x;--").unwrap();
        store.set("k", &json!(1)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!(1)));
    }
}
