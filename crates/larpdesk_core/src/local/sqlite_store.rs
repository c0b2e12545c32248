//! SQLite-backed local mirror storage.
//!
//! # Invariants
//! - One row per key in `kv_entries`; `set` is an upsert.
//! - Access through one handle is serialized by an internal mutex.
//! - A full disk is reported as `LocalStoreError::QuotaExceeded`.

use super::{LocalResult, LocalStore, LocalStoreError};
use crate::db::{open_db, open_db_in_memory};
use rusqlite::{params, Connection, ErrorCode};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Durable `LocalStore` persisted in a single SQLite file.
pub struct SqliteLocalStore {
    conn: Mutex<Connection>,
}

impl SqliteLocalStore {
    /// Opens the store file, creating and migrating it when needed.
    pub fn open(path: impl AsRef<Path>) -> LocalResult<Self> {
        Ok(Self {
            conn: Mutex::new(open_db(path)?),
        })
    }

    pub fn open_in_memory() -> LocalResult<Self> {
        Ok(Self {
            conn: Mutex::new(open_db_in_memory()?),
        })
    }
}

impl LocalStore for SqliteLocalStore {
    fn get(&self, key: &str) -> LocalResult<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare("SELECT value FROM kv_entries WHERE key = ?1;")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> LocalResult<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )
        .map_err(|err| map_write_error(err, key, value.len()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> LocalResult<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }

    fn keys(&self, prefix: &str) -> LocalResult<Vec<String>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare(
            "SELECT key FROM kv_entries
             WHERE substr(key, 1, length(?1)) = ?1
             ORDER BY key ASC;",
        )?;
        let mut rows = stmt.query([prefix])?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(row.get(0)?);
        }
        Ok(keys)
    }
}

fn map_write_error(err: rusqlite::Error, key: &str, bytes: usize) -> LocalStoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::DiskFull => {
            LocalStoreError::QuotaExceeded {
                key: key.to_string(),
                bytes,
            }
        }
        _ => err.into(),
    }
}
