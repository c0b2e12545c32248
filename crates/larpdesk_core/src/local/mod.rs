//! Durable local key-value tier.
//!
//! # Responsibility
//! - Define the string key → string value contract that mirrors remote data.
//! - Provide SQLite-backed and in-memory implementations.
//!
//! # Invariants
//! - Values are opaque strings; collections are stored as JSON arrays by
//!   `mirror` helpers, never by implementations of `LocalStore`.
//! - Writes are last-writer-wins; there is no cross-handle coordination.

use crate::db::DbError;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};

pub mod mirror;
pub mod sqlite_store;

pub use mirror::{read_collection, write_collection, MirrorError};
pub use sqlite_store::SqliteLocalStore;

pub type LocalResult<T> = Result<T, LocalStoreError>;

/// Local-tier failure.
#[derive(Debug)]
pub enum LocalStoreError {
    /// Underlying SQLite failure.
    Db(DbError),
    /// Write rejected because the store is out of space.
    QuotaExceeded { key: String, bytes: usize },
}

impl Display for LocalStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "local store failure: {err}"),
            Self::QuotaExceeded { key, bytes } => {
                write!(f, "local store quota exceeded writing {bytes} bytes to `{key}`")
            }
        }
    }
}

impl Error for LocalStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::QuotaExceeded { .. } => None,
        }
    }
}

impl From<DbError> for LocalStoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for LocalStoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistent per-profile key-value storage.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> LocalResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> LocalResult<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> LocalResult<()>;
    /// Keys starting with `prefix`, sorted ascending.
    fn keys(&self, prefix: &str) -> LocalResult<Vec<String>>;
}

/// Process-local store, optionally capped to emulate a storage quota.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: Mutex<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects writes once the sum of all values would exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> LocalResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> LocalResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(quota) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(_, stored)| stored.len())
                .sum();
            if others + value.len() > quota {
                return Err(LocalStoreError::QuotaExceeded {
                    key: key.to_string(),
                    bytes: value.len(),
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> LocalResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> LocalResult<Vec<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
