//! JSON-array collections on top of `LocalStore`.
//!
//! A missing key reads as an empty collection. A value that is not a JSON
//! array of the expected record shape is reported as `MirrorError::Corrupt`
//! so callers can degrade instead of silently dropping data.

use super::{LocalStore, LocalStoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum MirrorError {
    Store(LocalStoreError),
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
}

impl Display for MirrorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Corrupt { key, source } => {
                write!(f, "local mirror `{key}` is unreadable: {source}")
            }
        }
    }
}

impl Error for MirrorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Corrupt { source, .. } => Some(source),
        }
    }
}

impl From<LocalStoreError> for MirrorError {
    fn from(value: LocalStoreError) -> Self {
        Self::Store(value)
    }
}

/// Reads one mirrored collection.
pub fn read_collection<T: DeserializeOwned>(
    store: &dyn LocalStore,
    key: &str,
) -> Result<Vec<T>, MirrorError> {
    match store.get(key)? {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw).map_err(|source| MirrorError::Corrupt {
            key: key.to_string(),
            source,
        }),
    }
}

/// Replaces one mirrored collection.
pub fn write_collection<T: Serialize>(
    store: &dyn LocalStore,
    key: &str,
    items: &[T],
) -> Result<(), MirrorError> {
    let raw = serde_json::to_string(items).map_err(|source| MirrorError::Corrupt {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{read_collection, write_collection, MirrorError};
    use crate::local::{LocalStore, MemoryLocalStore};

    #[test]
    fn missing_key_reads_as_empty() {
        let store = MemoryLocalStore::new();
        let items: Vec<i64> = read_collection(&store, "larp_campaigns").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn corrupt_value_is_reported() {
        let store = MemoryLocalStore::new();
        store.set("larp_campaigns", "{not json").unwrap();
        let err = read_collection::<i64>(&store, "larp_campaigns").unwrap_err();
        assert!(matches!(err, MirrorError::Corrupt { ref key, .. } if key == "larp_campaigns"));
    }

    #[test]
    fn written_collection_reads_back_in_order() {
        let store = MemoryLocalStore::new();
        write_collection(&store, "k", &[3_i64, 1, 2]).unwrap();
        assert_eq!(read_collection::<i64>(&store, "k").unwrap(), vec![3, 1, 2]);
    }
}
