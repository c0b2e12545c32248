//! Backend used when no remote service is configured.
//!
//! Every call fails with `RemoteError::Network`, so stores run purely on the
//! local mirror.

use super::{Filter, RemoteBackend, RemoteError, RemoteQuery, RemoteResult};
use serde_json::Value;

#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineBackend;

impl OfflineBackend {
    fn unavailable<T>(table: &str) -> RemoteResult<T> {
        Err(RemoteError::Network(format!(
            "no remote service configured for `{table}`"
        )))
    }
}

impl RemoteBackend for OfflineBackend {
    fn select(&self, query: &RemoteQuery) -> RemoteResult<Vec<Value>> {
        Self::unavailable(&query.table)
    }

    fn insert(&self, table: &str, _row: Value) -> RemoteResult<Value> {
        Self::unavailable(table)
    }

    fn update(&self, table: &str, _filters: &[Filter], _patch: Value) -> RemoteResult<usize> {
        Self::unavailable(table)
    }

    fn delete(&self, table: &str, _filters: &[Filter]) -> RemoteResult<usize> {
        Self::unavailable(table)
    }
}
