//! In-process table backend.
//!
//! Behaves like the hosted service for development and tests: assigns
//! sequential server ids, stamps `created_at`/`updated_at`, and can be
//! switched offline or given an artificial query latency that trips the
//! caller's timeout.

use super::{compare_rows, Filter, RemoteBackend, RemoteError, RemoteQuery, RemoteResult};
use crate::clock::{Clock, SystemClock};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct Tables {
    rows: BTreeMap<String, Vec<Value>>,
    next_id: i64,
    missing: BTreeSet<String>,
    latency: Option<Duration>,
}

/// Table service kept entirely in memory.
pub struct InMemoryBackend {
    tables: Mutex<Tables>,
    online: AtomicBool,
    select_calls: AtomicUsize,
    write_calls: AtomicUsize,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl InMemoryBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Mutex::new(Tables {
                next_id: 1,
                ..Tables::default()
            }),
            online: AtomicBool::new(true),
            select_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
            clock,
        }
    }

    /// Toggles simulated connectivity.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Makes every request against `table` fail with `MissingTable`.
    pub fn drop_table(&self, table: &str) {
        let mut tables = self.lock();
        tables.missing.insert(table.to_string());
        tables.rows.remove(table);
    }

    /// Simulated server-side query duration compared against query timeouts.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// Number of `select` calls received, including failed ones.
    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    /// Number of insert/update/delete calls received, including failed ones.
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of a table, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().rows.get(table).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_available(&self, tables: &Tables, table: &str) -> RemoteResult<()> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("backend is offline".to_string()));
        }
        if tables.missing.contains(table) {
            return Err(RemoteError::MissingTable(table.to_string()));
        }
        Ok(())
    }

    fn timestamp(&self) -> Value {
        serde_json::to_value(self.clock.now()).unwrap_or(Value::Null)
    }
}

impl RemoteBackend for InMemoryBackend {
    fn select(&self, query: &RemoteQuery) -> RemoteResult<Vec<Value>> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        let tables = self.lock();
        self.ensure_available(&tables, &query.table)?;

        if let (Some(latency), Some(timeout)) = (tables.latency, query.timeout) {
            if latency > timeout {
                return Err(RemoteError::Timeout {
                    table: query.table.clone(),
                    after: timeout,
                });
            }
        }

        let mut rows: Vec<Value> = tables
            .rows
            .get(&query.table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| compare_rows(a, b, &query.order));
        Ok(rows)
    }

    fn insert(&self, table: &str, row: Value) -> RemoteResult<Value> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.lock();
        self.ensure_available(&tables, table)?;

        let Value::Object(mut fields) = row else {
            return Err(RemoteError::InvalidResponse(format!(
                "insert into `{table}` expects a JSON object"
            )));
        };
        let id = tables.next_id;
        tables.next_id += 1;
        let now = self.timestamp();
        fields.insert("id".to_string(), Value::from(id));
        fields.insert("created_at".to_string(), now.clone());
        fields.insert("updated_at".to_string(), now);

        let stored = Value::Object(fields);
        tables
            .rows
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    fn update(&self, table: &str, filters: &[Filter], patch: Value) -> RemoteResult<usize> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.timestamp();
        let mut tables = self.lock();
        self.ensure_available(&tables, table)?;

        let Value::Object(patch) = patch else {
            return Err(RemoteError::InvalidResponse(format!(
                "update on `{table}` expects a JSON object"
            )));
        };
        let mut affected = 0;
        for row in tables.rows.entry(table.to_string()).or_default().iter_mut() {
            if !filters.iter().all(|filter| filter.matches(row)) {
                continue;
            }
            if let Value::Object(fields) = row {
                overlay(fields, &patch);
                fields.insert("updated_at".to_string(), now.clone());
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn delete(&self, table: &str, filters: &[Filter]) -> RemoteResult<usize> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.lock();
        self.ensure_available(&tables, table)?;

        let rows = tables.rows.entry(table.to_string()).or_default();
        let before = rows.len();
        rows.retain(|row| !filters.iter().all(|filter| filter.matches(row)));
        Ok(before - rows.len())
    }
}

fn overlay(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryBackend;
    use crate::remote::{Filter, OrderBy, RemoteBackend, RemoteError, RemoteQuery};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn insert_assigns_sequential_ids_and_timestamps() {
        let backend = InMemoryBackend::default();
        let first = backend.insert("campaigns", json!({"title": "A"})).unwrap();
        let second = backend.insert("campaigns", json!({"title": "B"})).unwrap();
        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));
        assert!(first["created_at"].is_string());
    }

    #[test]
    fn offline_backend_rejects_every_call() {
        let backend = InMemoryBackend::default();
        backend.set_online(false);
        let err = backend.select(&RemoteQuery::table("plots")).unwrap_err();
        assert_eq!(err.code(), "network");
        assert_eq!(backend.select_calls(), 1);
    }

    #[test]
    fn latency_beyond_timeout_reports_timeout() {
        let backend = InMemoryBackend::default();
        backend.set_latency(Some(Duration::from_secs(6)));
        let err = backend
            .select(&RemoteQuery::table("events").timeout(Duration::from_secs(5)))
            .unwrap_err();
        assert!(matches!(err, RemoteError::Timeout { .. }));
    }

    #[test]
    fn update_and_delete_respect_filters() {
        let backend = InMemoryBackend::default();
        backend
            .insert("notes", json!({"title": "mine", "author_id": "u1"}))
            .unwrap();
        backend
            .insert("notes", json!({"title": "theirs", "author_id": "u2"}))
            .unwrap();

        let changed = backend
            .update(
                "notes",
                &[Filter::eq("id", 2), Filter::eq("author_id", "u1")],
                json!({"title": "hijacked"}),
            )
            .unwrap();
        assert_eq!(changed, 0);

        let removed = backend.delete("notes", &[Filter::eq("id", 1)]).unwrap();
        assert_eq!(removed, 1);

        let rows = backend
            .select(&RemoteQuery::table("notes").order([OrderBy::asc("id")]))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], json!("theirs"));
    }
}
