//! Remote table service contract.
//!
//! # Responsibility
//! - Describe the hosted backend as authenticated table CRUD over JSON rows.
//! - Keep query shape (equality / `or` filters, ordering, timeout) explicit
//!   so stores never depend on a concrete SDK.
//!
//! # Invariants
//! - Every failure is a `RemoteError`; callers decide whether to fall back.
//! - `select` honours `RemoteQuery::timeout` when the backend can abort.

use chrono::DateTime;
use serde_json::Value;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub mod memory;
pub mod offline;

pub use memory::InMemoryBackend;
pub use offline::OfflineBackend;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote-tier failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Transport failure or service unreachable.
    Network(String),
    /// Request exceeded its deadline and was abandoned.
    Timeout { table: String, after: Duration },
    /// Table or schema does not exist on the backend.
    MissingTable(String),
    /// Row-level security or auth rejected the request.
    PermissionDenied(String),
    /// Backend answered with a payload that could not be decoded.
    InvalidResponse(String),
}

impl RemoteError {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout { .. } => "timeout",
            Self::MissingTable(_) => "missing_table",
            Self::PermissionDenied(_) => "permission_denied",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(f, "remote service unreachable: {message}"),
            Self::Timeout { table, after } => {
                write!(f, "query on `{table}` timed out after {}ms", after.as_millis())
            }
            Self::MissingTable(table) => write!(f, "remote table `{table}` does not exist"),
            Self::PermissionDenied(message) => write!(f, "remote permission denied: {message}"),
            Self::InvalidResponse(message) => write!(f, "invalid remote response: {message}"),
        }
    }
}

impl Error for RemoteError {}

/// Row filter understood by every backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`; a missing column compares as `null`.
    Eq { column: String, value: Value },
    /// Matches when any inner filter matches.
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Or(filters)
    }

    /// Evaluates the filter against one JSON row.
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Self::Eq { column, value } => row.get(column).unwrap_or(&Value::Null) == value,
            Self::Or(filters) => filters.iter().any(|filter| filter.matches(row)),
        }
    }
}

/// One ordering term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

/// Select request against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteQuery {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Vec<OrderBy>,
    pub timeout: Option<Duration>,
}

impl RemoteQuery {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: Vec::new(),
            timeout: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn order(mut self, order: impl IntoIterator<Item = OrderBy>) -> Self {
        self.order.extend(order);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns whether `row` satisfies every filter.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }
}

/// Authenticated table-oriented backend (the hosted service's client SDK).
pub trait RemoteBackend: Send + Sync {
    fn select(&self, query: &RemoteQuery) -> RemoteResult<Vec<Value>>;
    /// Inserts one row and returns it as stored (server id, timestamps).
    fn insert(&self, table: &str, row: Value) -> RemoteResult<Value>;
    /// Applies `patch` to every matching row; returns affected row count.
    fn update(&self, table: &str, filters: &[Filter], patch: Value) -> RemoteResult<usize>;
    /// Deletes every matching row; returns affected row count.
    fn delete(&self, table: &str, filters: &[Filter]) -> RemoteResult<usize>;
}

/// Orders two rows by the given terms; `null` sorts first ascending.
pub fn compare_rows(left: &Value, right: &Value, order: &[OrderBy]) -> Ordering {
    for term in order {
        let a = left.get(&term.column).unwrap_or(&Value::Null);
        let b = right.get(&term.column).unwrap_or(&Value::Null);
        let ordering = compare_values(a, b);
        let ordering = if term.ascending {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => compare_strings(x, y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Timestamps compare chronologically; their fractional digits vary.
fn compare_strings(x: &str, y: &str) -> Ordering {
    match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => x.cmp(y),
    }
}
