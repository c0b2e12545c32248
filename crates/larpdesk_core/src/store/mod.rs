//! Remote-first data stores with local-mirror fallback.
//!
//! # Responsibility
//! - Serve list/create/update/delete for one record type, preferring the
//!   remote table and degrading to the local mirror on any remote failure.
//! - Keep the per-viewer and public note collections consistent.
//!
//! # Invariants
//! - Remote failures are logged and reported as a `Notice`, never returned
//!   as errors.
//! - A successful remote list overwrites the mirror with exactly the rows
//!   returned.
//! - Locally written records are never replayed against the remote tier.

use crate::clock::Clock;
use crate::config::{ConsoleConfig, DEFAULT_LIST_COOLDOWN_SECS, DEFAULT_LIST_TIMEOUT_SECS};
use crate::local::{LocalStore, MirrorError};
use crate::model::entity::ValidationError;
use crate::remote::RemoteBackend;
use crate::session::SessionState;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

pub mod cooldown;
pub mod remote_first;
pub mod visibility;

pub use cooldown::ListCooldown;
pub use remote_first::RemoteFirstStore;

/// Collaborators shared by every store of one console instance.
#[derive(Clone)]
pub struct StoreDeps {
    pub remote: Arc<dyn RemoteBackend>,
    pub local: Arc<dyn LocalStore>,
    pub session: Arc<SessionState>,
    pub clock: Arc<dyn Clock>,
}

/// Per-store tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub list_cooldown: Duration,
    pub list_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            list_cooldown: Duration::from_secs(DEFAULT_LIST_COOLDOWN_SECS),
            list_timeout: Duration::from_secs(DEFAULT_LIST_TIMEOUT_SECS),
        }
    }
}

impl StoreOptions {
    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self {
            list_cooldown: config.list_cooldown(),
            list_timeout: config.list_timeout(),
        }
    }
}

/// Tier that produced a list result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Remote,
    Local,
    /// Cooldown short-circuit; in-memory items returned as-is.
    Cached,
}

/// Non-blocking message for the caller to surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SavedLocally,
    UpdatedLocally,
    DeletedLocally,
    /// Remote list failed; carries the remote error code.
    ServedFromLocal { reason: &'static str },
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SavedLocally => write!(f, "saved locally, will sync later"),
            Self::UpdatedLocally => write!(f, "updated locally, will sync later"),
            Self::DeletedLocally => write!(f, "deleted locally, will sync later"),
            Self::ServedFromLocal { reason } => {
                write!(f, "showing locally saved data ({reason})")
            }
        }
    }
}

/// Snapshot returned by `list`/`refresh`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResult<E> {
    pub items: Vec<E>,
    pub source: DataSource,
    pub loading: bool,
    pub notice: Option<Notice>,
    /// Set only when the local mirror could not be read either.
    pub error: Option<String>,
}

/// Failures a caller can observe from a store.
#[derive(Debug)]
pub enum StoreError {
    /// Payload rejected before any I/O.
    Validation(ValidationError),
    /// Remote failed and the local fallback write failed too.
    Local(MirrorError),
    Serialization(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Local(err) => write!(f, "local fallback failed: {err}"),
            Self::Serialization(err) => write!(f, "record serialization failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Local(err) => Some(err),
            Self::Serialization(err) => Some(err),
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<MirrorError> for StoreError {
    fn from(value: MirrorError) -> Self {
        Self::Local(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}
