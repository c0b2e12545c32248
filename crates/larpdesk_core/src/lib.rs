//! Core domain logic for LarpDesk.
//! Campaign data is served remote-first and degrades to a local mirror.

pub mod clock;
pub mod config;
pub mod db;
pub mod local;
pub mod logging;
pub mod model;
pub mod permission;
pub mod remote;
pub mod service;
pub mod session;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ConsoleConfig};
pub use local::{LocalStore, LocalStoreError, MemoryLocalStore, SqliteLocalStore};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::entity::{Entity, OwnerRef, RecordId, StoreScope, ValidationError};
pub use permission::{CapabilitySet, Permission, PermissionError, Role};
pub use remote::{InMemoryBackend, OfflineBackend, RemoteBackend, RemoteError};
pub use service::{ConsoleError, ConsoleServices, MirrorSummary};
pub use session::SessionState;
pub use store::{DataSource, ListResult, Notice, RemoteFirstStore, StoreError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
