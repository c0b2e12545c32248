//! Console use-case services.
//!
//! # Responsibility
//! - Wire the session, both data tiers and one store per record type into a
//!   single container constructed at startup.
//! - Route login/logout so that no store outlives the session it served.

pub mod console;

pub use console::{ConsoleError, ConsoleServices, MirrorSummary};
