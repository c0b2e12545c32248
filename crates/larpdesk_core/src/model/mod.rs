//! Domain records managed by the console.
//!
//! # Responsibility
//! - Define plain serde records for campaigns, plots, events, notes,
//!   characters, communications and user profiles.
//! - Describe, per record type, how it maps onto a remote table and a local
//!   mirror key (`entity::Entity`).
//!
//! # Invariants
//! - `id` is unique within one collection, but local and remote id spaces
//!   are independent.
//! - `created_at`/`updated_at` are stamped by whichever tier accepted the
//!   write.

pub mod campaign;
pub mod character;
pub mod communication;
pub mod entity;
pub mod event;
pub mod note;
pub mod plot;
pub mod profile;
