//! Two-collection projection for records with a privacy flag.
//!
//! The per-viewer collection holds every record the viewer authored; the
//! public collection holds every author's public records. What a viewer sees
//! locally is computed at read time as the union of the two.
//!
//! # Invariants
//! - A record is in the public collection iff its visibility is `Public`.
//! - In a union, the viewer's own copy wins over a public copy with the same
//!   id.

use crate::local::{read_collection, LocalStore, MirrorError};
use crate::model::entity::{Entity, MirrorLayout, OwnerRef, RecordId, Visibility};
use log::warn;
use std::collections::BTreeSet;

/// Merges own records with other authors' public records, own first.
pub fn union_visible<E: Entity>(mine: Vec<E>, public: Vec<E>, viewer: &OwnerRef) -> Vec<E> {
    let mut seen: BTreeSet<RecordId> = mine.iter().map(|record| record.id()).collect();
    let mut merged = mine;
    for record in public {
        if record.owner() == viewer || !seen.insert(record.id()) {
            continue;
        }
        merged.push(record);
    }
    merged
}

/// Reads what `viewer` can see from the local mirror.
///
/// An unreadable public collection degrades to "own records only"; an
/// unreadable own collection is an error.
pub fn read_visible<E: Entity>(
    local: &dyn LocalStore,
    layout: &MirrorLayout,
    viewer: &OwnerRef,
) -> Result<Vec<E>, MirrorError> {
    match layout {
        MirrorLayout::Flat { key } => read_collection(local, key),
        MirrorLayout::Partitioned {
            own_key,
            public_key,
        } => {
            let mine = read_collection(local, own_key)?;
            let public = read_collection(local, public_key).unwrap_or_else(|err| {
                warn!(
                    "event=mirror_read module=store status=degraded key={} error={}",
                    public_key, err
                );
                Vec::new()
            });
            Ok(union_visible(mine, public, viewer))
        }
    }
}

/// Splits remote rows into the own and public collections.
pub fn partition_rows<E: Entity>(rows: &[E], viewer: &OwnerRef) -> (Vec<E>, Vec<E>) {
    let mine = rows
        .iter()
        .filter(|row| row.owner() == viewer)
        .cloned()
        .collect();
    let public = rows
        .iter()
        .filter(|row| row.visibility() == Some(Visibility::Public))
        .cloned()
        .collect();
    (mine, public)
}

/// Brings the public collection in line with `record`'s current visibility.
///
/// An existing public copy is replaced in place or removed; a newly public
/// record is prepended.
pub fn project_public<E: Entity>(public: &mut Vec<E>, record: &E) {
    let is_public = record.visibility() == Some(Visibility::Public);
    match public.iter().position(|existing| existing.id() == record.id()) {
        Some(index) if is_public => public[index] = record.clone(),
        Some(index) => {
            public.remove(index);
        }
        None if is_public => public.insert(0, record.clone()),
        None => {}
    }
}

/// Removes `id`; returns whether anything was removed.
pub fn remove_record<E: Entity>(records: &mut Vec<E>, id: RecordId) -> bool {
    let before = records.len();
    records.retain(|record| record.id() != id);
    records.len() != before
}
