//! Organizer notes with per-author privacy.
//!
//! # Invariants
//! - `author_id` is always the viewer who wrote the note, also for notes
//!   synthesized by the local tier; the public projection depends on it.
//! - Remote updates and deletes are restricted to the author.

use super::entity::{
    require_text, require_text_if_set, Entity, MirrorLayout, OwnerRef, RecordId, StoreScope,
    ValidationError, Visibility,
};
use crate::remote::{Filter, OrderBy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shared collection holding every author's public notes.
pub const PUBLIC_NOTES_KEY: &str = "notes_public";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: RecordId,
    #[serde(default)]
    pub campaign_id: Option<RecordId>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub is_private: bool,
    pub author_id: OwnerRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteDraft {
    pub campaign_id: Option<RecordId>,
    pub title: String,
    pub content: String,
    pub is_private: bool,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>, is_private: bool) -> Self {
        Self {
            campaign_id: None,
            title: title.into(),
            content: content.into(),
            is_private,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
}

/// Per-viewer collection key (`notes_<userId>`).
pub fn own_notes_key(viewer: &OwnerRef) -> String {
    format!("notes_{}", viewer.storage_segment())
}

impl Entity for Note {
    type Draft = NoteDraft;
    type Patch = NotePatch;

    const TABLE: &'static str = "notes";
    const STORAGE_PREFIX: &'static str = "notes";
    const OWNER_COLUMN: &'static str = "author_id";
    const SCOPE_COLUMN: Option<&'static str> = None;
    const OWNER_SCOPED_WRITES: bool = true;

    fn id(&self) -> RecordId {
        self.id
    }

    fn owner(&self) -> &OwnerRef {
        &self.author_id
    }

    fn validate_draft(draft: &NoteDraft) -> Result<(), ValidationError> {
        require_text("title", &draft.title)
    }

    fn validate_patch(patch: &NotePatch) -> Result<(), ValidationError> {
        require_text_if_set("title", patch.title.as_deref())
    }

    fn visibility(&self) -> Option<Visibility> {
        Some(if self.is_private {
            Visibility::Private
        } else {
            Visibility::Public
        })
    }

    fn list_order() -> Vec<OrderBy> {
        vec![OrderBy::desc("updated_at")]
    }

    fn list_filters(_scope: &StoreScope, viewer: &OwnerRef) -> Vec<Filter> {
        vec![Filter::or(vec![
            Filter::eq(Self::OWNER_COLUMN, viewer.to_json()),
            Filter::eq("is_private", false),
        ])]
    }

    fn mirror_layout(_scope: &StoreScope, viewer: &OwnerRef) -> MirrorLayout {
        MirrorLayout::Partitioned {
            own_key: own_notes_key(viewer),
            public_key: PUBLIC_NOTES_KEY.to_string(),
        }
    }

    fn local_owner(viewer: &OwnerRef) -> OwnerRef {
        viewer.clone()
    }
}
