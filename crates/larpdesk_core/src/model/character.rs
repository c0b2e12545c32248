//! Player and non-player characters.

use super::entity::{require_text, require_text_if_set, Entity, OwnerRef, RecordId, ValidationError};
use crate::remote::OrderBy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterStatus {
    #[default]
    Active,
    Inactive,
    Deceased,
    Retired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: RecordId,
    pub campaign_id: RecordId,
    pub name: String,
    /// `None` for non-player characters.
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub archetype: Option<String>,
    #[serde(default)]
    pub status: CharacterStatus,
    #[serde(default)]
    pub backstory: Option<String>,
    pub created_by: OwnerRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterDraft {
    pub campaign_id: RecordId,
    pub name: String,
    pub player_name: Option<String>,
    pub archetype: Option<String>,
    pub status: CharacterStatus,
    pub backstory: Option<String>,
}

impl CharacterDraft {
    pub fn new(campaign_id: RecordId, name: impl Into<String>) -> Self {
        Self {
            campaign_id,
            name: name.into(),
            player_name: None,
            archetype: None,
            status: CharacterStatus::Active,
            backstory: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CharacterPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archetype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CharacterStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backstory: Option<String>,
}

impl Entity for Character {
    type Draft = CharacterDraft;
    type Patch = CharacterPatch;

    const TABLE: &'static str = "characters";
    const STORAGE_PREFIX: &'static str = "larp_characters";

    fn id(&self) -> RecordId {
        self.id
    }

    fn owner(&self) -> &OwnerRef {
        &self.created_by
    }

    fn draft_scope(draft: &CharacterDraft) -> Option<RecordId> {
        Some(draft.campaign_id)
    }

    fn record_scope(&self) -> Option<RecordId> {
        Some(self.campaign_id)
    }

    fn validate_draft(draft: &CharacterDraft) -> Result<(), ValidationError> {
        require_text("name", &draft.name)
    }

    fn validate_patch(patch: &CharacterPatch) -> Result<(), ValidationError> {
        require_text_if_set("name", patch.name.as_deref())
    }

    fn list_order() -> Vec<OrderBy> {
        vec![OrderBy::asc("name")]
    }
}
