//! Campaign records.

use super::entity::{
    ensure_ordered, require_text, require_text_if_set, Entity, OwnerRef, RecordId,
    ValidationError,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Planning,
    Active,
    Completed,
    Archived,
}

/// One LARP campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: CampaignStatus,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub location: Option<String>,
    pub created_by: OwnerRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignDraft {
    pub title: String,
    pub description: Option<String>,
    pub status: CampaignStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub location: Option<String>,
}

impl CampaignDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CampaignStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Entity for Campaign {
    type Draft = CampaignDraft;
    type Patch = CampaignPatch;

    const TABLE: &'static str = "campaigns";
    const STORAGE_PREFIX: &'static str = "larp_campaigns";
    const SCOPE_COLUMN: Option<&'static str> = None;

    fn id(&self) -> RecordId {
        self.id
    }

    fn owner(&self) -> &OwnerRef {
        &self.created_by
    }

    fn validate_record(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        ensure_ordered(
            self.start_date.as_ref(),
            self.end_date.as_ref(),
            "start_date",
            "end_date",
        )
    }

    fn validate_draft(draft: &CampaignDraft) -> Result<(), ValidationError> {
        require_text("title", &draft.title)?;
        ensure_ordered(
            draft.start_date.as_ref(),
            draft.end_date.as_ref(),
            "start_date",
            "end_date",
        )
    }

    fn validate_patch(patch: &CampaignPatch) -> Result<(), ValidationError> {
        require_text_if_set("title", patch.title.as_deref())?;
        ensure_ordered(
            patch.start_date.as_ref(),
            patch.end_date.as_ref(),
            "start_date",
            "end_date",
        )
    }
}
