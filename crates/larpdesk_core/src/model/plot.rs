//! Plot lines within a campaign.

use super::entity::{require_text, require_text_if_set, Entity, OwnerRef, RecordId, ValidationError};
use crate::remote::OrderBy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Most urgent priority.
pub const PRIORITY_HIGHEST: u8 = 1;
/// Least urgent priority.
pub const PRIORITY_LOWEST: u8 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotStatus {
    #[default]
    Draft,
    Active,
    Resolved,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    pub id: RecordId,
    pub campaign_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: PlotStatus,
    /// 1 is the most urgent.
    pub priority: u8,
    pub created_by: OwnerRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotDraft {
    pub campaign_id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub status: PlotStatus,
    pub priority: u8,
}

impl PlotDraft {
    pub fn new(campaign_id: RecordId, title: impl Into<String>) -> Self {
        Self {
            campaign_id,
            title: title.into(),
            description: None,
            status: PlotStatus::Draft,
            priority: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlotPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PlotStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

fn check_priority(priority: u8) -> Result<(), ValidationError> {
    if (PRIORITY_HIGHEST..=PRIORITY_LOWEST).contains(&priority) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: "priority",
            min: i64::from(PRIORITY_HIGHEST),
            max: i64::from(PRIORITY_LOWEST),
        })
    }
}

impl Entity for Plot {
    type Draft = PlotDraft;
    type Patch = PlotPatch;

    const TABLE: &'static str = "plots";
    const STORAGE_PREFIX: &'static str = "larp_plots";

    fn id(&self) -> RecordId {
        self.id
    }

    fn owner(&self) -> &OwnerRef {
        &self.created_by
    }

    fn draft_scope(draft: &PlotDraft) -> Option<RecordId> {
        Some(draft.campaign_id)
    }

    fn record_scope(&self) -> Option<RecordId> {
        Some(self.campaign_id)
    }

    fn validate_record(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        check_priority(self.priority)
    }

    fn validate_draft(draft: &PlotDraft) -> Result<(), ValidationError> {
        require_text("title", &draft.title)?;
        check_priority(draft.priority)
    }

    fn validate_patch(patch: &PlotPatch) -> Result<(), ValidationError> {
        require_text_if_set("title", patch.title.as_deref())?;
        patch.priority.map_or(Ok(()), check_priority)
    }

    fn list_order() -> Vec<OrderBy> {
        vec![OrderBy::asc("priority"), OrderBy::desc("created_at")]
    }
}

#[cfg(test)]
mod tests {
    use super::{Plot, PlotDraft, PlotPatch};
    use crate::model::entity::{Entity, ValidationError};

    #[test]
    fn priority_must_stay_in_range() {
        let mut draft = PlotDraft::new(7, "The stolen relic");
        draft.priority = 0;
        assert!(matches!(
            Plot::validate_draft(&draft),
            Err(ValidationError::OutOfRange { field: "priority", .. })
        ));

        let patch = PlotPatch {
            priority: Some(9),
            ..PlotPatch::default()
        };
        assert!(Plot::validate_patch(&patch).is_err());
    }
}
