//! Scheduled in-game and out-of-game events.

use super::entity::{
    ensure_ordered, require_text, require_text_if_set, Entity, OwnerRef, RecordId,
    ValidationError,
};
use crate::remote::OrderBy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: RecordId,
    pub campaign_id: RecordId,
    #[serde(default)]
    pub plot_id: Option<RecordId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: EventStatus,
    pub created_by: OwnerRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDraft {
    pub campaign_id: RecordId,
    pub plot_id: Option<RecordId>,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: EventStatus,
}

impl EventDraft {
    pub fn new(campaign_id: RecordId, title: impl Into<String>) -> Self {
        Self {
            campaign_id,
            plot_id: None,
            title: title.into(),
            description: None,
            location: None,
            starts_at: None,
            ends_at: None,
            status: EventStatus::Scheduled,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
}

impl Entity for Event {
    type Draft = EventDraft;
    type Patch = EventPatch;

    const TABLE: &'static str = "events";
    const STORAGE_PREFIX: &'static str = "larp_events";

    fn id(&self) -> RecordId {
        self.id
    }

    fn owner(&self) -> &OwnerRef {
        &self.created_by
    }

    fn draft_scope(draft: &EventDraft) -> Option<RecordId> {
        Some(draft.campaign_id)
    }

    fn record_scope(&self) -> Option<RecordId> {
        Some(self.campaign_id)
    }

    fn validate_record(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        ensure_ordered(
            self.starts_at.as_ref(),
            self.ends_at.as_ref(),
            "starts_at",
            "ends_at",
        )
    }

    fn validate_draft(draft: &EventDraft) -> Result<(), ValidationError> {
        require_text("title", &draft.title)?;
        ensure_ordered(
            draft.starts_at.as_ref(),
            draft.ends_at.as_ref(),
            "starts_at",
            "ends_at",
        )
    }

    fn validate_patch(patch: &EventPatch) -> Result<(), ValidationError> {
        require_text_if_set("title", patch.title.as_deref())?;
        ensure_ordered(
            patch.starts_at.as_ref(),
            patch.ends_at.as_ref(),
            "starts_at",
            "ends_at",
        )
    }

    fn list_order() -> Vec<OrderBy> {
        vec![OrderBy::asc("starts_at"), OrderBy::desc("created_at")]
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, EventDraft, EventStatus};
    use crate::model::entity::{Entity, OwnerRef, ValidationError};
    use crate::remote::OrderBy;
    use chrono::{TimeZone, Utc};

    #[test]
    fn events_list_soonest_first() {
        assert_eq!(
            Event::list_order(),
            vec![OrderBy::asc("starts_at"), OrderBy::desc("created_at")]
        );
    }

    #[test]
    fn merged_record_must_keep_dates_ordered() {
        let stamp = Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap();
        let event = Event {
            id: 4,
            campaign_id: 2,
            plot_id: None,
            title: "Night watch".to_string(),
            description: None,
            location: None,
            starts_at: Some(Utc.with_ymd_and_hms(2024, 7, 1, 22, 0, 0).unwrap()),
            ends_at: Some(Utc.with_ymd_and_hms(2024, 7, 1, 20, 0, 0).unwrap()),
            status: EventStatus::Scheduled,
            created_by: OwnerRef::Local,
            created_at: stamp,
            updated_at: stamp,
        };
        assert!(matches!(
            event.validate_record(),
            Err(ValidationError::EndsBeforeStart { .. })
        ));
        assert_eq!(Event::draft_scope(&EventDraft::new(2, "Night watch")), Some(2));
    }
}
