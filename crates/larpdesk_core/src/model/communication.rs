//! Outbound communications to players.

use super::entity::{require_text, require_text_if_set, Entity, OwnerRef, RecordId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationChannel {
    Email,
    #[default]
    Announcement,
    Message,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationStatus {
    #[default]
    Draft,
    Scheduled,
    Sent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Communication {
    pub id: RecordId,
    pub campaign_id: RecordId,
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub channel: CommunicationChannel,
    #[serde(default)]
    pub status: CommunicationStatus,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_by: OwnerRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunicationDraft {
    pub campaign_id: RecordId,
    pub subject: String,
    pub body: String,
    pub channel: CommunicationChannel,
    pub status: CommunicationStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl CommunicationDraft {
    pub fn new(campaign_id: RecordId, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            campaign_id,
            subject: subject.into(),
            body: body.into(),
            channel: CommunicationChannel::Announcement,
            status: CommunicationStatus::Draft,
            scheduled_for: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommunicationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<CommunicationChannel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CommunicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl Entity for Communication {
    type Draft = CommunicationDraft;
    type Patch = CommunicationPatch;

    const TABLE: &'static str = "communications";
    const STORAGE_PREFIX: &'static str = "larp_communications";

    fn id(&self) -> RecordId {
        self.id
    }

    fn owner(&self) -> &OwnerRef {
        &self.created_by
    }

    fn draft_scope(draft: &CommunicationDraft) -> Option<RecordId> {
        Some(draft.campaign_id)
    }

    fn record_scope(&self) -> Option<RecordId> {
        Some(self.campaign_id)
    }

    fn validate_record(&self) -> Result<(), ValidationError> {
        require_text("subject", &self.subject)?;
        if self.status == CommunicationStatus::Scheduled && self.scheduled_for.is_none() {
            return Err(ValidationError::Required("scheduled_for"));
        }
        Ok(())
    }

    fn validate_draft(draft: &CommunicationDraft) -> Result<(), ValidationError> {
        require_text("subject", &draft.subject)?;
        if draft.status == CommunicationStatus::Scheduled && draft.scheduled_for.is_none() {
            return Err(ValidationError::Required("scheduled_for"));
        }
        Ok(())
    }

    fn validate_patch(patch: &CommunicationPatch) -> Result<(), ValidationError> {
        require_text_if_set("subject", patch.subject.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::{Communication, CommunicationDraft, CommunicationStatus};
    use crate::model::entity::{Entity, ValidationError};

    #[test]
    fn scheduled_message_needs_a_send_time() {
        let mut draft = CommunicationDraft::new(2, "Gate times", "Doors open at 18:00.");
        draft.status = CommunicationStatus::Scheduled;
        assert_eq!(
            Communication::validate_draft(&draft),
            Err(ValidationError::Required("scheduled_for"))
        );
    }
}
