//! Shared entity contract and identity types.

use crate::remote::{Filter, OrderBy};
use serde::de::{DeserializeOwned, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Numeric identifier shared by every managed collection.
pub type RecordId = i64;

/// Owner stamp used for records written while no remote owner is known.
pub const LOCAL_OWNER: &str = "local-user";

/// Who owns (or authored) a record.
///
/// Serialized as a plain string: the auth user id, or `local-user`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OwnerRef {
    User(Uuid),
    Local,
}

impl OwnerRef {
    /// Segment used inside per-user storage keys.
    pub fn storage_segment(&self) -> String {
        self.to_string()
    }

    pub fn to_json(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl Display for OwnerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "{id}"),
            Self::Local => f.write_str(LOCAL_OWNER),
        }
    }
}

impl FromStr for OwnerRef {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == LOCAL_OWNER {
            return Ok(Self::Local);
        }
        Uuid::parse_str(value)
            .map(Self::User)
            .map_err(|_| ValidationError::InvalidFormat {
                field: "owner",
                value: value.to_string(),
            })
    }
}

impl Serialize for OwnerRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OwnerRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Owning-id scope a store instance is bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreScope {
    pub campaign_id: Option<RecordId>,
}

impl StoreScope {
    pub fn unscoped() -> Self {
        Self::default()
    }

    pub fn campaign(campaign_id: RecordId) -> Self {
        Self {
            campaign_id: Some(campaign_id),
        }
    }
}

/// Where a record type keeps its local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorLayout {
    /// One collection per key.
    Flat { key: String },
    /// Per-viewer collection plus a shared collection of public records.
    Partitioned { own_key: String, public_key: String },
}

/// Visibility of records that carry a privacy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Field-level validation failure raised before any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Required(&'static str),
    TooLong { field: &'static str, max: usize },
    OutOfRange { field: &'static str, min: i64, max: i64 },
    EndsBeforeStart { start: &'static str, end: &'static str },
    InvalidFormat { field: &'static str, value: String },
    /// Draft names a campaign other than the one the store is bound to.
    ScopeMismatch {
        field: &'static str,
        expected: RecordId,
        actual: RecordId,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required(field) => write!(f, "{field} is required"),
            Self::TooLong { field, max } => write!(f, "{field} must be at most {max} characters"),
            Self::OutOfRange { field, min, max } => {
                write!(f, "{field} must be between {min} and {max}")
            }
            Self::EndsBeforeStart { start, end } => write!(f, "{end} must not be before {start}"),
            Self::InvalidFormat { field, value } => write!(f, "invalid {field}: `{value}`"),
            Self::ScopeMismatch {
                field,
                expected,
                actual,
            } => write!(f, "{field} {actual} does not match the selected campaign {expected}"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) const TITLE_MAX_CHARS: usize = 200;

/// Rejects blank or overlong single-line text.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    if value.chars().count() > TITLE_MAX_CHARS {
        return Err(ValidationError::TooLong {
            field,
            max: TITLE_MAX_CHARS,
        });
    }
    Ok(())
}

/// Same as `require_text` for optional patch fields.
pub(crate) fn require_text_if_set(
    field: &'static str,
    value: Option<&str>,
) -> Result<(), ValidationError> {
    match value {
        Some(value) => require_text(field, value),
        None => Ok(()),
    }
}

pub(crate) fn ensure_ordered<T: PartialOrd>(
    start: Option<&T>,
    end: Option<&T>,
    start_field: &'static str,
    end_field: &'static str,
) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ValidationError::EndsBeforeStart {
            start: start_field,
            end: end_field,
        }),
        _ => Ok(()),
    }
}

/// Mapping between one record type, its remote table and its local mirror.
///
/// `Draft` is the creation payload and `Patch` the partial-update payload.
/// A synthesized local record is the draft's JSON plus `id`, `created_at`,
/// `updated_at` and `OWNER_COLUMN`, so every other field must live in the
/// draft.
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Draft: Clone + Debug + Serialize;
    /// Absent fields must be skipped on serialization.
    type Patch: Clone + Debug + Serialize;

    const TABLE: &'static str;
    const STORAGE_PREFIX: &'static str;
    const OWNER_COLUMN: &'static str = "created_by";
    const SCOPE_COLUMN: Option<&'static str> = Some("campaign_id");
    /// Remote updates/deletes also filter on `OWNER_COLUMN = viewer`.
    const OWNER_SCOPED_WRITES: bool = false;

    fn id(&self) -> RecordId;
    fn owner(&self) -> &OwnerRef;
    fn validate_draft(draft: &Self::Draft) -> Result<(), ValidationError>;

    fn validate_patch(_patch: &Self::Patch) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Checks a complete record, e.g. after a patch was merged into it.
    fn validate_record(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Value of `SCOPE_COLUMN` carried by a draft.
    fn draft_scope(_draft: &Self::Draft) -> Option<RecordId> {
        None
    }

    /// Value of `SCOPE_COLUMN` carried by a record.
    fn record_scope(&self) -> Option<RecordId> {
        None
    }

    /// `None` for record types without a privacy flag.
    fn visibility(&self) -> Option<Visibility> {
        None
    }

    fn list_order() -> Vec<OrderBy> {
        vec![OrderBy::desc("created_at")]
    }

    fn list_filters(scope: &StoreScope, _viewer: &OwnerRef) -> Vec<Filter> {
        match (Self::SCOPE_COLUMN, scope.campaign_id) {
            (Some(column), Some(campaign_id)) => vec![Filter::eq(column, campaign_id)],
            _ => Vec::new(),
        }
    }

    fn mirror_layout(scope: &StoreScope, _viewer: &OwnerRef) -> MirrorLayout {
        let key = match (Self::SCOPE_COLUMN, scope.campaign_id) {
            (Some(_), Some(campaign_id)) => format!("{}_{campaign_id}", Self::STORAGE_PREFIX),
            _ => Self::STORAGE_PREFIX.to_string(),
        };
        MirrorLayout::Flat { key }
    }

    /// Owner stamped on records synthesized by the local tier.
    fn local_owner(_viewer: &OwnerRef) -> OwnerRef {
        OwnerRef::Local
    }
}
