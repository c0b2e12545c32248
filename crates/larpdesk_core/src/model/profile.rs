//! Signed-in user profile.

use super::entity::{OwnerRef, ValidationError};
use crate::permission::Role;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Auth-provider user id.
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub role: Role,
}

impl UserProfile {
    pub fn new(id: Uuid, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: None,
            role,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ValidationError::Required("email"));
        }
        if !EMAIL_RE.is_match(email) {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                value: email.to_string(),
            });
        }
        Ok(())
    }

    pub fn owner_ref(&self) -> OwnerRef {
        OwnerRef::User(self.id)
    }

    /// Display name, falling back to the email address.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(self.email.as_str())
    }
}
