//! Authenticated session state.
//!
//! # Responsibility
//! - Hold the signed-in profile reported by the auth provider.
//! - Persist it under `larp_session` so a restart can restore it.
//!
//! # Invariants
//! - `sign_out` clears both the in-memory profile and the persisted key.
//! - A corrupt persisted session is discarded, never surfaced as signed-in.

use crate::local::{LocalStore, LocalStoreError};
use crate::model::entity::{OwnerRef, ValidationError};
use crate::model::profile::UserProfile;
use crate::permission::{CapabilitySet, Permission, PermissionError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, PoisonError, RwLock};

/// Local key holding the persisted session profile.
pub const SESSION_KEY: &str = "larp_session";

#[derive(Debug)]
pub enum SessionError {
    Invalid(ValidationError),
    Local(LocalStoreError),
    Serialization(serde_json::Error),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "invalid profile: {err}"),
            Self::Local(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "session serialization failed: {err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Local(err) => Some(err),
            Self::Serialization(err) => Some(err),
        }
    }
}

impl From<LocalStoreError> for SessionError {
    fn from(value: LocalStoreError) -> Self {
        Self::Local(value)
    }
}

/// Shared session handle; constructed once and passed to every store.
pub struct SessionState {
    local: Arc<dyn LocalStore>,
    current: RwLock<Option<UserProfile>>,
}

impl SessionState {
    pub fn new(local: Arc<dyn LocalStore>) -> Self {
        Self {
            local,
            current: RwLock::new(None),
        }
    }

    /// Reloads a persisted session, if any.
    pub fn restore(&self) -> Result<Option<UserProfile>, SessionError> {
        let Some(raw) = self.local.get(SESSION_KEY)? else {
            return Ok(None);
        };
        let profile = match serde_json::from_str::<UserProfile>(&raw) {
            Ok(profile) if profile.validate().is_ok() => profile,
            _ => {
                warn!("event=session_restore module=session status=discarded reason=corrupt");
                self.local.remove(SESSION_KEY)?;
                return Ok(None);
            }
        };
        *self.write() = Some(profile.clone());
        info!(
            "event=session_restore module=session status=ok role={}",
            profile.role
        );
        Ok(Some(profile))
    }

    pub fn sign_in(&self, profile: UserProfile) -> Result<(), SessionError> {
        profile.validate().map_err(SessionError::Invalid)?;
        let raw = serde_json::to_string(&profile).map_err(SessionError::Serialization)?;
        self.local.set(SESSION_KEY, &raw)?;
        info!(
            "event=session_sign_in module=session status=ok role={}",
            profile.role
        );
        *self.write() = Some(profile);
        Ok(())
    }

    /// Clears the in-memory profile and the persisted session key.
    ///
    /// The in-memory profile is cleared even when the key removal fails.
    pub fn sign_out(&self) -> Result<(), SessionError> {
        *self.write() = None;
        self.local.remove(SESSION_KEY)?;
        info!("event=session_sign_out module=session status=ok");
        Ok(())
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Owner used for reads and local writes; `Local` when signed out.
    pub fn viewer(&self) -> OwnerRef {
        self.current_user()
            .map(|profile| profile.owner_ref())
            .unwrap_or(OwnerRef::Local)
    }

    pub fn capabilities(&self) -> CapabilitySet {
        self.current_user()
            .map(|profile| profile.role.capabilities())
            .unwrap_or_else(CapabilitySet::none)
    }

    pub fn ensure(&self, permission: Permission) -> Result<(), PermissionError> {
        if !self.is_signed_in() {
            return Err(PermissionError::NotSignedIn);
        }
        self.capabilities().ensure(permission)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<UserProfile>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionState, SESSION_KEY};
    use crate::local::{LocalStore, MemoryLocalStore};
    use crate::model::entity::OwnerRef;
    use crate::model::profile::UserProfile;
    use crate::permission::{Permission, PermissionError, Role};
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn sign_in_persists_and_restore_reloads() {
        let local = Arc::new(MemoryLocalStore::new());
        let profile = UserProfile::new(Uuid::new_v4(), "org@example.org", Role::Organizer);

        SessionState::new(local.clone())
            .sign_in(profile.clone())
            .unwrap();

        let restored = SessionState::new(local);
        assert_eq!(restored.restore().unwrap(), Some(profile.clone()));
        assert_eq!(restored.viewer(), OwnerRef::User(profile.id));
    }

    #[test]
    fn corrupt_session_is_discarded() {
        let local = Arc::new(MemoryLocalStore::new());
        local.set(SESSION_KEY, "{\"id\":42}").unwrap();
        let session = SessionState::new(local.clone());
        assert_eq!(session.restore().unwrap(), None);
        assert!(local.get(SESSION_KEY).unwrap().is_none());
    }

    #[test]
    fn signed_out_session_has_no_permissions() {
        let session = SessionState::new(Arc::new(MemoryLocalStore::new()));
        assert_eq!(
            session.ensure(Permission::NotesWrite),
            Err(PermissionError::NotSignedIn)
        );
        assert_eq!(session.viewer(), OwnerRef::Local);
    }
}
