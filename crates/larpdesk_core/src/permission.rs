//! Role-based capability sets.
//!
//! # Responsibility
//! - Map each `Role` to the set of permission tags it grants.
//! - Parse/render roles and permission tags from their stable string ids.
//!
//! # Invariants
//! - The wildcard tag `*` grants every permission, including ones added later.
//! - `admin` and `super_admin` carry the wildcard; every other role is an
//!   explicit, closed set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Wildcard tag granting every permission.
pub const WILDCARD_PERMISSION: &str = "*";

/// Console user role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Organizer,
    GameMaster,
    Player,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Organizer => "organizer",
            Self::GameMaster => "game_master",
            Self::Player => "player",
        }
    }

    pub fn parse(value: &str) -> Result<Self, PermissionError> {
        match value.trim() {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "organizer" => Ok(Self::Organizer),
            "game_master" => Ok(Self::GameMaster),
            "player" => Ok(Self::Player),
            other => Err(PermissionError::UnknownRole(other.to_string())),
        }
    }

    /// Permission tags granted to this role, as declared.
    pub fn declared_tags(self) -> &'static [&'static str] {
        match self {
            Self::SuperAdmin | Self::Admin => &[WILDCARD_PERMISSION],
            Self::Organizer => &[
                "campaigns.view",
                "campaigns.manage",
                "plots.manage",
                "events.manage",
                "characters.manage",
                "communications.send",
                "notes.write",
            ],
            Self::GameMaster => &[
                "campaigns.view",
                "plots.manage",
                "events.manage",
                "characters.manage",
                "notes.write",
            ],
            Self::Player => &["campaigns.view", "notes.write"],
        }
    }

    /// Capability set derived from the declared tags.
    pub fn capabilities(self) -> CapabilitySet {
        CapabilitySet::from_tags(self.declared_tags().iter().copied())
            .unwrap_or_else(|_| CapabilitySet::none())
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Individually grantable permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    CampaignsView,
    CampaignsManage,
    PlotsManage,
    EventsManage,
    CharactersManage,
    CommunicationsSend,
    NotesWrite,
    UsersManage,
    SettingsManage,
}

impl Permission {
    pub const ALL: [Permission; 9] = [
        Self::CampaignsView,
        Self::CampaignsManage,
        Self::PlotsManage,
        Self::EventsManage,
        Self::CharactersManage,
        Self::CommunicationsSend,
        Self::NotesWrite,
        Self::UsersManage,
        Self::SettingsManage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CampaignsView => "campaigns.view",
            Self::CampaignsManage => "campaigns.manage",
            Self::PlotsManage => "plots.manage",
            Self::EventsManage => "events.manage",
            Self::CharactersManage => "characters.manage",
            Self::CommunicationsSend => "communications.send",
            Self::NotesWrite => "notes.write",
            Self::UsersManage => "users.manage",
            Self::SettingsManage => "settings.manage",
        }
    }

    pub fn parse(value: &str) -> Result<Self, PermissionError> {
        let normalized = value.trim();
        if normalized.is_empty() {
            return Err(PermissionError::EmptyPermission);
        }
        Self::ALL
            .into_iter()
            .find(|permission| permission.as_str() == normalized)
            .ok_or_else(|| PermissionError::UnknownPermission(normalized.to_string()))
    }
}

/// Permissions held by one principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilitySet {
    /// Superuser wildcard.
    All,
    Granted(BTreeSet<Permission>),
}

impl CapabilitySet {
    pub fn none() -> Self {
        Self::Granted(BTreeSet::new())
    }

    /// Builds a set from string tags; any `*` collapses the set to `All`.
    pub fn from_tags<'a>(
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, PermissionError> {
        let mut granted = BTreeSet::new();
        let mut wildcard = false;
        for tag in tags {
            if tag.trim() == WILDCARD_PERMISSION {
                wildcard = true;
                continue;
            }
            granted.insert(Permission::parse(tag)?);
        }
        Ok(if wildcard {
            Self::All
        } else {
            Self::Granted(granted)
        })
    }

    pub fn allows(&self, permission: Permission) -> bool {
        match self {
            Self::All => true,
            Self::Granted(granted) => granted.contains(&permission),
        }
    }

    /// Fails with `Denied` unless `permission` is held.
    pub fn ensure(&self, permission: Permission) -> Result<(), PermissionError> {
        if self.allows(permission) {
            Ok(())
        } else {
            Err(PermissionError::Denied(permission))
        }
    }

    pub fn is_superuser(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// Role/permission parse and guard errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    EmptyPermission,
    UnknownPermission(String),
    UnknownRole(String),
    Denied(Permission),
    NotSignedIn,
}

impl Display for PermissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPermission => write!(f, "permission tag must not be empty"),
            Self::UnknownPermission(value) => write!(f, "unknown permission tag: {value}"),
            Self::UnknownRole(value) => write!(f, "unknown role: {value}"),
            Self::Denied(permission) => write!(f, "permission denied: {}", permission.as_str()),
            Self::NotSignedIn => write!(f, "no signed-in user"),
        }
    }
}

impl Error for PermissionError {}

#[cfg(test)]
mod tests {
    use super::{CapabilitySet, Permission, PermissionError, Role};

    #[test]
    fn admin_roles_hold_the_wildcard() {
        for role in [Role::Admin, Role::SuperAdmin] {
            let caps = role.capabilities();
            assert!(caps.is_superuser());
            for permission in Permission::ALL {
                assert!(caps.allows(permission));
            }
        }
    }

    #[test]
    fn player_is_limited_to_viewing_and_notes() {
        let caps = Role::Player.capabilities();
        assert!(caps.allows(Permission::NotesWrite));
        assert_eq!(
            caps.ensure(Permission::PlotsManage),
            Err(PermissionError::Denied(Permission::PlotsManage))
        );
    }

    #[test]
    fn wildcard_anywhere_in_tags_grants_all() {
        let caps = CapabilitySet::from_tags(["notes.write", "*"]).unwrap();
        assert_eq!(caps, CapabilitySet::All);
    }

    #[test]
    fn rejects_unknown_or_blank_tags() {
        assert_eq!(
            CapabilitySet::from_tags(["plots.burn"]),
            Err(PermissionError::UnknownPermission("plots.burn".to_string()))
        );
        assert_eq!(Permission::parse("  "), Err(PermissionError::EmptyPermission));
    }

    #[test]
    fn role_strings_round_trip() {
        for role in [
            Role::SuperAdmin,
            Role::Admin,
            Role::Organizer,
            Role::GameMaster,
            Role::Player,
        ] {
            assert_eq!(Role::parse(role.as_str()), Ok(role));
        }
        assert!(Role::parse("dungeon_master").is_err());
    }
}
