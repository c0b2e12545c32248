//! Service container for one console instance.
//!
//! # Invariants
//! - Every store shares the same remote backend, local store, session and
//!   clock handles.
//! - After `logout` (or a login as someone else) every store is empty and
//!   has no cooldown armed.
//! - Campaign-owned stores are always bound to the selected campaign.

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, ConsoleConfig};
use crate::local::{
    read_collection, LocalStore, LocalStoreError, MemoryLocalStore, MirrorError, SqliteLocalStore,
};
use crate::model::campaign::Campaign;
use crate::model::character::Character;
use crate::model::communication::Communication;
use crate::model::entity::{RecordId, StoreScope};
use crate::model::event::Event;
use crate::model::note::Note;
use crate::model::plot::Plot;
use crate::model::profile::UserProfile;
use crate::permission::{Permission, PermissionError};
use crate::remote::RemoteBackend;
use crate::session::{SessionError, SessionState, SESSION_KEY};
use crate::store::{RemoteFirstStore, StoreDeps, StoreOptions};
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Mirror key prefixes owned by the console.
const MIRROR_PREFIXES: [&str; 2] = ["larp_", "notes_"];

#[derive(Debug)]
pub enum ConsoleError {
    Config(ConfigError),
    Local(LocalStoreError),
    Mirror(MirrorError),
    Session(SessionError),
    Permission(PermissionError),
}

impl Display for ConsoleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Local(err) => write!(f, "{err}"),
            Self::Mirror(err) => write!(f, "{err}"),
            Self::Session(err) => write!(f, "{err}"),
            Self::Permission(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConsoleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Local(err) => Some(err),
            Self::Mirror(err) => Some(err),
            Self::Session(err) => Some(err),
            Self::Permission(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ConsoleError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LocalStoreError> for ConsoleError {
    fn from(value: LocalStoreError) -> Self {
        Self::Local(value)
    }
}

impl From<MirrorError> for ConsoleError {
    fn from(value: MirrorError) -> Self {
        Self::Mirror(value)
    }
}

impl From<SessionError> for ConsoleError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<PermissionError> for ConsoleError {
    fn from(value: PermissionError) -> Self {
        Self::Permission(value)
    }
}

/// Record count of one mirrored collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSummary {
    pub key: String,
    pub records: usize,
}

/// One store per record type plus the shared session.
pub struct ConsoleServices {
    config: ConsoleConfig,
    deps: StoreDeps,
    selected_campaign: Option<RecordId>,
    pub campaigns: RemoteFirstStore<Campaign>,
    pub plots: RemoteFirstStore<Plot>,
    pub events: RemoteFirstStore<Event>,
    pub characters: RemoteFirstStore<Character>,
    pub communications: RemoteFirstStore<Communication>,
    pub notes: RemoteFirstStore<Note>,
}

impl ConsoleServices {
    pub fn new(
        config: ConsoleConfig,
        remote: Arc<dyn RemoteBackend>,
        local: Arc<dyn LocalStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let deps = StoreDeps {
            remote,
            session: Arc::new(SessionState::new(local.clone())),
            local,
            clock,
        };
        let options = StoreOptions::from_config(&config);
        Self {
            campaigns: RemoteFirstStore::new(deps.clone(), options),
            plots: RemoteFirstStore::new(deps.clone(), options),
            events: RemoteFirstStore::new(deps.clone(), options),
            characters: RemoteFirstStore::new(deps.clone(), options),
            communications: RemoteFirstStore::new(deps.clone(), options),
            notes: RemoteFirstStore::new(deps.clone(), options),
            config,
            deps,
            selected_campaign: None,
        }
    }

    /// Validates `config`, opens the configured local store and restores a
    /// persisted session.
    pub fn open(config: ConsoleConfig, remote: Arc<dyn RemoteBackend>) -> Result<Self, ConsoleError> {
        config.validate()?;
        let local: Arc<dyn LocalStore> = match &config.local_store_path {
            Some(path) => Arc::new(SqliteLocalStore::open(path)?),
            None => Arc::new(MemoryLocalStore::new()),
        };
        let services = Self::new(config, remote, local, Arc::new(SystemClock));
        services.restore_session()?;
        info!(
            "event=console_open module=service status=ok persistent={}",
            services.config.local_store_path.is_some()
        );
        Ok(services)
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.deps.session
    }

    pub fn local(&self) -> &Arc<dyn LocalStore> {
        &self.deps.local
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.deps.session.current_user()
    }

    pub fn restore_session(&self) -> Result<Option<UserProfile>, ConsoleError> {
        Ok(self.deps.session.restore()?)
    }

    /// Signs in `profile`; stores are reset when the viewer changes.
    pub fn login(&mut self, profile: UserProfile) -> Result<(), ConsoleError> {
        let previous = self.deps.session.current_user().map(|user| user.id);
        let next = profile.id;
        self.deps.session.sign_in(profile)?;
        if previous != Some(next) {
            self.reset_stores();
        }
        Ok(())
    }

    /// Clears the session and every store.
    ///
    /// Stores are reset even when removing the persisted session fails.
    pub fn logout(&mut self) -> Result<(), ConsoleError> {
        let outcome = self.deps.session.sign_out();
        self.reset_stores();
        self.selected_campaign = None;
        self.rebind_campaign_stores();
        if let Err(err) = &outcome {
            warn!("event=console_logout module=service status=partial error={err}");
        } else {
            info!("event=console_logout module=service status=ok");
        }
        Ok(outcome?)
    }

    pub fn selected_campaign(&self) -> Option<RecordId> {
        self.selected_campaign
    }

    /// Binds plots, events, characters and communications to `campaign_id`.
    pub fn select_campaign(&mut self, campaign_id: Option<RecordId>) {
        if self.selected_campaign == campaign_id {
            return;
        }
        self.selected_campaign = campaign_id;
        self.rebind_campaign_stores();
        info!(
            "event=campaign_select module=service status=ok campaign_id={}",
            campaign_id.map_or_else(|| "none".to_string(), |id| id.to_string())
        );
    }

    pub fn ensure_permission(&self, permission: Permission) -> Result<(), ConsoleError> {
        Ok(self.deps.session.ensure(permission)?)
    }

    /// Record counts of every mirrored collection, sorted by key.
    ///
    /// # Errors
    /// - `Local` when the store cannot enumerate keys.
    /// - `Mirror` when a collection is not a JSON array.
    pub fn mirror_summary(&self) -> Result<Vec<MirrorSummary>, ConsoleError> {
        let local = self.deps.local.as_ref();
        let mut summary = Vec::new();
        for prefix in MIRROR_PREFIXES {
            for key in local.keys(prefix)? {
                if key == SESSION_KEY {
                    continue;
                }
                let records = read_collection::<Value>(local, &key)?.len();
                summary.push(MirrorSummary { key, records });
            }
        }
        summary.sort_by(|left, right| left.key.cmp(&right.key));
        Ok(summary)
    }

    fn scope(&self) -> StoreScope {
        self.selected_campaign
            .map_or_else(StoreScope::unscoped, StoreScope::campaign)
    }

    fn rebind_campaign_stores(&mut self) {
        let scope = self.scope();
        self.plots.set_scope(scope);
        self.events.set_scope(scope);
        self.characters.set_scope(scope);
        self.communications.set_scope(scope);
    }

    fn reset_stores(&mut self) {
        self.campaigns.reset();
        self.plots.reset();
        self.events.reset();
        self.characters.reset();
        self.communications.reset();
        self.notes.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::{ConsoleError, ConsoleServices};
    use crate::clock::ManualClock;
    use crate::config::ConsoleConfig;
    use crate::local::MemoryLocalStore;
    use crate::model::entity::StoreScope;
    use crate::model::profile::UserProfile;
    use crate::permission::{Permission, PermissionError, Role};
    use crate::remote::OfflineBackend;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn offline_console() -> ConsoleServices {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        ));
        ConsoleServices::new(
            ConsoleConfig::new().with_list_cooldown(Duration::from_secs(10)),
            Arc::new(OfflineBackend),
            Arc::new(MemoryLocalStore::new()),
            clock,
        )
    }

    #[test]
    fn select_campaign_rebinds_scoped_stores_only() {
        let mut console = offline_console();
        console.select_campaign(Some(7));

        assert_eq!(console.plots.scope(), StoreScope::campaign(7));
        assert_eq!(console.communications.scope(), StoreScope::campaign(7));
        assert_eq!(console.campaigns.scope(), StoreScope::unscoped());
        assert_eq!(console.notes.scope(), StoreScope::unscoped());
    }

    #[test]
    fn player_cannot_manage_campaigns() {
        let mut console = offline_console();
        console
            .login(UserProfile::new(Uuid::new_v4(), "p@example.org", Role::Player))
            .unwrap();

        let err = console
            .ensure_permission(Permission::CampaignsManage)
            .unwrap_err();
        assert!(matches!(
            err,
            ConsoleError::Permission(PermissionError::Denied(Permission::CampaignsManage))
        ));
    }
}
