use chrono::{DateTime, TimeZone, Utc};
use larpdesk_core::clock::ManualClock;
use larpdesk_core::local::{read_collection, LocalStore, MemoryLocalStore};
use larpdesk_core::model::entity::OwnerRef;
use larpdesk_core::model::note::{own_notes_key, Note, NoteDraft, NotePatch, PUBLIC_NOTES_KEY};
use larpdesk_core::model::profile::UserProfile;
use larpdesk_core::permission::Role;
use larpdesk_core::remote::InMemoryBackend;
use larpdesk_core::session::SessionState;
use larpdesk_core::store::{DataSource, RemoteFirstStore, StoreDeps, StoreError, StoreOptions};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

struct Desk {
    clock: Arc<ManualClock>,
    remote: Arc<InMemoryBackend>,
    local: Arc<MemoryLocalStore>,
}

impl Desk {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 9, 21, 22, 15, 0).unwrap(),
        ));
        Self {
            remote: Arc::new(InMemoryBackend::new(clock.clone())),
            local: Arc::new(MemoryLocalStore::new()),
            clock,
        }
    }

    fn offline() -> Self {
        let desk = Self::new();
        desk.remote.set_online(false);
        desk
    }

    /// Notes store for `profile`, with its own session over the shared mirror.
    fn notes_for(&self, profile: &UserProfile) -> RemoteFirstStore<Note> {
        let session = Arc::new(SessionState::new(self.local.clone()));
        session.sign_in(profile.clone()).unwrap();
        RemoteFirstStore::new(
            StoreDeps {
                remote: self.remote.clone(),
                local: self.local.clone(),
                session,
                clock: self.clock.clone(),
            },
            StoreOptions::default(),
        )
    }

    fn collection(&self, key: &str) -> Vec<Note> {
        read_collection(self.local.as_ref(), key).unwrap()
    }

    fn ids(&self, key: &str) -> Vec<i64> {
        self.collection(key).iter().map(|note| note.id).collect()
    }
}

fn player(email: &str) -> UserProfile {
    UserProfile::new(Uuid::new_v4(), email, Role::Player)
}

fn own_key(profile: &UserProfile) -> String {
    own_notes_key(&profile.owner_ref())
}

#[test]
fn public_local_note_lands_in_both_collections() {
    let desk = Desk::offline();
    let author = player("ana@example.org");
    let mut notes = desk.notes_for(&author);

    let note = notes
        .create(NoteDraft::new("Herb lore", "Nightshade grows by the mill", false))
        .unwrap();

    assert_eq!(note.author_id, OwnerRef::User(author.id));
    assert_eq!(desk.ids(&own_key(&author)), vec![note.id]);
    assert_eq!(desk.ids(PUBLIC_NOTES_KEY), vec![note.id]);
}

#[test]
fn private_local_note_stays_out_of_public_collection() {
    let desk = Desk::offline();
    let author = player("ana@example.org");
    let mut notes = desk.notes_for(&author);

    let note = notes
        .create(NoteDraft::new("Secret motive", "The baron owes the guild", true))
        .unwrap();

    assert_eq!(desk.ids(&own_key(&author)), vec![note.id]);
    assert!(desk.ids(PUBLIC_NOTES_KEY).is_empty());
}

#[test]
fn toggling_privacy_moves_note_in_and_out_of_public() {
    let desk = Desk::offline();
    let author = player("ana@example.org");
    let mut notes = desk.notes_for(&author);
    let note = notes
        .create(NoteDraft::new("Map of the catacombs", "Third tunnel on the left", false))
        .unwrap();

    let hide = NotePatch {
        is_private: Some(true),
        ..NotePatch::default()
    };
    assert!(notes.update(note.id, hide).unwrap());
    assert!(desk.ids(PUBLIC_NOTES_KEY).is_empty());
    assert!(desk.collection(&own_key(&author))[0].is_private);

    let publish = NotePatch {
        is_private: Some(false),
        content: Some("Second tunnel, actually".to_string()),
        ..NotePatch::default()
    };
    assert!(notes.update(note.id, publish).unwrap());
    let public = desk.collection(PUBLIC_NOTES_KEY);
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].content, "Second tunnel, actually");
    assert_eq!(public[0].title, "Map of the catacombs");
}

#[test]
fn delete_removes_note_from_every_collection() {
    let desk = Desk::offline();
    let author = player("ana@example.org");
    let mut notes = desk.notes_for(&author);
    let note = notes
        .create(NoteDraft::new("Rumour", "The well is cursed", false))
        .unwrap();

    assert!(notes.delete(note.id));

    assert!(desk.ids(&own_key(&author)).is_empty());
    assert!(desk.ids(PUBLIC_NOTES_KEY).is_empty());
    assert!(notes.items().is_empty());
}

#[test]
fn other_viewer_cannot_delete_public_note_locally() {
    let desk = Desk::offline();
    let author = player("ana@example.org");
    let reader = player("ben@example.org");
    let note = desk
        .notes_for(&author)
        .create(NoteDraft::new("Rumour", "The well is cursed", false))
        .unwrap();

    assert!(!desk.notes_for(&reader).delete(note.id));
    assert_eq!(desk.ids(PUBLIC_NOTES_KEY), vec![note.id]);
}

#[test]
fn session_recap_is_shared_between_players() {
    let desk = Desk::offline();
    let ana = player("ana@example.org");
    let ben = player("ben@example.org");

    let recap = desk
        .notes_for(&ana)
        .create(NoteDraft::new(
            "Session recap",
            "The party reached the ruined abbey",
            false,
        ))
        .unwrap();
    desk.clock.advance(Duration::from_secs(1));
    let secret = desk
        .notes_for(&ana)
        .create(NoteDraft::new("Ana's plan", "Betray the abbot", true))
        .unwrap();
    desk.clock.advance(Duration::from_secs(1));
    let own = desk
        .notes_for(&ben)
        .create(NoteDraft::new("Ben's sketch", "Floor plan of the abbey", true))
        .unwrap();

    let listed = desk.notes_for(&ben).list();
    assert_eq!(listed.source, DataSource::Local);
    let ids: Vec<i64> = listed.items.iter().map(|note| note.id).collect();
    assert_eq!(ids, vec![own.id, recap.id]);
    assert!(!ids.contains(&secret.id));

    let raw: Vec<Value> =
        serde_json::from_str(&desk.local.get(PUBLIC_NOTES_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(raw.len(), 1);
    assert!(raw[0]["id"].is_i64());
    assert_eq!(raw[0]["author_id"], ana.id.to_string());
    let created_at = raw[0]["created_at"].as_str().unwrap();
    assert!(DateTime::parse_from_rfc3339(created_at).is_ok());
}

#[test]
fn local_list_prefers_own_copy_over_public_copy() {
    let desk = Desk::offline();
    let author = player("ana@example.org");
    let mut notes = desk.notes_for(&author);
    let note = notes
        .create(NoteDraft::new("Draft", "first version", false))
        .unwrap();

    let mut stale = note.clone();
    stale.content = "stale copy".to_string();
    desk.local
        .set(
            PUBLIC_NOTES_KEY,
            &serde_json::to_string(&vec![stale]).unwrap(),
        )
        .unwrap();

    let listed = notes.refresh();
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].content, "first version");
}

#[test]
fn remote_list_partitions_rows_into_mirrors() {
    let desk = Desk::new();
    let ana = player("ana@example.org");
    let ben = player("ben@example.org");

    let mut ana_notes = desk.notes_for(&ana);
    let ana_public = ana_notes
        .create(NoteDraft::new("Loot table", "Two silver each", false))
        .unwrap();
    let ana_private = ana_notes
        .create(NoteDraft::new("Grudge", "Against the innkeeper", true))
        .unwrap();
    let ben_public = desk
        .notes_for(&ben)
        .create(NoteDraft::new("Weather", "Storm on day two", false))
        .unwrap();
    desk.notes_for(&ben)
        .create(NoteDraft::new("Ben only", "Hidden", true))
        .unwrap();

    let listed = ana_notes.refresh();
    assert_eq!(listed.source, DataSource::Remote);
    assert_eq!(listed.items.len(), 3);

    let mut own = desk.ids(&own_key(&ana));
    own.sort_unstable();
    assert_eq!(own, vec![ana_public.id, ana_private.id]);
    let mut public = desk.ids(PUBLIC_NOTES_KEY);
    public.sort_unstable();
    assert_eq!(public, vec![ana_public.id, ben_public.id]);
}

#[test]
fn remote_note_writes_are_restricted_to_author() {
    let desk = Desk::new();
    let ana = player("ana@example.org");
    let ben = player("ben@example.org");
    let note = desk
        .notes_for(&ana)
        .create(NoteDraft::new("Ana's note", "Do not edit", false))
        .unwrap();

    let mut ben_notes = desk.notes_for(&ben);
    let patch = NotePatch {
        content: Some("Edited by Ben".to_string()),
        ..NotePatch::default()
    };
    assert!(!ben_notes.update(note.id, patch).unwrap());
    assert!(!ben_notes.delete(note.id));
    assert_eq!(desk.remote.rows("notes")[0]["content"], "Do not edit");
}

#[test]
fn unreadable_public_collection_is_left_untouched_by_create() {
    let desk = Desk::offline();
    let author = player("ana@example.org");
    desk.local.set(PUBLIC_NOTES_KEY, "[{broken").unwrap();
    let mut notes = desk.notes_for(&author);

    let note = notes
        .create(NoteDraft::new("Camp layout", "Tents by the river", false))
        .unwrap();

    assert_eq!(
        desk.local.get(PUBLIC_NOTES_KEY).unwrap().as_deref(),
        Some("[{broken")
    );
    assert_eq!(desk.ids(&own_key(&author)), vec![note.id]);
}

#[test]
fn unreadable_own_collection_fails_create_without_overwriting() {
    let desk = Desk::offline();
    let author = player("ana@example.org");
    desk.local.set(&own_key(&author), "not a list").unwrap();
    let mut notes = desk.notes_for(&author);

    let err = notes
        .create(NoteDraft::new("Camp layout", "Tents by the river", false))
        .unwrap_err();

    assert!(matches!(err, StoreError::Local(_)));
    assert_eq!(
        desk.local.get(&own_key(&author)).unwrap().as_deref(),
        Some("not a list")
    );
    assert!(desk.local.get(PUBLIC_NOTES_KEY).unwrap().is_none());
    assert!(notes.items().is_empty());
}
