//! Generic remote-first store.
//!
//! One instance serves one record type within one scope. Reads and writes go
//! to the remote table first; any remote failure is logged and the same
//! operation is applied to the local mirror instead.

use super::visibility::{partition_rows, project_public, read_visible, remove_record};
use super::{DataSource, ListCooldown, ListResult, Notice, StoreDeps, StoreError, StoreOptions};
use crate::local::{read_collection, write_collection, MirrorError};
use crate::model::entity::{Entity, MirrorLayout, OwnerRef, RecordId, StoreScope, ValidationError};
use crate::remote::{Filter, RemoteError, RemoteQuery, RemoteResult};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::de::Error as _;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::time::Instant;

/// Remote-first CRUD over one record type.
pub struct RemoteFirstStore<E: Entity> {
    deps: StoreDeps,
    options: StoreOptions,
    scope: StoreScope,
    items: Vec<E>,
    loading: bool,
    cooldown: ListCooldown,
    notice: Option<Notice>,
    error: Option<String>,
    last_source: Option<DataSource>,
}

impl<E: Entity> RemoteFirstStore<E> {
    pub fn new(deps: StoreDeps, options: StoreOptions) -> Self {
        Self::scoped(deps, options, StoreScope::unscoped())
    }

    pub fn scoped(deps: StoreDeps, options: StoreOptions, scope: StoreScope) -> Self {
        Self {
            deps,
            cooldown: ListCooldown::new(options.list_cooldown),
            options,
            scope,
            items: Vec::new(),
            loading: false,
            notice: None,
            error: None,
            last_source: None,
        }
    }

    pub fn scope(&self) -> StoreScope {
        self.scope
    }

    /// Rebinds the store; a different scope drops all in-memory state.
    pub fn set_scope(&mut self, scope: StoreScope) {
        if self.scope != scope {
            self.scope = scope;
            self.reset();
        }
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn get(&self, id: RecordId) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// True only while a list is in flight.
    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_source(&self) -> Option<DataSource> {
        self.last_source
    }

    /// Clears in-memory items, cooldown and messages. Mirrors are untouched.
    pub fn reset(&mut self) {
        self.items.clear();
        self.loading = false;
        self.cooldown.clear();
        self.notice = None;
        self.error = None;
        self.last_source = None;
    }

    /// Lists records, unless a list completed within the cooldown window.
    pub fn list(&mut self) -> ListResult<E> {
        let now = self.deps.clock.now();
        if let Some(remaining) = self.cooldown.remaining(now) {
            debug!(
                "event=store_list module=store table={} status=throttled remaining_ms={}",
                E::TABLE,
                remaining.as_millis()
            );
            return self.snapshot(DataSource::Cached);
        }
        self.refresh()
    }

    /// Lists records, ignoring the cooldown.
    pub fn refresh(&mut self) -> ListResult<E> {
        let viewer = self.deps.session.viewer();
        let layout = E::mirror_layout(&self.scope, &viewer);
        self.loading = true;

        let source = match self.fetch_remote(&viewer) {
            Ok(rows) => {
                self.mirror_remote_rows(&layout, &viewer, &rows);
                info!(
                    "event=store_list module=store table={} source=remote status=ok count={}",
                    E::TABLE,
                    rows.len()
                );
                self.items = rows;
                self.notice = None;
                self.error = None;
                DataSource::Remote
            }
            Err(remote_err) => {
                warn!(
                    "event=store_list module=store table={} source=remote status=fallback error_code={} error={}",
                    E::TABLE,
                    remote_err.code(),
                    remote_err
                );
                match read_visible::<E>(self.deps.local.as_ref(), &layout, &viewer) {
                    Ok(items) => {
                        self.items = items;
                        self.error = None;
                    }
                    Err(local_err) => {
                        warn!(
                            "event=store_list module=store table={} source=local status=error error={}",
                            E::TABLE,
                            local_err
                        );
                        self.items.clear();
                        self.error = Some(format!(
                            "{} unavailable remotely ({remote_err}) and locally ({local_err})",
                            E::TABLE
                        ));
                    }
                }
                self.notice = Some(Notice::ServedFromLocal {
                    reason: remote_err.code(),
                });
                DataSource::Local
            }
        };

        self.loading = false;
        self.cooldown.mark(self.deps.clock.now());
        self.last_source = Some(source);
        self.snapshot(source)
    }

    /// Creates a record remotely, or locally when the remote insert fails.
    ///
    /// # Errors
    /// - `Validation` when the draft is rejected or names a campaign other
    ///   than the bound one; nothing is written.
    /// - `Local` when the remote failed and the mirror could not be read or
    ///   written.
    pub fn create(&mut self, draft: E::Draft) -> Result<E, StoreError> {
        E::validate_draft(&draft)?;
        let scope = self.draft_write_scope(E::draft_scope(&draft))?;
        let fields = to_object(&draft)?;
        let viewer = self.deps.session.viewer();

        if self.deps.session.is_signed_in() {
            let mut row = fields.clone();
            row.insert(E::OWNER_COLUMN.to_string(), viewer.to_json());
            match self
                .deps
                .remote
                .insert(E::TABLE, Value::Object(row))
                .and_then(decode_row::<E>)
            {
                Ok(created) => {
                    info!(
                        "event=store_create module=store table={} source=remote status=ok id={}",
                        E::TABLE,
                        created.id()
                    );
                    self.refresh();
                    return Ok(created);
                }
                Err(err) => warn!(
                    "event=store_create module=store table={} source=remote status=fallback error_code={} error={}",
                    E::TABLE,
                    err.code(),
                    err
                ),
            }
        }

        let created = self.create_local(fields, &viewer, scope)?;
        info!(
            "event=store_create module=store table={} source=local status=ok id={}",
            E::TABLE,
            created.id()
        );
        self.notice = Some(Notice::SavedLocally);
        Ok(created)
    }

    /// Applies a partial update; returns whether a record was changed.
    ///
    /// A reachable remote that matches no row (unknown id, or not the owner)
    /// yields `Ok(false)` without touching the mirror. The patched record is
    /// validated as a whole before either tier is written.
    pub fn update(&mut self, id: RecordId, patch: E::Patch) -> Result<bool, StoreError> {
        E::validate_patch(&patch)?;
        let fields = to_object(&patch)?;
        if let Some(current) = self.get(id) {
            merge_patch(current, &fields, self.deps.clock.now())?.validate_record()?;
        }
        let viewer = self.deps.session.viewer();

        if self.deps.session.is_signed_in() {
            let filters = write_filters::<E>(id, &viewer);
            match self
                .deps
                .remote
                .update(E::TABLE, &filters, Value::Object(fields.clone()))
            {
                Ok(0) => {
                    warn!(
                        "event=store_update module=store table={} source=remote status=not_found id={}",
                        E::TABLE,
                        id
                    );
                    return Ok(false);
                }
                Ok(_) => {
                    info!(
                        "event=store_update module=store table={} source=remote status=ok id={}",
                        E::TABLE,
                        id
                    );
                    self.refresh();
                    return Ok(true);
                }
                Err(err) => warn!(
                    "event=store_update module=store table={} source=remote status=fallback error_code={} error={}",
                    E::TABLE,
                    err.code(),
                    err
                ),
            }
        }

        let updated = self.update_local(id, &fields, &viewer)?;
        if updated {
            self.notice = Some(Notice::UpdatedLocally);
        }
        Ok(updated)
    }

    /// Deletes a record; returns whether one was removed.
    pub fn delete(&mut self, id: RecordId) -> bool {
        let viewer = self.deps.session.viewer();

        if self.deps.session.is_signed_in() {
            let filters = write_filters::<E>(id, &viewer);
            match self.deps.remote.delete(E::TABLE, &filters) {
                Ok(0) => {
                    warn!(
                        "event=store_delete module=store table={} source=remote status=not_found id={}",
                        E::TABLE,
                        id
                    );
                    return false;
                }
                Ok(_) => {
                    info!(
                        "event=store_delete module=store table={} source=remote status=ok id={}",
                        E::TABLE,
                        id
                    );
                    self.refresh();
                    return true;
                }
                Err(err) => warn!(
                    "event=store_delete module=store table={} source=remote status=fallback error_code={} error={}",
                    E::TABLE,
                    err.code(),
                    err
                ),
            }
        }

        let deleted = self.delete_local(id, &viewer);
        if deleted {
            self.notice = Some(Notice::DeletedLocally);
        }
        deleted
    }

    fn snapshot(&self, source: DataSource) -> ListResult<E> {
        ListResult {
            items: self.items.clone(),
            source,
            loading: self.loading,
            notice: self.notice.clone(),
            error: self.error.clone(),
        }
    }

    fn fetch_remote(&self, viewer: &OwnerRef) -> RemoteResult<Vec<E>> {
        let timeout = self.options.list_timeout;
        let query = RemoteQuery::table(E::TABLE)
            .filters(E::list_filters(&self.scope, viewer))
            .order(E::list_order())
            .timeout(timeout);

        let started_at = Instant::now();
        let rows = self.deps.remote.select(&query)?;
        if started_at.elapsed() > timeout {
            return Err(RemoteError::Timeout {
                table: E::TABLE.to_string(),
                after: timeout,
            });
        }
        rows.into_iter().map(decode_row::<E>).collect()
    }

    fn mirror_remote_rows(&self, layout: &MirrorLayout, viewer: &OwnerRef, rows: &[E]) {
        let local = self.deps.local.as_ref();
        let outcome = match layout {
            MirrorLayout::Flat { key } => write_collection(local, key, rows),
            MirrorLayout::Partitioned {
                own_key,
                public_key,
            } => {
                let (mine, public) = partition_rows(rows, viewer);
                write_collection(local, own_key, &mine)
                    .and_then(|()| write_collection(local, public_key, &public))
            }
        };
        if let Err(err) = outcome {
            warn!(
                "event=mirror_write module=store table={} status=error error={}",
                E::TABLE,
                err
            );
        }
    }

    /// Scope a new record is mirrored under.
    fn draft_write_scope(
        &self,
        draft_scope: Option<RecordId>,
    ) -> Result<StoreScope, ValidationError> {
        match (self.scope.campaign_id, draft_scope) {
            (Some(expected), Some(actual)) if expected != actual => {
                Err(ValidationError::ScopeMismatch {
                    field: E::SCOPE_COLUMN.unwrap_or("campaign_id"),
                    expected,
                    actual,
                })
            }
            (None, Some(actual)) => Ok(StoreScope::campaign(actual)),
            _ => Ok(self.scope),
        }
    }

    /// Scope an existing record is mirrored under.
    fn record_write_scope(&self, id: RecordId) -> StoreScope {
        if self.scope.campaign_id.is_some() {
            return self.scope;
        }
        self.get(id)
            .and_then(|record| record.record_scope())
            .map_or(self.scope, StoreScope::campaign)
    }

    fn create_local(
        &mut self,
        mut fields: Map<String, Value>,
        viewer: &OwnerRef,
        scope: StoreScope,
    ) -> Result<E, StoreError> {
        let now = self.deps.clock.now();
        let layout = E::mirror_layout(&scope, viewer);
        let (own_key, public_key) = split_layout(&layout);
        let local = self.deps.local.as_ref();

        let mut own: Vec<E> = read_collection(local, own_key)?;
        // An unreadable public collection is left as-is; the record stays in
        // the own collection only.
        let mut public: Option<(&str, Vec<E>)> =
            public_key.and_then(|key| match read_collection(local, key) {
                Ok(records) => Some((key, records)),
                Err(err) => {
                    log_mirror_error("store_create", key, &err);
                    None
                }
            });

        let mut taken: BTreeSet<RecordId> = own.iter().map(|record| record.id()).collect();
        if let Some((_, records)) = &public {
            taken.extend(records.iter().map(|record| record.id()));
        }
        taken.extend(self.items.iter().map(|record| record.id()));
        let id = next_local_id(now, &taken);

        let stamp = serde_json::to_value(now)?;
        fields.insert("id".to_string(), Value::from(id));
        fields.insert("created_at".to_string(), stamp.clone());
        fields.insert("updated_at".to_string(), stamp);
        fields.insert(
            E::OWNER_COLUMN.to_string(),
            E::local_owner(viewer).to_json(),
        );
        let record: E = serde_json::from_value(Value::Object(fields))?;

        own.insert(0, record.clone());
        write_collection(local, own_key, &own)?;
        if let Some((key, records)) = public.as_mut() {
            project_public(records, &record);
            write_collection(local, *key, records.as_slice())?;
        }

        self.items.retain(|item| item.id() != id);
        self.items.insert(0, record.clone());
        Ok(record)
    }

    fn update_local(
        &mut self,
        id: RecordId,
        patch: &Map<String, Value>,
        viewer: &OwnerRef,
    ) -> Result<bool, StoreError> {
        let now = self.deps.clock.now();
        let layout = E::mirror_layout(&self.record_write_scope(id), viewer);
        let (own_key, public_key) = split_layout(&layout);
        let local = self.deps.local.as_ref();

        let mut own: Vec<E> = match read_collection(local, own_key) {
            Ok(records) => records,
            Err(err) => {
                log_mirror_error("store_update", own_key, &err);
                return Ok(false);
            }
        };
        let Some(index) = own.iter().position(|record| record.id() == id) else {
            debug!(
                "event=store_update module=store table={} source=local status=not_found id={}",
                E::TABLE,
                id
            );
            return Ok(false);
        };
        let merged = match merge_patch(&own[index], patch, now) {
            Ok(merged) => merged,
            Err(err) => {
                warn!(
                    "event=store_update module=store table={} source=local status=error id={} error={}",
                    E::TABLE,
                    id,
                    err
                );
                return Ok(false);
            }
        };
        merged.validate_record()?;

        own[index] = merged.clone();
        if let Err(err) = write_collection(local, own_key, &own) {
            log_mirror_error("store_update", own_key, &err);
            return Ok(false);
        }
        if let Some(key) = public_key {
            match read_collection::<E>(local, key) {
                Ok(mut public) => {
                    project_public(&mut public, &merged);
                    if let Err(err) = write_collection(local, key, &public) {
                        log_mirror_error("store_update", key, &err);
                    }
                }
                Err(err) => log_mirror_error("store_update", key, &err),
            }
        }

        if let Some(slot) = self.items.iter_mut().find(|item| item.id() == id) {
            *slot = merged;
        }
        info!(
            "event=store_update module=store table={} source=local status=ok id={}",
            E::TABLE,
            id
        );
        Ok(true)
    }

    fn delete_local(&mut self, id: RecordId, viewer: &OwnerRef) -> bool {
        let layout = E::mirror_layout(&self.record_write_scope(id), viewer);
        let (own_key, public_key) = split_layout(&layout);
        let local = self.deps.local.as_ref();

        let mut own: Vec<E> = match read_collection(local, own_key) {
            Ok(records) => records,
            Err(err) => {
                log_mirror_error("store_delete", own_key, &err);
                return false;
            }
        };
        if !remove_record(&mut own, id) {
            debug!(
                "event=store_delete module=store table={} source=local status=not_found id={}",
                E::TABLE,
                id
            );
            return false;
        }
        if let Err(err) = write_collection(local, own_key, &own) {
            log_mirror_error("store_delete", own_key, &err);
            return false;
        }
        if let Some(key) = public_key {
            match read_collection::<E>(local, key) {
                Ok(mut public) => {
                    if remove_record(&mut public, id) {
                        if let Err(err) = write_collection(local, key, &public) {
                            log_mirror_error("store_delete", key, &err);
                        }
                    }
                }
                Err(err) => log_mirror_error("store_delete", key, &err),
            }
        }

        self.items.retain(|item| item.id() != id);
        info!(
            "event=store_delete module=store table={} source=local status=ok id={}",
            E::TABLE,
            id
        );
        true
    }
}

/// Timestamp-derived id, bumped past ids already in use.
pub(crate) fn next_local_id(now: DateTime<Utc>, taken: &BTreeSet<RecordId>) -> RecordId {
    let mut id = now.timestamp_millis();
    while taken.contains(&id) {
        id += 1;
    }
    id
}

/// Overlays `patch` on `current` and refreshes `updated_at`.
pub(crate) fn merge_patch<E: Entity>(
    current: &E,
    patch: &Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<E, serde_json::Error> {
    let Value::Object(mut fields) = serde_json::to_value(current)? else {
        return Err(serde_json::Error::custom("record is not a JSON object"));
    };
    for (key, value) in patch {
        fields.insert(key.clone(), value.clone());
    }
    fields.insert("updated_at".to_string(), serde_json::to_value(now)?);
    serde_json::from_value(Value::Object(fields))
}

fn write_filters<E: Entity>(id: RecordId, viewer: &OwnerRef) -> Vec<Filter> {
    let mut filters = vec![Filter::eq("id", id)];
    if E::OWNER_SCOPED_WRITES {
        filters.push(Filter::eq(E::OWNER_COLUMN, viewer.to_json()));
    }
    filters
}

fn decode_row<E: Entity>(row: Value) -> RemoteResult<E> {
    serde_json::from_value(row)
        .map_err(|err| RemoteError::InvalidResponse(format!("{} row: {err}", E::TABLE)))
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(serde_json::Error::custom("payload is not a JSON object")),
    }
}

fn split_layout(layout: &MirrorLayout) -> (&str, Option<&str>) {
    match layout {
        MirrorLayout::Flat { key } => (key.as_str(), None),
        MirrorLayout::Partitioned {
            own_key,
            public_key,
        } => (own_key.as_str(), Some(public_key.as_str())),
    }
}

fn log_mirror_error(event: &str, key: &str, err: &MirrorError) {
    warn!(
        "event={} module=store source=local status=degraded key={} error={}",
        event, key, err
    );
}

#[cfg(test)]
mod tests {
    use super::{merge_patch, next_local_id};
    use crate::model::entity::OwnerRef;
    use crate::model::plot::{Plot, PlotStatus};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;
    use std::collections::BTreeSet;

    #[test]
    fn local_id_skips_taken_values() {
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let base = now.timestamp_millis();
        let taken = BTreeSet::from([base, base + 1]);
        assert_eq!(next_local_id(now, &taken), base + 2);
        assert_eq!(next_local_id(now, &BTreeSet::new()), base);
    }

    #[test]
    fn merge_patch_overlays_fields_and_bumps_updated_at() {
        let created = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let plot = Plot {
            id: 11,
            campaign_id: 3,
            title: "Border skirmish".to_string(),
            description: Some("Scouts report movement".to_string()),
            status: PlotStatus::Draft,
            priority: 3,
            created_by: OwnerRef::Local,
            created_at: created,
            updated_at: created,
        };
        let later = created + Duration::minutes(5);
        let patch = json!({"status": "active", "priority": 1});
        let merged = merge_patch(&plot, patch.as_object().unwrap(), later).unwrap();

        assert_eq!(merged.status, PlotStatus::Active);
        assert_eq!(merged.priority, 1);
        assert_eq!(merged.title, plot.title);
        assert_eq!(merged.description, plot.description);
        assert_eq!(merged.created_at, created);
        assert_eq!(merged.updated_at, later);
    }
}
