//! Tracker record writer
//!
//! The [`Tracker`] is the engine's write path: invoked from the host
//! mapper's pre/post-mutation hooks, it extracts the change set, walks
//! the association chain, allocates the next version, persists the
//! tracker entry, and marks superseded entries at the same location.
//!
//! Every decision to skip is silent (logged at debug level):
//! a disabled gate, an action the type does not track, or a no-op
//! change set. Store failures propagate to the caller so the triggering
//! mutation can fail together with its tracker write.

use crate::chain::{association_path, traverse_association_chain};
use crate::context::TrackingContext;
use crate::registry::{DestroyPolicy, TrackableTypeConfig, TrackerRegistry};
use chronicle_core::{
    ChangeSet, EntryFilter, EntryId, EntryPatch, MetricCache, ModifierResolver, Result, Timestamp,
    TrackAction, Trackable, TrackerEntry, TrackerStore, INVALIDATE_NEVER,
};
use std::sync::Arc;
use tracing::debug;

/// Change-capture and tracker-record engine
///
/// Holds the registry and the persistence collaborators; all state is
/// shared and read-only, so one `Tracker` serves every execution
/// context (per-context state lives in [`TrackingContext`]).
pub struct Tracker {
    registry: Arc<TrackerRegistry>,
    store: Arc<dyn TrackerStore>,
    metrics: Arc<dyn MetricCache>,
    modifier: Arc<dyn ModifierResolver>,
}

impl Tracker {
    /// Assemble a tracker from its collaborators
    pub fn new(
        registry: Arc<TrackerRegistry>,
        store: Arc<dyn TrackerStore>,
        metrics: Arc<dyn MetricCache>,
        modifier: Arc<dyn ModifierResolver>,
    ) -> Self {
        Tracker {
            registry,
            store,
            metrics,
            modifier,
        }
    }

    /// The registry this tracker consults
    pub fn registry(&self) -> &TrackerRegistry {
        &self.registry
    }

    /// The store this tracker persists into
    pub(crate) fn store(&self) -> &dyn TrackerStore {
        self.store.as_ref()
    }

    /// Record a create action
    ///
    /// No-op unless the gate is open, the type tracks creates, and the
    /// create diff is non-empty under the policy.
    pub fn record_create(
        &self,
        record: &mut dyn Trackable,
        ctx: &mut TrackingContext,
    ) -> Result<Option<EntryId>> {
        let config = self.registry.config_for(record.type_name())?;
        begin_root_operation(record, ctx, config);
        if !ctx.tracking_enabled(record.type_name()) || !config.track_create {
            return Ok(None);
        }
        if coalesced_into_current_operation(record, ctx, config) {
            debug!(type_name = record.type_name(), "create already covered by operation");
            return Ok(None);
        }

        let changes = ChangeSet::from_create(&record.field_values(), &config.policy);
        if changes.is_empty() {
            debug!(type_name = record.type_name(), "empty create diff, skipping");
            return Ok(None);
        }

        self.persist(record, ctx, config, TrackAction::Create, changes, false)
            .map(Some)
    }

    /// Record an update action
    ///
    /// No-op unless the gate is open, the type tracks updates, and the
    /// change set is non-empty under the policy. Prior entries at the
    /// same `(record_id, association_path)` get their `invalidate`
    /// stamped with their age at this moment.
    pub fn record_update(
        &self,
        record: &mut dyn Trackable,
        ctx: &mut TrackingContext,
    ) -> Result<Option<EntryId>> {
        let config = self.registry.config_for(record.type_name())?;
        begin_root_operation(record, ctx, config);
        if !ctx.tracking_enabled(record.type_name()) || !config.track_update {
            return Ok(None);
        }

        let changes = ChangeSet::from_update(&record.changed_fields(), &config.policy);
        if changes.is_empty() {
            debug!(type_name = record.type_name(), "no-op change, skipping");
            return Ok(None);
        }
        if coalesced_into_current_operation(record, ctx, config) {
            debug!(type_name = record.type_name(), "update already covered by operation");
            return Ok(None);
        }

        self.persist(record, ctx, config, TrackAction::Update, changes, true)
            .map(Some)
    }

    /// Record a destroy action (aggregate roots only)
    ///
    /// Behavior follows the type's [`DestroyPolicy`]: either a final
    /// destroy entry is written (returning its id), or the record's
    /// whole history is purged (returning `None`).
    pub fn record_destroy(
        &self,
        record: &mut dyn Trackable,
        ctx: &mut TrackingContext,
    ) -> Result<Option<EntryId>> {
        let config = self.registry.config_for(record.type_name())?;
        if !ctx.tracking_enabled(record.type_name()) || !config.track_destroy {
            return Ok(None);
        }
        if record.parent().is_some() {
            debug!(type_name = record.type_name(), "destroy of embedded record, skipping");
            return Ok(None);
        }

        match config.destroy_policy {
            DestroyPolicy::RecordEntry => {
                // Destroy entries persist even when the diff is empty;
                // the entry itself is the audit fact.
                let changes = ChangeSet::from_destroy(&record.field_values());
                self.persist(record, ctx, config, TrackAction::Destroy, changes, false)
                    .map(Some)
            }
            DestroyPolicy::PurgeHistory => {
                let deleted = self
                    .store
                    .bulk_delete(&EntryFilter::by_record(record.id()))?;
                debug!(
                    type_name = record.type_name(),
                    deleted, "purged history on destroy"
                );
                self.metrics.invalidate(&config.scope);
                Ok(None)
            }
        }
    }

    /// Allocate the version, stamp the record, build and persist the entry
    fn persist(
        &self,
        record: &mut dyn Trackable,
        ctx: &TrackingContext,
        config: &TrackableTypeConfig,
        action: TrackAction,
        changes: ChangeSet,
        invalidate_superseded: bool,
    ) -> Result<EntryId> {
        let version = record.version().unwrap_or(0) + 1;
        record.set_version(version);
        if let Some(transaction_id) = ctx.current_transaction_id() {
            record.set_transaction_id(transaction_id.to_string());
        }

        // Chain is walked after stamping so the leaf node carries the
        // fresh correlation id.
        let chain = traverse_association_chain(record);
        let path = association_path(&chain);
        let record_id = chain[0].id.clone();
        let now = Timestamp::now();

        if invalidate_superseded {
            self.store.bulk_update(
                &EntryFilter::by_location(record_id.clone(), path.clone()),
                &EntryPatch::InvalidateAgeAt(now),
            )?;
        }

        let (original, modified) = changes.split();
        let entry = TrackerEntry {
            created_at: now,
            scope: config.scope.clone(),
            action,
            association_chain: chain,
            association_path: path,
            record_id,
            version,
            modifier: self.modifier.current_modifier(),
            original,
            modified,
            data: record.field_values(),
            invalidate: INVALIDATE_NEVER,
        };

        let id = self.store.insert(entry)?;
        self.metrics.invalidate(&config.scope);
        Ok(id)
    }
}

/// Open a new logical operation when a scope root is saved
///
/// Runs on every root save, before any skip decision: a no-op or
/// untracked root save still rotates the correlation id, so children
/// saved afterward are never coalesced into the previous operation.
fn begin_root_operation(
    record: &mut dyn Trackable,
    ctx: &mut TrackingContext,
    config: &TrackableTypeConfig,
) {
    if config.scope == record.type_name() {
        let transaction_id = ctx.begin_operation();
        record.set_transaction_id(transaction_id);
    }
}

/// Check whether this save is already covered by the operation in flight
///
/// A record whose stamped transaction id equals the context's current
/// one was already recorded as part of the same logical save. The scope
/// root itself is always recorded: its save is what opens an operation.
fn coalesced_into_current_operation(
    record: &dyn Trackable,
    ctx: &TrackingContext,
    config: &TrackableTypeConfig,
) -> bool {
    if config.scope == record.type_name() {
        return false;
    }
    match (record.transaction_id(), ctx.current_transaction_id()) {
        (Some(stamped), Some(current)) => stamped == current,
        _ => false,
    }
}
