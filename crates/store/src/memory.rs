//! In-memory tracker store
//!
//! Reference implementation of the persistence collaborators:
//! - `MemoryTrackerStore`: entry-shaped document store behind a
//!   `parking_lot::RwLock`, with secondary indexes on `record_id` and
//!   `scope` so the hot filters (supersession, destroy-purge, history,
//!   pruning) avoid full scans
//! - `MemoryMetricCache`: derived aggregate cache keyed by scope
//! - `FixedModifier`: constant modifier resolver for hosts and tests
//!
//! A production host replaces `MemoryTrackerStore` with its own document
//! store behind the same `TrackerStore` trait; filters stay the simple
//! equality/range predicates evaluated here.

use chronicle_core::{
    EntryFilter, EntryId, EntryPatch, FieldMap, MetricCache, ModifierResolver, Result,
    TrackerEntry, TrackerStore, Value,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

#[derive(Default)]
struct StoreInner {
    next_id: u64,
    entries: BTreeMap<EntryId, TrackerEntry>,
    by_record: HashMap<String, BTreeSet<EntryId>>,
    by_scope: HashMap<String, BTreeSet<EntryId>>,
}

impl StoreInner {
    /// Ids worth checking for a filter, narrowed through an index when
    /// the filter pins record_id or scope; in ascending id order either way
    fn candidates(&self, filter: &EntryFilter) -> Vec<EntryId> {
        if let Some(record_id) = &filter.record_id {
            return self
                .by_record
                .get(record_id)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default();
        }
        if let Some(scope) = &filter.scope {
            return self
                .by_scope
                .get(scope)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default();
        }
        self.entries.keys().copied().collect()
    }

    fn unindex(&mut self, id: EntryId, entry: &TrackerEntry) {
        if let Some(ids) = self.by_record.get_mut(&entry.record_id) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_record.remove(&entry.record_id);
            }
        }
        if let Some(ids) = self.by_scope.get_mut(&entry.scope) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_scope.remove(&entry.scope);
            }
        }
    }
}

/// In-memory entry store with record_id and scope indexes
#[derive(Default)]
pub struct MemoryTrackerStore {
    inner: RwLock<StoreInner>,
}

impl MemoryTrackerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored entries
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Check if the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

impl TrackerStore for MemoryTrackerStore {
    fn insert(&self, entry: TrackerEntry) -> Result<EntryId> {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = EntryId(inner.next_id);

        inner
            .by_record
            .entry(entry.record_id.clone())
            .or_default()
            .insert(id);
        inner
            .by_scope
            .entry(entry.scope.clone())
            .or_default()
            .insert(id);
        inner.entries.insert(id, entry);
        Ok(id)
    }

    fn find(&self, filter: &EntryFilter) -> Result<Vec<TrackerEntry>> {
        let inner = self.inner.read();
        let matches = inner
            .candidates(filter)
            .into_iter()
            .filter_map(|id| inner.entries.get(&id))
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect();
        Ok(matches)
    }

    fn bulk_update(&self, filter: &EntryFilter, patch: &EntryPatch) -> Result<usize> {
        let mut inner = self.inner.write();
        let ids = inner.candidates(filter);
        let mut updated = 0;
        for id in ids {
            if let Some(entry) = inner.entries.get_mut(&id) {
                if filter.matches(entry) {
                    patch.apply(entry);
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    fn bulk_delete(&self, filter: &EntryFilter) -> Result<usize> {
        let mut inner = self.inner.write();
        let doomed: Vec<EntryId> = inner
            .candidates(filter)
            .into_iter()
            .filter(|id| {
                inner
                    .entries
                    .get(id)
                    .map(|entry| filter.matches(entry))
                    .unwrap_or(false)
            })
            .collect();

        for id in &doomed {
            if let Some(entry) = inner.entries.remove(id) {
                inner.unindex(*id, &entry);
            }
        }
        if !doomed.is_empty() {
            debug!(count = doomed.len(), "deleted tracker entries");
        }
        Ok(doomed.len())
    }
}

/// Derived aggregate cache keyed by scope
///
/// Hosts park recomputed metrics here between tracker writes; every
/// write drops the affected scope, forcing recomputation on next read.
#[derive(Default)]
pub struct MemoryMetricCache {
    scopes: DashMap<String, FieldMap>,
}

impl MemoryMetricCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a computed metric under a scope
    pub fn put(&self, scope: &str, metric: &str, value: Value) {
        self.scopes
            .entry(scope.to_string())
            .or_default()
            .insert(metric.to_string(), value);
    }

    /// Fetch a cached metric, if the scope has not been invalidated
    pub fn get(&self, scope: &str, metric: &str) -> Option<Value> {
        self.scopes
            .get(scope)
            .and_then(|metrics| metrics.get(metric).cloned())
    }

    /// Number of scopes currently cached
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }
}

impl MetricCache for MemoryMetricCache {
    fn invalidate(&self, scope: &str) {
        if self.scopes.remove(scope).is_some() {
            debug!(scope, "dropped cached metrics");
        }
    }
}

/// Modifier resolver returning a constant identity
///
/// Hosts with real session machinery implement `ModifierResolver`
/// against it; this covers single-user tools and tests.
pub struct FixedModifier(Option<String>);

impl FixedModifier {
    /// Resolve every change to the given identity
    pub fn new(modifier: impl Into<String>) -> Self {
        FixedModifier(Some(modifier.into()))
    }

    /// Resolve no identity (changes are recorded without a modifier)
    pub fn anonymous() -> Self {
        FixedModifier(None)
    }
}

impl ModifierResolver for FixedModifier {
    fn current_modifier(&self) -> Option<String> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::{AssociationNode, Timestamp, TrackAction, INVALIDATE_NEVER};

    fn entry(scope: &str, record_id: &str, path: &str, version: u64, created_ms: u64) -> TrackerEntry {
        TrackerEntry {
            created_at: Timestamp::from_millis(created_ms),
            scope: scope.into(),
            action: TrackAction::Update,
            association_chain: vec![AssociationNode::new(scope, record_id)],
            association_path: path.into(),
            record_id: record_id.into(),
            version,
            modifier: None,
            original: FieldMap::new(),
            modified: FieldMap::new(),
            data: FieldMap::new(),
            invalidate: INVALIDATE_NEVER,
        }
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let store = MemoryTrackerStore::new();
        let id1 = store.insert(entry("post", "p1", "", 1, 100)).unwrap();
        let id2 = store.insert(entry("post", "p1", "", 2, 200)).unwrap();
        assert!(id2 > id1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_find_returns_oldest_first() {
        let store = MemoryTrackerStore::new();
        store.insert(entry("post", "p1", "", 1, 100)).unwrap();
        store.insert(entry("post", "p1", "", 2, 200)).unwrap();
        store.insert(entry("post", "p2", "", 1, 300)).unwrap();

        let found = store.find(&EntryFilter::by_record("p1")).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].version, 1);
        assert_eq!(found[1].version, 2);
    }

    #[test]
    fn test_find_narrows_through_scope_index() {
        let store = MemoryTrackerStore::new();
        store.insert(entry("post", "p1", "", 1, 100)).unwrap();
        store.insert(entry("order", "o1", "", 1, 100)).unwrap();

        let filter = EntryFilter {
            scope: Some("order".into()),
            ..Default::default()
        };
        let found = store.find(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].record_id, "o1");
    }

    #[test]
    fn test_find_unindexed_filter_scans_all() {
        let store = MemoryTrackerStore::new();
        store.insert(entry("post", "p1", "", 1, 100)).unwrap();
        store.insert(entry("order", "o1", "", 7, 100)).unwrap();

        let filter = EntryFilter {
            version_in: Some(vec![7]),
            ..Default::default()
        };
        let found = store.find(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].version, 7);
    }

    #[test]
    fn test_bulk_update_applies_patch_to_matches_only() {
        let store = MemoryTrackerStore::new();
        store.insert(entry("post", "p1", "", 1, 1_000)).unwrap();
        store.insert(entry("post", "p1", "comment", 2, 2_000)).unwrap();

        let updated = store
            .bulk_update(
                &EntryFilter::by_location("p1", ""),
                &EntryPatch::InvalidateAgeAt(Timestamp::from_millis(10_000)),
            )
            .unwrap();
        assert_eq!(updated, 1);

        let all = store.find(&EntryFilter::by_record("p1")).unwrap();
        assert_eq!(all[0].invalidate, 9_000);
        assert_eq!(all[1].invalidate, INVALIDATE_NEVER);
    }

    #[test]
    fn test_bulk_delete_removes_and_unindexes() {
        let store = MemoryTrackerStore::new();
        store.insert(entry("post", "p1", "", 1, 100)).unwrap();
        store.insert(entry("post", "p1", "", 2, 200)).unwrap();
        store.insert(entry("post", "p2", "", 1, 300)).unwrap();

        let deleted = store.bulk_delete(&EntryFilter::by_record("p1")).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.len(), 1);
        assert!(store.find(&EntryFilter::by_record("p1")).unwrap().is_empty());

        // Deleting again is a no-op, not an error
        assert_eq!(store.bulk_delete(&EntryFilter::by_record("p1")).unwrap(), 0);
    }

    #[test]
    fn test_bulk_delete_conjunction_of_range_predicates() {
        let store = MemoryTrackerStore::new();
        // Superseded long ago AND old: pruned
        let mut doomed = entry("post", "p1", "", 1, 1_000);
        doomed.invalidate = 5_000;
        store.insert(doomed).unwrap();
        // Superseded but too recent: survives
        let mut recent = entry("post", "p1", "", 2, 900_000);
        recent.invalidate = 5_000;
        store.insert(recent).unwrap();
        // Old but never superseded: survives
        store.insert(entry("post", "p1", "", 3, 1_000)).unwrap();

        let filter = EntryFilter {
            invalidate_below: Some(3_600_000),
            created_before: Some(Timestamp::from_millis(500_000)),
            ..Default::default()
        };
        assert_eq!(store.bulk_delete(&filter).unwrap(), 1);

        let survivors = store.find(&EntryFilter::by_record("p1")).unwrap();
        let versions: Vec<u64> = survivors.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![2, 3]);
    }

    #[test]
    fn test_metric_cache_invalidation_is_per_scope() {
        let cache = MemoryMetricCache::new();
        cache.put("post", "count", Value::Int(10));
        cache.put("order", "count", Value::Int(3));

        cache.invalidate("post");
        assert_eq!(cache.get("post", "count"), None);
        assert_eq!(cache.get("order", "count"), Some(Value::Int(3)));
        assert_eq!(cache.scope_count(), 1);
    }

    #[test]
    fn test_fixed_modifier() {
        assert_eq!(
            FixedModifier::new("ops@example.com").current_modifier(),
            Some("ops@example.com".to_string())
        );
        assert_eq!(FixedModifier::anonymous().current_modifier(), None);
    }
}
