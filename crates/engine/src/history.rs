//! Audit history retrieval
//!
//! `history_for` returns a record's tracker entries, newest first,
//! selected by explicit versions, an inclusive range, or "the last N".
//! Matching follows the write path's grouping: same scope, and the
//! entry's association chain contains the record's own node, so an
//! embedded record sees exactly the entries written for it.

use crate::writer::Tracker;
use chronicle_core::{EntryFilter, Error, Result, Trackable, TrackerEntry};

/// Which versions of a record's history to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    /// An explicit set of versions
    Versions(Vec<u64>),
    /// An inclusive range; `from`/`to` may arrive in either order
    Range {
        /// One end of the range
        from: u64,
        /// The other end of the range
        to: u64,
    },
    /// The N most recent versions
    Last(usize),
}

impl VersionSelector {
    /// Reject degenerate selectors before touching the store
    fn validate(&self) -> Result<()> {
        match self {
            VersionSelector::Versions(versions) if versions.is_empty() => Err(
                Error::InvalidSelector("empty version set".to_string()),
            ),
            VersionSelector::Last(0) => Err(Error::InvalidSelector(
                "last must be at least 1".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl Tracker {
    /// Fetch a record's tracker entries in descending version order
    ///
    /// # Errors
    ///
    /// `Error::InvalidSelector` for degenerate selectors; store errors
    /// propagate.
    pub fn history_for(
        &self,
        record: &dyn Trackable,
        selector: &VersionSelector,
    ) -> Result<Vec<TrackerEntry>> {
        selector.validate()?;
        let config = self.registry().config_for(record.type_name())?;

        // Version predicates go into the store filter so a real backend
        // can answer them with an index
        let mut filter = EntryFilter {
            scope: Some(config.scope.clone()),
            chain_node: Some((record.type_name().to_string(), record.id())),
            ..Default::default()
        };
        match selector {
            VersionSelector::Versions(versions) => filter.version_in = Some(versions.clone()),
            VersionSelector::Range { from, to } => {
                // Auto-normalize so callers may pass the ends either way
                let (lower, upper) = if from <= to { (*from, *to) } else { (*to, *from) };
                filter.version_between = Some((lower, upper));
            }
            VersionSelector::Last(_) => {}
        }

        let mut entries = self.store().find(&filter)?;
        entries.sort_by(|a, b| b.version.cmp(&a.version));
        if let VersionSelector::Last(n) = selector {
            entries.truncate(*n);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TrackingContext;
    use crate::registry::{TrackableTypeConfig, TrackerRegistry};
    use crate::testing::SampleRecord;
    use chronicle_core::{EntryId, EntryPatch, MetricCache, TrackerStore, Value};
    use chronicle_store::{FixedModifier, MemoryMetricCache, MemoryTrackerStore};
    use std::sync::{Arc, Mutex};

    fn tracker_with(configs: Vec<TrackableTypeConfig>) -> Tracker {
        let mut registry = TrackerRegistry::new();
        for config in configs {
            registry.register(config).unwrap();
        }
        Tracker::new(
            Arc::new(registry),
            Arc::new(MemoryTrackerStore::new()) as Arc<dyn TrackerStore>,
            Arc::new(MemoryMetricCache::new()) as Arc<dyn MetricCache>,
            Arc::new(FixedModifier::anonymous()),
        )
    }

    /// Create the record and run `updates` tracked qty bumps, yielding
    /// versions 1..=updates+1
    fn seeded(tracker: &Tracker, updates: i64) -> SampleRecord {
        let mut record = SampleRecord::new("order", "o1");
        record.insert_field("qty", Value::Int(0));
        let mut ctx = TrackingContext::new();
        tracker.record_create(&mut record, &mut ctx).unwrap();
        for qty in 1..=updates {
            record.clear_changes();
            record.set_field("qty", Value::Int(qty));
            tracker.record_update(&mut record, &mut ctx).unwrap();
        }
        record
    }

    #[test]
    fn test_last_n_descending() {
        let tracker = tracker_with(vec![TrackableTypeConfig::new("order").track_create(true)]);
        let record = seeded(&tracker, 4); // versions 1..=5

        let entries = tracker
            .history_for(&record, &VersionSelector::Last(2))
            .unwrap();
        let versions: Vec<u64> = entries.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![5, 4]);
    }

    #[test]
    fn test_last_one_is_most_recent() {
        let tracker = tracker_with(vec![TrackableTypeConfig::new("order").track_create(true)]);
        let record = seeded(&tracker, 2); // versions 1..=3

        let entries = tracker
            .history_for(&record, &VersionSelector::Last(1))
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].version, 3);
        assert_eq!(entries[0].modified.get("qty"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_explicit_versions() {
        let tracker = tracker_with(vec![TrackableTypeConfig::new("order").track_create(true)]);
        let record = seeded(&tracker, 4);

        let entries = tracker
            .history_for(&record, &VersionSelector::Versions(vec![1, 3, 99]))
            .unwrap();
        let versions: Vec<u64> = entries.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![3, 1]);
    }

    #[test]
    fn test_range_normalizes_reversed_bounds() {
        let tracker = tracker_with(vec![TrackableTypeConfig::new("order").track_create(true)]);
        let record = seeded(&tracker, 4);

        let forward = tracker
            .history_for(&record, &VersionSelector::Range { from: 2, to: 4 })
            .unwrap();
        let reversed = tracker
            .history_for(&record, &VersionSelector::Range { from: 4, to: 2 })
            .unwrap();
        assert_eq!(forward, reversed);

        let versions: Vec<u64> = forward.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![4, 3, 2]);
    }

    #[test]
    fn test_degenerate_selectors_fail_fast() {
        let tracker = tracker_with(vec![TrackableTypeConfig::new("order")]);
        let record = SampleRecord::new("order", "o1");

        let err = tracker
            .history_for(&record, &VersionSelector::Versions(vec![]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelector(_)));

        let err = tracker
            .history_for(&record, &VersionSelector::Last(0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelector(_)));
    }

    /// Store wrapper capturing the filter each `find` receives
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryTrackerStore,
        last_filter: Mutex<Option<EntryFilter>>,
    }

    impl TrackerStore for RecordingStore {
        fn insert(&self, entry: TrackerEntry) -> chronicle_core::Result<EntryId> {
            self.inner.insert(entry)
        }
        fn find(&self, filter: &EntryFilter) -> chronicle_core::Result<Vec<TrackerEntry>> {
            *self.last_filter.lock().unwrap() = Some(filter.clone());
            self.inner.find(filter)
        }
        fn bulk_update(
            &self,
            filter: &EntryFilter,
            patch: &EntryPatch,
        ) -> chronicle_core::Result<usize> {
            self.inner.bulk_update(filter, patch)
        }
        fn bulk_delete(&self, filter: &EntryFilter) -> chronicle_core::Result<usize> {
            self.inner.bulk_delete(filter)
        }
    }

    #[test]
    fn test_version_predicates_reach_the_store() {
        let store = Arc::new(RecordingStore::default());
        let mut registry = TrackerRegistry::new();
        registry.register(TrackableTypeConfig::new("order")).unwrap();
        let tracker = Tracker::new(
            Arc::new(registry),
            Arc::clone(&store) as Arc<dyn TrackerStore>,
            Arc::new(MemoryMetricCache::new()) as Arc<dyn MetricCache>,
            Arc::new(FixedModifier::anonymous()),
        );
        let record = SampleRecord::new("order", "o1");

        tracker
            .history_for(&record, &VersionSelector::Versions(vec![1, 3]))
            .unwrap();
        let filter = store.last_filter.lock().unwrap().clone().unwrap();
        assert_eq!(filter.version_in, Some(vec![1, 3]));
        assert_eq!(filter.version_between, None);

        tracker
            .history_for(&record, &VersionSelector::Range { from: 5, to: 2 })
            .unwrap();
        let filter = store.last_filter.lock().unwrap().clone().unwrap();
        assert_eq!(filter.version_between, Some((2, 5)));
        assert_eq!(filter.version_in, None);

        tracker
            .history_for(&record, &VersionSelector::Last(2))
            .unwrap();
        let filter = store.last_filter.lock().unwrap().clone().unwrap();
        assert_eq!(filter.version_in, None);
        assert_eq!(filter.version_between, None);
    }

    #[test]
    fn test_embedded_record_sees_only_its_entries() {
        let tracker = tracker_with(vec![
            TrackableTypeConfig::new("order").track_create(true),
            TrackableTypeConfig::new("item").scope("order"),
        ]);
        let root = seeded(&tracker, 1); // root versions 1, 2

        let mut item = SampleRecord::new("item", "i1").with_parent(root.clone());
        item.insert_field("sku", Value::from("x"));
        let mut ctx = TrackingContext::new();
        item.set_field("sku", Value::from("y"));
        tracker.record_update(&mut item, &mut ctx).unwrap();

        let item_history = tracker
            .history_for(&item, &VersionSelector::Last(10))
            .unwrap();
        assert_eq!(item_history.len(), 1);
        assert_eq!(item_history[0].association_path, "item");

        let root_history = tracker
            .history_for(&root, &VersionSelector::Last(10))
            .unwrap();
        // Root node appears in every chain of its aggregate
        assert_eq!(root_history.len(), 3);
    }
}
