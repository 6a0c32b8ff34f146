//! Collaborator traits and store predicate types
//!
//! The tracking core owns no persistence or schema of its own; it talks
//! to its host through these seams:
//! - [`Trackable`]: record introspection (identity, parent chain, field
//!   values, dirty tracking, version/transaction stamps)
//! - [`TrackerStore`]: the entry-shaped document store
//! - [`MetricCache`]: derived aggregate cache dropped on every write
//! - [`ModifierResolver`]: ambient "who made this change" lookup
//!
//! Thread safety: store, cache, and resolver implementations must be
//! callable concurrently from multiple execution contexts
//! (`Send + Sync`); records themselves are mutated from exactly one
//! context at a time.

use crate::changeset::ChangedFields;
use crate::error::Result;
use crate::types::{EntryId, Timestamp, TrackerEntry};
use crate::value::FieldMap;

// ============================================================================
// Record introspection
// ============================================================================

/// Capability interface host record types implement to be tracked
///
/// The core operates purely through this interface; it never owns the
/// record or its parent (parents are borrowed back-references).
pub trait Trackable {
    /// Type name, matching the name the type was registered under
    fn type_name(&self) -> &str;

    /// The record's own identifier
    fn id(&self) -> String;

    /// Parent record, if this record is embedded in one
    fn parent(&self) -> Option<&dyn Trackable>;

    /// Best-effort ordinal of this record within its parent's collection
    fn position_in_parent(&self) -> Option<usize> {
        None
    }

    /// Current full field snapshot
    fn field_values(&self) -> FieldMap;

    /// Dirty fields as before/after pairs, per the host mapper
    fn changed_fields(&self) -> ChangedFields;

    /// Current tracking version, if one has been assigned
    fn version(&self) -> Option<u64>;

    /// Write back the allocated tracking version
    fn set_version(&mut self, version: u64);

    /// Transaction correlation id last stamped on this record
    fn transaction_id(&self) -> Option<String>;

    /// Stamp a transaction correlation id onto this record
    fn set_transaction_id(&mut self, transaction_id: String);
}

// ============================================================================
// Persistence
// ============================================================================

/// Equality/range predicate over tracker entries
///
/// All present conditions must hold (conjunction). This is the only
/// filter shape the core needs from its store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    /// Entry scope equals
    pub scope: Option<String>,
    /// Entry record_id equals
    pub record_id: Option<String>,
    /// Entry association_path equals
    pub association_path: Option<String>,
    /// Entry association_chain contains a node with this (type_name, id)
    pub chain_node: Option<(String, String)>,
    /// Entry version is one of these
    pub version_in: Option<Vec<u64>>,
    /// Entry version lies within this inclusive `(lower, upper)` range
    pub version_between: Option<(u64, u64)>,
    /// Entry invalidate is strictly below this value
    pub invalidate_below: Option<u64>,
    /// Entry created_at is strictly before this timestamp
    pub created_before: Option<Timestamp>,
}

impl EntryFilter {
    /// Filter for every entry of one aggregate root
    pub fn by_record(record_id: impl Into<String>) -> Self {
        EntryFilter {
            record_id: Some(record_id.into()),
            ..Default::default()
        }
    }

    /// Filter for entries at one location inside an aggregate
    pub fn by_location(record_id: impl Into<String>, association_path: impl Into<String>) -> Self {
        EntryFilter {
            record_id: Some(record_id.into()),
            association_path: Some(association_path.into()),
            ..Default::default()
        }
    }

    /// Check an entry against this filter
    ///
    /// Store implementations may use this directly after narrowing
    /// candidates through whatever indexes they keep.
    pub fn matches(&self, entry: &TrackerEntry) -> bool {
        if let Some(scope) = &self.scope {
            if &entry.scope != scope {
                return false;
            }
        }
        if let Some(record_id) = &self.record_id {
            if &entry.record_id != record_id {
                return false;
            }
        }
        if let Some(path) = &self.association_path {
            if &entry.association_path != path {
                return false;
            }
        }
        if let Some((type_name, id)) = &self.chain_node {
            let found = entry
                .association_chain
                .iter()
                .any(|node| &node.type_name == type_name && &node.id == id);
            if !found {
                return false;
            }
        }
        if let Some(versions) = &self.version_in {
            if !versions.contains(&entry.version) {
                return false;
            }
        }
        if let Some((lower, upper)) = self.version_between {
            if entry.version < lower || entry.version > upper {
                return false;
            }
        }
        if let Some(below) = self.invalidate_below {
            if entry.invalidate >= below {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if !entry.created_at.is_before(before) {
                return false;
            }
        }
        true
    }
}

/// Mutation applied to every entry matching a filter
///
/// `invalidate` is the only mutable field of a persisted entry, so this
/// is deliberately narrow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryPatch {
    /// Set `invalidate` to a fixed value
    SetInvalidate(u64),
    /// Set `invalidate` to the entry's age at the given instant,
    /// in milliseconds (`now - created_at`), the supersession stamp
    InvalidateAgeAt(Timestamp),
}

impl EntryPatch {
    /// Apply this patch to one entry
    pub fn apply(&self, entry: &mut TrackerEntry) {
        match self {
            EntryPatch::SetInvalidate(value) => entry.invalidate = *value,
            EntryPatch::InvalidateAgeAt(now) => {
                entry.invalidate = now.millis_since(entry.created_at);
            }
        }
    }
}

/// Entry-shaped document store the tracking core persists into
///
/// A single `insert` must be atomic from the caller's perspective; bulk
/// operations are best-effort with respect to concurrent writers (see
/// the pruner, which tolerates racing invalidation).
pub trait TrackerStore: Send + Sync {
    /// Persist a new entry, returning its store-assigned id
    fn insert(&self, entry: TrackerEntry) -> Result<EntryId>;

    /// Fetch all entries matching the filter, oldest first
    fn find(&self, filter: &EntryFilter) -> Result<Vec<TrackerEntry>>;

    /// Apply a patch to every matching entry, returning how many matched
    fn bulk_update(&self, filter: &EntryFilter, patch: &EntryPatch) -> Result<usize>;

    /// Delete every matching entry, returning how many were removed
    fn bulk_delete(&self, filter: &EntryFilter) -> Result<usize>;
}

// ============================================================================
// Derived metrics & modifier lookup
// ============================================================================

/// Derived aggregate/metric store keyed by scope
///
/// The writer drops the affected scope after every tracker write so the
/// next metric read recomputes from fresh history.
pub trait MetricCache: Send + Sync {
    /// Drop all cached aggregates for a scope
    fn invalidate(&self, scope: &str);
}

/// Resolves the modifier identity from ambient request/session context
///
/// The core never constructs modifier values itself; hosts bridge their
/// session machinery through this trait.
pub trait ModifierResolver: Send + Sync {
    /// Current modifier identity, if one is known
    fn current_modifier(&self) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssociationNode, TrackAction, INVALIDATE_NEVER};
    use crate::value::Value;

    fn entry(scope: &str, record_id: &str, path: &str, version: u64) -> TrackerEntry {
        TrackerEntry {
            created_at: Timestamp::from_millis(1_000),
            scope: scope.into(),
            action: TrackAction::Update,
            association_chain: vec![
                AssociationNode::new(scope, record_id),
                AssociationNode::new("comment", "c1"),
            ],
            association_path: path.into(),
            record_id: record_id.into(),
            version,
            modifier: None,
            original: FieldMap::new(),
            modified: [("qty".to_string(), Value::Int(1))].into_iter().collect(),
            data: FieldMap::new(),
            invalidate: INVALIDATE_NEVER,
        }
    }

    #[test]
    fn test_filter_default_matches_everything() {
        let filter = EntryFilter::default();
        assert!(filter.matches(&entry("post", "p1", "", 1)));
    }

    #[test]
    fn test_filter_equality_predicates() {
        let filter = EntryFilter::by_location("p1", "comment");
        assert!(filter.matches(&entry("post", "p1", "comment", 1)));
        assert!(!filter.matches(&entry("post", "p2", "comment", 1)));
        assert!(!filter.matches(&entry("post", "p1", "", 1)));

        let filter = EntryFilter {
            scope: Some("post".into()),
            ..Default::default()
        };
        assert!(filter.matches(&entry("post", "p1", "", 1)));
        assert!(!filter.matches(&entry("order", "p1", "", 1)));
    }

    #[test]
    fn test_filter_chain_node() {
        let filter = EntryFilter {
            chain_node: Some(("comment".into(), "c1".into())),
            ..Default::default()
        };
        assert!(filter.matches(&entry("post", "p1", "comment", 1)));

        let filter = EntryFilter {
            chain_node: Some(("comment".into(), "c2".into())),
            ..Default::default()
        };
        assert!(!filter.matches(&entry("post", "p1", "comment", 1)));
    }

    #[test]
    fn test_filter_version_in() {
        let filter = EntryFilter {
            version_in: Some(vec![2, 3]),
            ..Default::default()
        };
        assert!(filter.matches(&entry("post", "p1", "", 2)));
        assert!(!filter.matches(&entry("post", "p1", "", 4)));
    }

    #[test]
    fn test_filter_version_between_is_inclusive() {
        let filter = EntryFilter {
            version_between: Some((2, 4)),
            ..Default::default()
        };
        assert!(!filter.matches(&entry("post", "p1", "", 1)));
        assert!(filter.matches(&entry("post", "p1", "", 2)));
        assert!(filter.matches(&entry("post", "p1", "", 4)));
        assert!(!filter.matches(&entry("post", "p1", "", 5)));
    }

    #[test]
    fn test_filter_range_predicates_are_strict() {
        let mut superseded = entry("post", "p1", "", 1);
        superseded.invalidate = 3_600_000;

        let filter = EntryFilter {
            invalidate_below: Some(3_600_000),
            ..Default::default()
        };
        // invalidate == threshold does not match (strictly below)
        assert!(!filter.matches(&superseded));
        superseded.invalidate = 3_599_999;
        assert!(filter.matches(&superseded));

        let filter = EntryFilter {
            created_before: Some(Timestamp::from_millis(1_000)),
            ..Default::default()
        };
        // created_at == threshold does not match (strictly before)
        assert!(!filter.matches(&superseded));
    }

    #[test]
    fn test_patch_set_invalidate() {
        let mut e = entry("post", "p1", "", 1);
        EntryPatch::SetInvalidate(500).apply(&mut e);
        assert_eq!(e.invalidate, 500);
    }

    #[test]
    fn test_patch_age_at_supersession() {
        let mut e = entry("post", "p1", "", 1); // created_at = 1_000
        EntryPatch::InvalidateAgeAt(Timestamp::from_millis(61_000)).apply(&mut e);
        // Lifespan, not a deadline: 61_000 - 1_000
        assert_eq!(e.invalidate, 60_000);
    }
}
