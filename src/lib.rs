//! Chronicle - embeddable change-history tracking for document-mapper hosts
//!
//! Chronicle records who changed what, when, inside aggregates of owned
//! records: each tracked save yields a tracker entry carrying the changed
//! fields (original and modified sides), a per-record version, the
//! record's location inside its root aggregate, and a supersession stamp
//! that later lets stale history be pruned.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use chronicle::{
//!     FixedModifier, MemoryMetricCache, MemoryTrackerStore, SampleRecord,
//!     TrackableTypeConfig, Tracker, TrackerRegistry, TrackingContext, Value,
//!     VersionSelector,
//! };
//!
//! let mut registry = TrackerRegistry::new();
//! registry.register(TrackableTypeConfig::new("post").track_create(true))?;
//!
//! let tracker = Tracker::new(
//!     Arc::new(registry),
//!     Arc::new(MemoryTrackerStore::new()),
//!     Arc::new(MemoryMetricCache::new()),
//!     Arc::new(FixedModifier::new("alice")),
//! );
//!
//! let mut post = SampleRecord::new("post", "p1");
//! let mut ctx = TrackingContext::new();
//! post.set_field("title", Value::from("hello"));
//! tracker.record_update(&mut post, &mut ctx)?;
//!
//! let history = tracker.history_for(&post, &VersionSelector::Last(1))?;
//! ```
//!
//! # Architecture
//!
//! Hosts implement [`Trackable`] for their record types and hand the
//! [`Tracker`] a [`TrackerStore`] backend. Everything is explicit
//! dependency injection - no global registry, no thread-local state.
//!
//! Internal layering (core types, storage backends, engine) lives in the
//! member crates; this facade re-exports the public surface.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use chronicle_core::{
    diff_fields, AssociationNode, ChangeEntry, ChangeSet, ChangedFields, EntryFilter, EntryId,
    EntryPatch, Error, FieldMap, FieldPolicy, MetricCache, ModifierResolver, Result, Timestamp,
    TrackAction, Trackable, TrackedFields, TrackerEntry, TrackerStore, Value, INVALIDATE_NEVER,
};

pub use chronicle_store::{FixedModifier, MemoryMetricCache, MemoryTrackerStore};

pub use chronicle_engine::{
    association_path, metric_collection_name, tracker_collection_name, traverse_association_chain,
    DestroyPolicy, Pruner, PrunerConfig, SampleRecord, TrackableTypeConfig, Tracker,
    TrackerRegistry, TrackingContext, VersionSelector,
};
