//! Core types and traits for Chronicle
//!
//! This crate defines the foundational pieces of the change-tracking
//! system:
//! - Value / FieldMap: canonical field data model
//! - Timestamp, EntryId, TrackAction: entry building blocks
//! - AssociationNode / TrackerEntry: the persisted audit record shape
//! - ChangeSet: field-level diff extraction under a tracking policy
//! - Error: error type hierarchy
//! - Traits: collaborator seams (Trackable, TrackerStore, MetricCache,
//!   ModifierResolver)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod changeset;
pub mod error;
pub mod traits;
pub mod types;
pub mod value;

// Re-export commonly used types and traits
pub use changeset::{diff_fields, ChangeEntry, ChangeSet, ChangedFields, FieldPolicy, TrackedFields};
pub use error::{Error, Result};
pub use traits::{
    EntryFilter, EntryPatch, MetricCache, ModifierResolver, Trackable, TrackerStore,
};
pub use types::{
    AssociationNode, EntryId, Timestamp, TrackAction, TrackerEntry, INVALIDATE_NEVER,
};
pub use value::{FieldMap, Value};
