//! Foundational types for tracker entries
//!
//! This module defines:
//! - Timestamp: millisecond-precision point in time
//! - EntryId: store-assigned tracker entry identifier
//! - TrackAction: the tracked lifecycle action (create/update/destroy)
//! - AssociationNode: one hop in a record's ownership chain
//! - TrackerEntry: the persisted audit record
//!
//! ## Invalidate semantics
//!
//! `TrackerEntry.invalidate` starts at [`INVALIDATE_NEVER`] (a far-future
//! sentinel) while the entry is current. When a newer entry supersedes it
//! at the same `(record_id, association_path)`, the field is overwritten
//! with the entry's age-at-supersession in milliseconds: its lifespan,
//! not a wall-clock deadline. The pruner treats small lifespans as a
//! retention signal.

use crate::value::FieldMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Sentinel `invalidate` value meaning "never superseded"
pub const INVALIDATE_NEVER: u64 = 99_999_999_999_999;

// ============================================================================
// Timestamp
// ============================================================================

/// Millisecond-precision timestamp
///
/// Represents a point in time as milliseconds since Unix epoch.
/// Milliseconds are the canonical unit here because supersession ages
/// and pruning thresholds are defined in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Maximum representable timestamp
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    /// Create a timestamp for the current moment
    ///
    /// Uses system time. Returns epoch (0) if the system clock is before
    /// Unix epoch (e.g., clock went backwards due to NTP adjustment).
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_millis() as u64)
    }

    /// Create a timestamp from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Create a timestamp from seconds since epoch
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1_000))
    }

    /// Get milliseconds since Unix epoch
    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Get seconds since Unix epoch (truncates)
    #[inline]
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000
    }

    /// Milliseconds elapsed since an earlier timestamp
    ///
    /// Saturates to 0 if `earlier` is actually later than `self`.
    #[inline]
    pub const fn millis_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Add a duration, saturating at `Timestamp::MAX`
    pub fn saturating_add(&self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration.as_millis() as u64))
    }

    /// Subtract a duration, saturating at `Timestamp::EPOCH`
    pub fn saturating_sub(&self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_sub(duration.as_millis() as u64))
    }

    /// Check if this timestamp is before another
    #[inline]
    pub fn is_before(&self, other: Timestamp) -> bool {
        self.0 < other.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:03}", self.0 / 1_000, self.0 % 1_000)
    }
}

// ============================================================================
// EntryId
// ============================================================================

/// Store-assigned identifier for a persisted tracker entry
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct EntryId(pub u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entry:{}", self.0)
    }
}

// ============================================================================
// TrackAction
// ============================================================================

/// Tracked lifecycle action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackAction {
    /// Record creation
    Create,
    /// Record field mutation
    Update,
    /// Record destruction (root records only)
    Destroy,
}

impl TrackAction {
    /// Action name as stored in tracker entries
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackAction::Create => "create",
            TrackAction::Update => "update",
            TrackAction::Destroy => "destroy",
        }
    }
}

impl std::fmt::Display for TrackAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// AssociationNode
// ============================================================================

/// One hop in a record's ownership chain
///
/// Chains run from the outermost ancestor (index 0) to the mutated record
/// itself. `chain[0]` is the durable root whose id becomes the tracker
/// entry's `record_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationNode {
    /// Type name of the record at this hop
    pub type_name: String,
    /// The record's identifier
    pub id: String,
    /// Best-effort ordinal within the parent's collection at walk time.
    /// Not stable under concurrent reordering.
    pub index: Option<usize>,
    /// Transaction correlation id captured from the record, if any
    pub transaction_id: Option<String>,
}

impl AssociationNode {
    /// Create a node with no collection index or transaction id
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        AssociationNode {
            type_name: type_name.into(),
            id: id.into(),
            index: None,
            transaction_id: None,
        }
    }
}

// ============================================================================
// TrackerEntry
// ============================================================================

/// One immutable audit record capturing a single tracked mutation
///
/// Entries are created once and never updated, with one exception:
/// `invalidate` is overwritten when a newer entry supersedes this one at
/// the same `(record_id, association_path)`. Deletion happens only
/// through destroy-purging or the background pruner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerEntry {
    /// When the entry was written
    pub created_at: Timestamp,
    /// Logical root type name grouping the aggregate's history
    pub scope: String,
    /// Which lifecycle action produced this entry
    pub action: TrackAction,
    /// Root-to-leaf ownership chain at mutation time
    pub association_chain: Vec<AssociationNode>,
    /// Dotted location of the change inside the root aggregate
    /// (empty when the mutated record IS the root)
    pub association_path: String,
    /// Durable identity of the aggregate root (`association_chain[0].id`)
    pub record_id: String,
    /// Per-scope version of this mutation, starting at 1
    pub version: u64,
    /// Identity of whoever made the change, if resolvable
    pub modifier: Option<String>,
    /// Tracked fields' values before the mutation
    pub original: FieldMap,
    /// Tracked fields' values after the mutation
    pub modified: FieldMap,
    /// Full field snapshot of the record at write time
    pub data: FieldMap,
    /// [`INVALIDATE_NEVER`] while current; age-at-supersession (ms) once
    /// a newer entry replaces this one at the same location
    pub invalidate: u64,
}

impl TrackerEntry {
    /// Check whether this entry has been superseded
    pub fn is_superseded(&self) -> bool {
        self.invalidate != INVALIDATE_NEVER
    }

    /// Union of the fields this entry touched, with their most relevant
    /// value: the modified side when present, the original side otherwise
    pub fn affected(&self) -> FieldMap {
        let mut fields = self.original.clone();
        for (name, value) in &self.modified {
            fields.insert(name.clone(), value.clone());
        }
        fields
    }
}
