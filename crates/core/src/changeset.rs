//! Field-level change extraction
//!
//! Given a record's before/after field values and a tracking policy,
//! this module computes the minimal set of changed fields:
//! - fields equal (or absent) on both sides are never emitted
//! - create diffs against an all-absent baseline (no original side)
//! - destroy diffs toward an all-absent target (no modified side)
//!
//! An empty change set means the mutation is a no-op under the policy;
//! callers must skip persisting a tracker entry in that case.

use crate::value::{FieldMap, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Before/after pair per changed field, as reported by the host mapper's
/// dirty tracking (`None` = the field was absent on that side)
pub type ChangedFields = BTreeMap<String, (Option<Value>, Option<Value>)>;

// ============================================================================
// Policy
// ============================================================================

/// Which fields a type tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TrackedFields {
    /// Track every field not excluded
    #[default]
    All,
    /// Track only the listed fields (still subject to the exclude list)
    Only(std::collections::BTreeSet<String>),
}

/// Field selection policy: allow-list (or all) minus an exclude list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FieldPolicy {
    /// Allow-list, or All
    pub on: TrackedFields,
    /// Fields never tracked, regardless of the allow-list
    pub except: std::collections::BTreeSet<String>,
}

impl FieldPolicy {
    /// Track every field (empty exclude list)
    pub fn track_all() -> Self {
        FieldPolicy::default()
    }

    /// Track only the given fields
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldPolicy {
            on: TrackedFields::Only(fields.into_iter().map(Into::into).collect()),
            except: Default::default(),
        }
    }

    /// Add fields to the exclude list
    pub fn with_except<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.except.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Check whether a field is tracked under this policy
    pub fn is_tracked(&self, field: &str) -> bool {
        if self.except.contains(field) {
            return false;
        }
        match &self.on {
            TrackedFields::All => true,
            TrackedFields::Only(allowed) => allowed.contains(field),
        }
    }
}

// ============================================================================
// ChangeSet
// ============================================================================

/// One changed field: its name plus the observed before/after values
///
/// Invariant: at least one of `original`/`modified` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Field name
    pub field_name: String,
    /// Value before the mutation (`None` for create, or a newly set field)
    pub original: Option<Value>,
    /// Value after the mutation (`None` for destroy, or a removed field)
    pub modified: Option<Value>,
}

/// Minimal diff of a tracked mutation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    /// Extract the tracked changes of an update
    ///
    /// Fields untracked under the policy, or with no observed difference,
    /// are dropped.
    pub fn from_update(changes: &ChangedFields, policy: &FieldPolicy) -> Self {
        let entries = changes
            .iter()
            .filter(|(field, _)| policy.is_tracked(field))
            .filter(|(_, (original, modified))| original != modified)
            .map(|(field, (original, modified))| ChangeEntry {
                field_name: field.clone(),
                original: original.clone(),
                modified: modified.clone(),
            })
            .collect();
        ChangeSet { entries }
    }

    /// Extract a create diff: every tracked present field, no original side
    pub fn from_create(fields: &FieldMap, policy: &FieldPolicy) -> Self {
        let entries = fields
            .iter()
            .filter(|(field, _)| policy.is_tracked(field))
            .map(|(field, value)| ChangeEntry {
                field_name: field.clone(),
                original: None,
                modified: Some(value.clone()),
            })
            .collect();
        ChangeSet { entries }
    }

    /// Extract a destroy diff: every present field, no modified side
    ///
    /// Destroy captures the full final state of the record, so the
    /// allow/exclude policy does not apply here.
    pub fn from_destroy(fields: &FieldMap) -> Self {
        let entries = fields
            .iter()
            .map(|(field, value)| ChangeEntry {
                field_name: field.clone(),
                original: Some(value.clone()),
                modified: None,
            })
            .collect();
        ChangeSet { entries }
    }

    /// True when nothing changed under the policy (callers skip persistence)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of changed fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over the change entries
    pub fn iter(&self) -> impl Iterator<Item = &ChangeEntry> {
        self.entries.iter()
    }

    /// Split into the `(original, modified)` maps persisted on a tracker
    /// entry; absent sides are simply omitted from their map
    pub fn split(&self) -> (FieldMap, FieldMap) {
        let mut original = FieldMap::new();
        let mut modified = FieldMap::new();
        for entry in &self.entries {
            if let Some(value) = &entry.original {
                original.insert(entry.field_name.clone(), value.clone());
            }
            if let Some(value) = &entry.modified {
                modified.insert(entry.field_name.clone(), value.clone());
            }
        }
        (original, modified)
    }

    /// Replay this change set on top of a base snapshot
    ///
    /// Fields with a modified side are written; fields with only an
    /// original side (removed fields) are deleted.
    pub fn apply(&self, base: &FieldMap) -> FieldMap {
        let mut result = base.clone();
        for entry in &self.entries {
            match &entry.modified {
                Some(value) => {
                    result.insert(entry.field_name.clone(), value.clone());
                }
                None => {
                    result.remove(&entry.field_name);
                }
            }
        }
        result
    }
}

/// Compute the per-field before/after pairs between two snapshots
///
/// Helper for hosts whose mapper does not expose dirty tracking directly;
/// unchanged fields are omitted.
pub fn diff_fields(before: &FieldMap, after: &FieldMap) -> ChangedFields {
    let mut changes = ChangedFields::new();
    for (field, old) in before {
        match after.get(field) {
            Some(new) if new == old => {}
            Some(new) => {
                changes.insert(field.clone(), (Some(old.clone()), Some(new.clone())));
            }
            None => {
                changes.insert(field.clone(), (Some(old.clone()), None));
            }
        }
    }
    for (field, new) in after {
        if !before.contains_key(field) {
            changes.insert(field.clone(), (None, Some(new.clone())));
        }
    }
    changes
}
