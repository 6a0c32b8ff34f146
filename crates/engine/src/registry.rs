//! Per-type tracking configuration and registry
//!
//! Each trackable type is registered exactly once at startup with a
//! [`TrackableTypeConfig`]. The registry is an explicit object owned by
//! the host and passed by reference to every consumer; there is no
//! module-level singleton. After registration completes it is read-only
//! for the process lifetime.
//!
//! Registration normalizes the exclude list so identity fields and the
//! version/modifier/transaction fields can never track themselves.

use chronicle_core::{Error, FieldPolicy, Result, TrackedFields};
use std::collections::HashMap;

/// What happens to an aggregate's history when its root is destroyed
///
/// The two policies are mutually exclusive audit stances: either the
/// destruction itself becomes part of history, or the whole history is
/// dropped with the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DestroyPolicy {
    /// Write a final `action=destroy` tracker entry (history-preserving)
    #[default]
    RecordEntry,
    /// Bulk-delete every tracker entry for the record_id
    PurgeHistory,
}

/// Tracking policy for one registered type
///
/// Defaults mirror the conventional setup: track updates only, exclude
/// bookkeeping timestamps, scope the history under the type's own name.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackableTypeConfig {
    /// Type name records of this kind report via `Trackable::type_name`
    pub type_name: String,
    /// Logical root type name the history is grouped under; equals
    /// `type_name` for aggregate roots, names the root for embedded types
    pub scope: String,
    /// Field selection policy (allow-list or all, minus excludes)
    pub policy: FieldPolicy,
    /// Record field holding the modifier identity
    pub modifier_field: String,
    /// Record field holding the tracking version
    pub version_field: String,
    /// Track create actions
    pub track_create: bool,
    /// Track update actions
    pub track_update: bool,
    /// Track destroy actions (roots only)
    pub track_destroy: bool,
    /// Destroy handling variant
    pub destroy_policy: DestroyPolicy,
    /// Whether a background pruner should run for this type's scope
    pub periodic_pruning: bool,
}

impl TrackableTypeConfig {
    /// Config with conventional defaults for a type
    pub fn new(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        TrackableTypeConfig {
            scope: type_name.clone(),
            type_name,
            policy: FieldPolicy::track_all().with_except(["created_at", "updated_at"]),
            modifier_field: "edited_by".to_string(),
            version_field: "version".to_string(),
            track_create: false,
            track_update: true,
            track_destroy: false,
            destroy_policy: DestroyPolicy::default(),
            periodic_pruning: false,
        }
    }

    /// Group this type's history under another (root) type's scope
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Track only the given fields instead of all
    pub fn only<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.on = TrackedFields::Only(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Add fields to the exclude list
    pub fn except<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy = self.policy.with_except(fields);
        self
    }

    /// Override the modifier field name
    pub fn modifier_field(mut self, field: impl Into<String>) -> Self {
        self.modifier_field = field.into();
        self
    }

    /// Override the version field name
    pub fn version_field(mut self, field: impl Into<String>) -> Self {
        self.version_field = field.into();
        self
    }

    /// Enable/disable create tracking
    pub fn track_create(mut self, on: bool) -> Self {
        self.track_create = on;
        self
    }

    /// Enable/disable update tracking
    pub fn track_update(mut self, on: bool) -> Self {
        self.track_update = on;
        self
    }

    /// Enable/disable destroy tracking
    pub fn track_destroy(mut self, on: bool) -> Self {
        self.track_destroy = on;
        self
    }

    /// Pick the destroy handling variant
    pub fn destroy_policy(mut self, policy: DestroyPolicy) -> Self {
        self.destroy_policy = policy;
        self
    }

    /// Enable the background pruner for this type's scope
    pub fn periodic_pruning(mut self, on: bool) -> Self {
        self.periodic_pruning = on;
        self
    }

    /// Force the reflexive fields into the exclude list
    ///
    /// Identity, version, modifier, and transaction fields would
    /// otherwise show up as tracked changes of their own bookkeeping.
    fn normalize(mut self) -> Self {
        let reflexive = [
            "_id".to_string(),
            "id".to_string(),
            "transaction_id".to_string(),
            self.version_field.clone(),
            self.modifier_field.clone(),
            format!("{}_id", self.modifier_field),
        ];
        self.policy = self.policy.with_except(reflexive);
        self
    }
}

/// Collection name for a scope's tracker entries
pub fn tracker_collection_name(scope: &str) -> String {
    format!("{scope}_events")
}

/// Collection name for a scope's derived metrics
pub fn metric_collection_name(scope: &str) -> String {
    format!("{scope}_metrics")
}

/// Process-wide registry of trackable type configurations
///
/// Built once at startup; `register` is the only mutation. Consumers
/// hold it behind an `Arc` and look configs up by type name.
#[derive(Debug, Default)]
pub struct TrackerRegistry {
    configs: HashMap<String, TrackableTypeConfig>,
}

impl TrackerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type's tracking configuration (exactly once per type)
    ///
    /// Normalizes the config's exclude list before storing it.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateRegistration` if the type name is taken.
    pub fn register(&mut self, config: TrackableTypeConfig) -> Result<()> {
        if self.configs.contains_key(&config.type_name) {
            return Err(Error::DuplicateRegistration(config.type_name));
        }
        let config = config.normalize();
        self.configs.insert(config.type_name.clone(), config);
        Ok(())
    }

    /// Look up a type's configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::UnregisteredType` if the type was never registered.
    pub fn config_for(&self, type_name: &str) -> Result<&TrackableTypeConfig> {
        self.configs
            .get(type_name)
            .ok_or_else(|| Error::UnregisteredType(type_name.to_string()))
    }

    /// Check whether a type is registered
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.configs.contains_key(type_name)
    }

    /// Configs with periodic pruning enabled, for host pruner setup
    pub fn pruning_scopes(&self) -> Vec<&TrackableTypeConfig> {
        self.configs
            .values()
            .filter(|config| config.periodic_pruning)
            .collect()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Check if no types are registered
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
