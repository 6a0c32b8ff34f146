//! Test support: an in-memory record type implementing [`Trackable`]
//!
//! `SampleRecord` models what a host mapper would provide: a field map,
//! dirty tracking of pending changes, an optional owning parent, and the
//! version/transaction stamps the engine writes back. Used by this
//! crate's tests and by workspace integration tests; hosts can also use
//! it to prototype tracking setups.

use chronicle_core::{ChangedFields, FieldMap, Trackable, Value};

/// Minimal trackable record for tests and prototyping
#[derive(Debug, Clone, Default)]
pub struct SampleRecord {
    type_name: String,
    id: String,
    parent: Option<Box<SampleRecord>>,
    position: Option<usize>,
    fields: FieldMap,
    pending: ChangedFields,
    version: Option<u64>,
    transaction_id: Option<String>,
}

impl SampleRecord {
    /// Create a record with no fields and no parent
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        SampleRecord {
            type_name: type_name.into(),
            id: id.into(),
            ..Default::default()
        }
    }

    /// Attach an owning parent
    pub fn with_parent(mut self, parent: SampleRecord) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Set the record's ordinal within its parent's collection
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Set a field without recording a pending change (initial state)
    pub fn insert_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Mutate a field, recording the before/after pair as a pending change
    ///
    /// Repeated mutations of one field within the same pending set keep
    /// the earliest original, like a mapper's dirty tracking would.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        let old = self.fields.insert(name.clone(), value.clone());
        let original = match self.pending.remove(&name) {
            Some((first_original, _)) => first_original,
            None => old,
        };
        self.pending.insert(name, (original, Some(value)));
    }

    /// Remove a field, recording the removal as a pending change
    pub fn remove_field(&mut self, name: &str) {
        if let Some(old) = self.fields.remove(name) {
            let original = match self.pending.remove(name) {
                Some((first_original, _)) => first_original,
                None => Some(old),
            };
            self.pending.insert(name.to_string(), (original, None));
        }
    }

    /// Drop pending changes, as a mapper does after a successful save
    pub fn clear_changes(&mut self) {
        self.pending.clear();
    }

    /// Directly set the transaction stamp (for chain/walker tests)
    pub fn set_transaction_id_raw(&mut self, transaction_id: Option<String>) {
        self.transaction_id = transaction_id;
    }
}

impl Trackable for SampleRecord {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn parent(&self) -> Option<&dyn Trackable> {
        self.parent.as_deref().map(|p| p as &dyn Trackable)
    }

    fn position_in_parent(&self) -> Option<usize> {
        self.position
    }

    fn field_values(&self) -> FieldMap {
        self.fields.clone()
    }

    fn changed_fields(&self) -> ChangedFields {
        self.pending.clone()
    }

    fn version(&self) -> Option<u64> {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = Some(version);
    }

    fn transaction_id(&self) -> Option<String> {
        self.transaction_id.clone()
    }

    fn set_transaction_id(&mut self, transaction_id: String) {
        self.transaction_id = Some(transaction_id);
    }
}
