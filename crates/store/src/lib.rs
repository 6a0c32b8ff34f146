//! In-memory persistence collaborators for Chronicle
//!
//! Provides the reference implementations of the storage seams the
//! tracking engine depends on:
//! - [`MemoryTrackerStore`]: entry document store (RwLock + secondary
//!   indexes on record_id and scope)
//! - [`MemoryMetricCache`]: derived aggregate cache, dropped per scope
//!   on every tracker write
//! - [`FixedModifier`]: constant modifier resolver
//!
//! Hosts with a real document store implement `chronicle_core::TrackerStore`
//! themselves; nothing in the engine depends on this crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;

pub use memory::{FixedModifier, MemoryMetricCache, MemoryTrackerStore};
