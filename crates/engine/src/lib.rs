//! Chronicle Engine - change tracking orchestration
//!
//! This crate turns record mutations into durable tracker entries:
//!
//! - **Registry**: per-type tracking configuration behind explicit
//!   dependency injection (no global singleton)
//! - **Context**: per-operation enablement gate and transaction
//!   correlation, carried as a value the host owns (no thread-locals)
//! - **Chain**: ownership-chain walking and association path rendering
//! - **Writer**: the `Tracker` itself - change extraction, version
//!   allocation, supersession stamping, metric invalidation
//! - **History**: version-selected retrieval of a record's entries
//! - **Pruner**: background deletion of stale superseded entries
//!
//! Storage is abstracted behind `chronicle_core::TrackerStore`; see
//! `chronicle-store` for the in-memory implementation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod context;
pub mod history;
pub mod pruner;
pub mod registry;
pub mod testing;
pub mod writer;

pub use chain::{association_path, traverse_association_chain};
pub use context::TrackingContext;
pub use history::VersionSelector;
pub use pruner::{Pruner, PrunerConfig};
pub use registry::{
    metric_collection_name, tracker_collection_name, DestroyPolicy, TrackableTypeConfig,
    TrackerRegistry,
};
pub use testing::SampleRecord;
pub use writer::Tracker;
