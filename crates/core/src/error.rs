//! Error types for the tracking core
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Two conditions are deliberately NOT errors:
//! - an empty change set (a no-op mutation silently skips persistence)
//! - a pruning sweep failure (caught and logged inside the pruner,
//!   which must survive and retry on its next cycle)

use thiserror::Error;

/// Result type alias for tracking operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the tracking core
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid version selector arguments (fails fast, never retried)
    #[error("Invalid version selector: {0}")]
    InvalidSelector(String),

    /// A trackable type was registered more than once
    #[error("Type already registered: {0}")]
    DuplicateRegistration(String),

    /// A record's type has no registered tracking configuration
    #[error("Type not registered for tracking: {0}")]
    UnregisteredType(String),

    /// Persistence collaborator failure, propagated so the triggering
    /// mutation can fail together with its tracker write
    #[error("Store error: {0}")]
    Store(String),
}
