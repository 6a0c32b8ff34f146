//! Per-execution-context tracking state
//!
//! Each concurrent execution context (thread, task, request handler)
//! owns one [`TrackingContext`] and threads it through every tracking
//! call. The context carries:
//! - the per-type enablement gate (default: enabled)
//! - the active transaction correlation id, shared by all saves within
//!   one logical operation
//!
//! Contexts are not shared or synchronized; concurrent operations stay
//! isolated from each other.

use std::collections::HashMap;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use uuid::Uuid;

/// Context-local tracking state for one execution context
#[derive(Debug, Default)]
pub struct TrackingContext {
    /// Per-type enablement overrides; absent means enabled
    enabled: HashMap<String, bool>,
    /// Correlation id of the logical operation in flight, if any
    current_transaction_id: Option<String>,
}

impl TrackingContext {
    /// Fresh context: every type enabled, no operation in flight
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the enablement gate for a type (default: enabled)
    pub fn tracking_enabled(&self, type_name: &str) -> bool {
        self.enabled.get(type_name).copied().unwrap_or(true)
    }

    /// Set the enablement gate for one type
    pub fn set_tracking(&mut self, type_name: &str, enabled: bool) {
        self.enabled.insert(type_name.to_string(), enabled);
    }

    /// Run a block with tracking disabled for one type
    ///
    /// The prior gate value is restored afterward, including when the
    /// block panics. Other types' gates are untouched.
    pub fn disable_tracking<R>(
        &mut self,
        type_name: &str,
        block: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let prior = self.enabled.insert(type_name.to_string(), false);

        let outcome = catch_unwind(AssertUnwindSafe(|| block(self)));

        match prior {
            Some(value) => self.enabled.insert(type_name.to_string(), value),
            None => self.enabled.remove(type_name),
        };

        match outcome {
            Ok(result) => result,
            Err(panic) => resume_unwind(panic),
        }
    }

    /// Correlation id of the operation in flight
    pub fn current_transaction_id(&self) -> Option<&str> {
        self.current_transaction_id.as_deref()
    }

    /// Open a new logical operation, allocating a fresh correlation id
    ///
    /// Called when an aggregate root is saved; every save that follows
    /// under this context shares the id until the next root save, which
    /// is how multi-document saves coalesce into one logical change.
    pub fn begin_operation(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        self.current_transaction_id = Some(id.clone());
        id
    }

    /// Forget the operation in flight (e.g. at request teardown)
    pub fn clear_transaction(&mut self) {
        self.current_transaction_id = None;
    }
}
