//! Server lifecycle flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::routing::CompositionError;

/// Shared "started" flag.
///
/// Owned by the server and handed to every composer attached to it. Once set,
/// structural mutation (routes, filters, websockets, path composition) fails.
#[derive(Debug, Clone, Default)]
pub struct LifecycleState {
    started: Arc<AtomicBool>,
}

impl LifecycleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the server has been started.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Mark the server as started. Returns false if it already was.
    pub fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }

    /// Fail with a lifecycle error if the server is already running.
    ///
    /// `what` names the rejected operation ("paths", "endpoints", ...).
    pub fn ensure_mutable(&self, what: &'static str) -> Result<(), CompositionError> {
        if self.is_started() {
            return Err(CompositionError::AlreadyStarted { what });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_is_shared_between_clones() {
        let state = LifecycleState::new();
        let other = state.clone();
        assert!(state.ensure_mutable("endpoints").is_ok());

        assert!(other.mark_started());
        assert!(state.is_started());
        assert!(!state.mark_started());

        let err = state.ensure_mutable("filters").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot add filters after the server has started"
        );
    }
}
