//! Use-once capability for the application cache.

use std::sync::{Arc, Mutex, PoisonError};

use crate::components::{CacheError, Component, ComponentKey, DependencyCache};

/// Wraps the application cache so it can be handed out exactly once.
///
/// The first [`take`](Self::take) returns the cache and empties the token.
/// Every other operation, and every call after that first `take`, fails.
/// A closure that captured the token therefore cannot reach the cache.
#[derive(Debug)]
pub struct UseOnceCache {
    inner: Mutex<Option<Arc<DependencyCache>>>,
}

impl UseOnceCache {
    pub fn new(cache: Arc<DependencyCache>) -> Self {
        Self {
            inner: Mutex::new(Some(cache)),
        }
    }

    /// Exchange the token for the wrapped cache.
    pub fn take(&self) -> Result<Arc<DependencyCache>, CacheError> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(CacheError::UseOnceViolation { operation: "take" })
    }

    /// True until the token has been exchanged.
    pub fn is_available(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn get_or_create(
        &self,
        _key: ComponentKey,
        _factory: impl FnOnce() -> Component,
    ) -> Result<Component, CacheError> {
        Err(CacheError::UseOnceViolation {
            operation: "get_or_create",
        })
    }

    pub fn get(&self, _key: ComponentKey) -> Result<Option<Component>, CacheError> {
        Err(CacheError::UseOnceViolation { operation: "get" })
    }

    pub fn put(&self, _key: ComponentKey, _component: Component) -> Result<(), CacheError> {
        Err(CacheError::UseOnceViolation { operation: "put" })
    }

    pub fn parent(&self) -> Result<Arc<DependencyCache>, CacheError> {
        Err(CacheError::UseOnceViolation { operation: "parent" })
    }
}
