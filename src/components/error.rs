//! Component cache and resolution errors.

use thiserror::Error;

/// Misuse of a cache.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The use-once token was touched other than by its single `take`.
    #[error("use-once cache: {operation} is not allowed")]
    UseOnceViolation { operation: &'static str },

    /// `parent()` on a cache at the top of the chain.
    #[error("{scope} cache has no parent")]
    NoParent { scope: &'static str },

    /// A stored value is not of the type its key promises.
    #[error("cached value for {type_name} has a different type")]
    TypeMismatch { type_name: &'static str },
}

/// Failure of `Context::dep`.
///
/// Kept apart from application errors so handlers can tell "not wired" from
/// "failed while running".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{type_name} is requested in the wrong scope or is not a component at all")]
    NotAComponent { type_name: &'static str },

    #[error("resolver returned a value that is not a {type_name}")]
    TypeMismatch { type_name: &'static str },

    #[error(transparent)]
    Cache(#[from] CacheError),
}
