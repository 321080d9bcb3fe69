//! Scoped component cache.
//!
//! # Data Flow
//! ```text
//! Server::new
//!     → application DependencyCache (lives as long as the server)
//!     → wrapped once in UseOnceCache, handed to the resolver builder
//!
//! Per request / per WebSocket message:
//!     → request DependencyCache (parent = application cache)
//!     → ctx.dep::<T>() → Resolver::resolve(key, request cache, route)
//!         application factory → get_or_create on the application cache
//!         request factory     → get_or_create on the request cache
//!         nothing registered  → ResolveError::NotAComponent
//! ```
//!
//! # Design Decisions
//! - Explicit factory dispatch by type, no reflection
//! - At most one factory call per key per cache instance, even under races
//! - Handler code never holds the application cache directly

pub mod cache;
pub mod error;
pub mod resolver;
pub mod use_once;

pub use cache::{Component, ComponentKey, DependencyCache, Scope};
pub use error::{CacheError, ResolveError};
pub use resolver::{Components, DenyAll, Resolver};
pub use use_once::UseOnceCache;
