//! Route and filter composition.
//!
//! # Data Flow
//! ```text
//! Composition (before start):
//!     register(method, "/users/(\w+)", handler)
//!     → pattern.rs (compile "^/users/(\w+)$" once)
//!     → table.rs (append to the method's ordered collection)
//!
//!     compose_path("/api", block)
//!     → composer.rs (push scratch table, run block, pop)
//!     → pattern.rs (rewrite "^..." into "^/api...")
//!     → table.rs (merge into the parent table)
//!
//! Dispatch (after start):
//!     RouteTable frozen behind Arc, read without locks
//! ```
//!
//! # Design Decisions
//! - First registered match wins; specificity is never considered
//! - Patterns are regexes anchored over the full path
//! - Structural mistakes fail at composition time, never at request time

pub mod composer;
pub mod error;
pub mod pattern;
pub mod table;

pub use composer::{Compose, Composer, PathScope};
pub use error::CompositionError;
pub use pattern::{Method, MethodSelector, RouteMatch, RoutePattern};
pub use table::RouteTable;
