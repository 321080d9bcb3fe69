//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (backlog-sized socket, connection limit permit)
//!     → connection.rs (connection id, live count for draining)
//!     → WebSocket engine, one task per connection
//! ```
//!
//! # Design Decisions
//! - The connection permit is acquired before accept, so a full server
//!   leaves new clients in the kernel backlog
//! - The HTTP binding reuses the bound socket but lets axum accept

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
