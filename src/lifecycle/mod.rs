//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Composition (state.rs):
//!     Server::new → register routes/filters/websockets → Server::start
//!     started flag flips once; every later mutation is rejected
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → accept loops stop → connections drain
//!
//! Signals (signals.rs):
//!     SIGINT (Ctrl+C) → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - The started flag is the only mutable state shared across tasks
//! - A plain atomic is enough: no reader ever waits on it

pub mod shutdown;
pub mod signals;
pub mod state;

pub use shutdown::Shutdown;
pub use state::LifecycleState;
