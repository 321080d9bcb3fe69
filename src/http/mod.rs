//! HTTP host binding.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum fallback service, trace + timeout layers)
//!     → request.rs (buffer body up to the limit, build dispatch Request)
//!     → Engine::dispatch
//!     → response.rs (status, headers, body, x-request-id)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - axum owns the wire; routing decisions all happen in the engine
//! - Bodies are fully buffered before dispatch

pub mod request;
pub mod response;
pub mod server;

pub use request::{BodyTooLarge, X_REQUEST_ID};
pub use server::HttpServer;
