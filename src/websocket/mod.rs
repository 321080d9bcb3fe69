//! WebSocket protocol engine.
//!
//! # Data Flow
//! ```text
//! TCP accept (server.rs)
//!     → handshake.rs (read head, validate GET + Sec-WebSocket-Key, 101 reply)
//!     → connection.rs read loop:
//!         frame.rs (2-byte header, 16/64-bit length, unmask)
//!         close        → bare close frame back, connection ends
//!         text/binary  → envelope.rs ([N][sub-path][message])
//!                      → exact sub-path lookup (404 handler if missing)
//!                      → handler spawned on its own task
//!         other        → discarded
//!     → writer task drains FrameSender queue onto the socket
//! ```
//!
//! # Design Decisions
//! - One TCP connection carries every registered sub-path
//! - Slow handlers never stall the read loop
//! - Server frames go out unmasked; the client role masks every frame
//! - No fragmentation: FIN is read but never used for reassembly

pub mod client;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod server;

use std::future::Future;

use futures_util::future::BoxFuture;

use crate::dispatch::{BoxError, Context};

pub use client::WebSocketClient;
pub use connection::{FrameSender, WebSocketSettings};
pub use error::{EnvelopeError, FrameError, HandshakeError, WebSocketError};
pub use frame::{Frame, Opcode};
pub use server::WebSocketServer;

/// Payload sent back when no handler is registered for a sub-path.
pub const NOT_FOUND_MESSAGE: &[u8] = b"404 Not Found";

/// Handler for messages arriving on one sub-path.
///
/// Implemented for every `Fn(Vec<u8>, FrameSender, Context) -> impl Future`.
pub trait MessageHandler: Send + Sync + 'static {
    fn call(
        &self,
        message: Vec<u8>,
        sender: FrameSender,
        ctx: Context,
    ) -> BoxFuture<'static, Result<(), BoxError>>;
}

impl<F, Fut> MessageHandler for F
where
    F: Fn(Vec<u8>, FrameSender, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn call(
        &self,
        message: Vec<u8>,
        sender: FrameSender,
        ctx: Context,
    ) -> BoxFuture<'static, Result<(), BoxError>> {
        Box::pin(self(message, sender, ctx))
    }
}

/// Replies with [`NOT_FOUND_MESSAGE`] to anything it receives.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFoundHandler;

impl MessageHandler for NotFoundHandler {
    fn call(
        &self,
        _message: Vec<u8>,
        sender: FrameSender,
        _ctx: Context,
    ) -> BoxFuture<'static, Result<(), BoxError>> {
        Box::pin(async move {
            sender.send_frame(NOT_FOUND_MESSAGE).await?;
            Ok(())
        })
    }
}
