//! WebSocket error types.

use std::io;

use thiserror::Error;

/// Opening handshake failures. The connection is dropped without a reply.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("handshake io error: {0}")]
    Io(#[from] io::Error),

    #[error("connection closed during handshake")]
    ConnectionClosed,

    #[error("handshake exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("handshake timed out")]
    Timeout,

    #[error("malformed handshake: {0}")]
    Malformed(String),

    #[error("handshake method must be GET, got {0}")]
    NotUpgrade(String),

    #[error("missing Sec-WebSocket-Key header")]
    MissingKey,

    #[error("upgrade rejected with status {0}")]
    Rejected(u16),

    #[error("Sec-WebSocket-Accept mismatch")]
    AcceptMismatch,
}

/// Frame-level read failures.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame io error: {0}")]
    Io(#[from] io::Error),

    /// Peer went away in the middle of a frame.
    #[error("connection closed mid-frame")]
    ConnectionClosed,

    #[error("invalid 64-bit payload length")]
    InvalidLength,

    #[error("frame payload of {len} bytes exceeds {limit}")]
    TooLarge { len: u64, limit: usize },
}

/// Sub-path envelope failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("empty payload has no sub-path length byte")]
    Empty,

    #[error("payload declares a {declared}-byte sub-path but carries {available}")]
    Truncated { declared: usize, available: usize },

    #[error("sub-path is not ASCII")]
    NonAscii,

    #[error("sub-path of {len} bytes exceeds 255")]
    TooLong { len: usize },
}

/// Anything that ends a WebSocket connection abnormally.
#[derive(Debug, Error)]
pub enum WebSocketError {
    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("websocket io error: {0}")]
    Io(#[from] io::Error),

    #[error("connection idle for too long")]
    IdleTimeout,

    /// The connection is closed; nothing more can be sent.
    #[error("connection closed")]
    Closed,
}
