//! Composition errors.

use thiserror::Error;

/// Programmer errors raised while building route tables.
///
/// None of these are retryable; they surface synchronously from the
/// registration call that caused them.
#[derive(Debug, Error)]
pub enum CompositionError {
    /// Another composition already claimed this prefix.
    #[error("path already registered: {prefix}")]
    PathAlreadyRegistered { prefix: String },

    /// Structural mutation after `Server::start`.
    #[error("cannot add {what} after the server has started")]
    AlreadyStarted { what: &'static str },

    /// `Server::resolver` called a second time.
    #[error("component resolver already installed")]
    ResolverInstalled,

    /// `Server::start` called a second time.
    #[error("server already started")]
    StartedTwice,

    /// Same pattern registered twice for the same filter method.
    #[error("filter already registered for {method}: {pattern}")]
    DuplicateFilter { method: String, pattern: String },

    /// Pattern is not a valid regular expression.
    #[error("invalid route pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// WebSocket sub-path that cannot be carried in the frame envelope.
    #[error("invalid websocket sub-path {path:?}: {reason}")]
    InvalidSubPath { path: String, reason: &'static str },

    /// WebSocket sub-path registered twice.
    #[error("websocket sub-path already registered: {path}")]
    DuplicateWebSocket { path: String },
}
