//! Request dispatch and WebSocket engine.
//!
//! A server is composed before it starts (routes, filters, WebSocket
//! sub-paths, nested path prefixes, component resolver) and then frozen into
//! an [`Engine`] that dispatches buffered HTTP requests and serves
//! WebSocket connections.

// Core engine
pub mod components;
pub mod dispatch;
pub mod routing;
pub mod server;
pub mod websocket;

// Host bindings
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::EngineConfig;
pub use dispatch::{BoxError, Context, Flow, Request, Response};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Compose, Composer, CompositionError, Method};
pub use server::{Engine, Server, ServerError};
pub use websocket::{FrameSender, WebSocketClient, WebSocketServer};
