//! The started, read-only side of a server.

use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::EngineConfig;
use crate::dispatch::{Dispatched, Dispatcher, Request, Response};
use crate::routing::RouteTable;
use crate::websocket::connection::{self, WebSocketSettings};
use crate::websocket::WebSocketError;

/// Cloneable dispatch engine shared by every transport binding.
#[derive(Debug, Clone)]
pub struct Engine {
    dispatcher: Arc<Dispatcher>,
    config: Arc<EngineConfig>,
    websocket: WebSocketSettings,
}

impl Engine {
    pub(crate) fn new(dispatcher: Dispatcher, config: EngineConfig) -> Self {
        Self {
            websocket: WebSocketSettings::from(&config),
            dispatcher: Arc::new(dispatcher),
            config: Arc::new(config),
        }
    }

    /// Dispatch one fully buffered request.
    pub async fn dispatch(&self, request: Request, response: Response) -> Dispatched {
        self.dispatcher.dispatch(request, response).await
    }

    /// Run the WebSocket protocol over an accepted stream until it closes.
    pub async fn serve_websocket<S>(&self, stream: S) -> Result<(), WebSocketError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        self.serve_websocket_until(stream, std::future::pending()).await
    }

    /// Like [`serve_websocket`](Self::serve_websocket), but closes the
    /// connection (with a close frame) once `shutdown` resolves.
    pub async fn serve_websocket_until<S, F>(&self, stream: S, shutdown: F) -> Result<(), WebSocketError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
        F: Future<Output = ()> + Send,
    {
        connection::serve(
            stream,
            self.dispatcher.clone(),
            self.websocket.clone(),
            shutdown,
        )
        .await
    }

    pub fn table(&self) -> &RouteTable {
        self.dispatcher.table()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
