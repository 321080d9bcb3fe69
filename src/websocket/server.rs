//! Accept loop for the WebSocket engine.

use std::time::Duration;

use tokio::sync::broadcast;

use crate::lifecycle::Shutdown;
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;
use crate::server::Engine;

/// How long shutdown waits for open connections.
const DRAIN_LIMIT: Duration = Duration::from_secs(10);

/// Serves every accepted TCP connection as a WebSocket connection.
#[derive(Debug)]
pub struct WebSocketServer {
    engine: Engine,
    tracker: ConnectionTracker,
}

impl WebSocketServer {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            tracker: ConnectionTracker::new(),
        }
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Accept connections until `shutdown` fires, then close every open
    /// connection and wait for them to finish.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(address = %addr, "WebSocket server starting");
        let connections = Shutdown::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer, permit) = match accepted {
                        Ok(accepted) => accepted,
                        Err(ListenerError::Accept(e)) => {
                            tracing::warn!(error = %e, "Accept failed");
                            continue;
                        }
                        Err(e) => return Err(e),
                    };

                    let guard = self.tracker.track();
                    let engine = self.engine.clone();
                    let mut stop = connections.subscribe();
                    tokio::spawn(async move {
                        let _permit = permit;
                        metrics::record_ws_connection(1.0);
                        tracing::debug!(connection_id = %guard.id(), peer = %peer, "WebSocket connection opened");
                        let stopped = async move {
                            let _ = stop.recv().await;
                        };
                        if let Err(e) = engine.serve_websocket_until(stream, stopped).await {
                            tracing::warn!(connection_id = %guard.id(), peer = %peer, error = %e, "WebSocket connection dropped");
                        }
                        metrics::record_ws_connection(-1.0);
                    });
                }
                _ = shutdown.recv() => {
                    tracing::info!(open = self.tracker.active_count(), "WebSocket server shutting down");
                    break;
                }
            }
        }

        connections.trigger();
        if !self.tracker.drain(DRAIN_LIMIT).await {
            tracing::warn!(
                open = self.tracker.active_count(),
                "WebSocket connections still open after drain limit"
            );
        }
        tracing::info!("WebSocket server stopped");
        Ok(())
    }
}
