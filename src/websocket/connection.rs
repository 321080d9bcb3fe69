//! Server side of one WebSocket connection.
//!
//! # Responsibilities
//! - Run the opening handshake under a timeout
//! - Read frames in arrival order and hand messages to their sub-path handler
//! - Serialize outbound frames from every handler through one writer task
//! - Never outlive the read side: a stalled writer is aborted
//!
//! # Design Decisions
//! - Handlers run on their own tasks; the read loop only decodes and spawns
//! - A malformed envelope is a protocol error and drops the connection
//! - Ping, pong and continuation frames are read and discarded

use std::collections::HashMap;
use std::future::Future;
use std::io::Cursor;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::EngineConfig;
use crate::dispatch::{BoxError, Dispatcher, FailureOrigin, Panicked};
use crate::observability::metrics;
use crate::routing::RouteMatch;
use crate::websocket::envelope;
use crate::websocket::frame::{encode_frame, read_frame, Opcode};
use crate::websocket::handshake::{parse_upgrade_request, read_head, upgrade_response};
use crate::websocket::{HandshakeError, MessageHandler, NotFoundHandler, WebSocketError};

/// Longest a closing connection waits for its writer to flush.
const CLOSE_LIMIT: Duration = Duration::from_secs(5);

/// Per-connection limits.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    pub handshake_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_handshake_bytes: usize,
    pub max_frame_bytes: usize,
    pub outbound_queue: usize,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for WebSocketSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            handshake_timeout: Duration::from_secs(config.timeouts.handshake_secs),
            idle_timeout: Duration::from_secs(config.timeouts.websocket_idle_secs),
            max_handshake_bytes: config.websocket.max_handshake_bytes,
            max_frame_bytes: config.websocket.max_frame_bytes,
            outbound_queue: config.websocket.outbound_queue.max(1),
        }
    }
}

#[derive(Debug)]
enum Outgoing {
    Frame(Vec<u8>),
    /// Write a bare close frame, then stop.
    Close,
}

/// Handle for sending frames back over the connection a message came from.
///
/// Cheap to clone. Sends fail with [`WebSocketError::Closed`] once the
/// connection is gone.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<Outgoing>,
}

impl FrameSender {
    /// Send `payload` as a single unmasked FIN text frame.
    pub async fn send_frame(&self, payload: impl AsRef<[u8]>) -> Result<(), WebSocketError> {
        self.send(Opcode::Text, payload.as_ref()).await
    }

    /// Send `payload` as a single unmasked FIN binary frame.
    pub async fn send_binary(&self, payload: impl AsRef<[u8]>) -> Result<(), WebSocketError> {
        self.send(Opcode::Binary, payload.as_ref()).await
    }

    async fn send(&self, opcode: Opcode, payload: &[u8]) -> Result<(), WebSocketError> {
        self.tx
            .send(Outgoing::Frame(encode_frame(opcode, payload, None)))
            .await
            .map_err(|_| WebSocketError::Closed)?;
        metrics::record_ws_frame("out");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Serve one accepted stream until the peer closes, an error ends it or
/// `shutdown` resolves.
///
/// Whatever ends the connection, the writer task is gone when this returns.
/// A peer that stops reading cannot hold the connection open.
pub async fn serve<S, F>(
    stream: S,
    dispatcher: Arc<Dispatcher>,
    settings: WebSocketSettings,
    shutdown: F,
) -> Result<(), WebSocketError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    F: Future<Output = ()> + Send,
{
    let (mut read_half, mut write_half) = tokio::io::split(stream);

    let (head, leftover) = tokio::time::timeout(
        settings.handshake_timeout,
        read_head(&mut read_half, settings.max_handshake_bytes),
    )
    .await
    .map_err(|_| HandshakeError::Timeout)??;
    let key = parse_upgrade_request(&head)?;
    write_half
        .write_all(upgrade_response(&key).as_bytes())
        .await?;
    write_half.flush().await?;
    tracing::debug!("WebSocket handshake complete");

    let (tx, rx) = mpsc::channel(settings.outbound_queue);
    let mut writer = JoinSet::new();
    writer.spawn(write_loop(write_half, rx));
    let sender = FrameSender { tx };

    let mut reader = Cursor::new(leftover).chain(read_half);
    let result = tokio::select! {
        result = read_loop(&mut reader, &dispatcher, &sender, &settings) => result,
        () = shutdown => {
            tracing::debug!("Closing WebSocket connection for shutdown");
            Ok(Ending::Shutdown)
        }
    };

    match result {
        Ok(Ending::CloseFrame | Ending::Shutdown) => {
            close_writer(&mut writer, sender, settings.idle_timeout.min(CLOSE_LIMIT)).await;
        }
        Ok(Ending::EndOfStream) | Err(_) => writer.abort_all(),
    }
    result.map(|_| ())
}

/// Queue a close frame and give the writer `limit` to flush everything
/// ahead of it. A writer still blocked after that is aborted.
async fn close_writer(
    writer: &mut JoinSet<std::io::Result<()>>,
    sender: FrameSender,
    limit: Duration,
) {
    let reborrowed = &mut *writer;
    let flushed = tokio::time::timeout(limit, async move {
        let _ = sender.tx.send(Outgoing::Close).await;
        drop(sender);
        reborrowed.join_next().await
    })
    .await;

    match flushed {
        Ok(None) | Ok(Some(Ok(Ok(())))) => {}
        Ok(Some(Ok(Err(e)))) => tracing::debug!(error = %e, "WebSocket writer stopped"),
        Ok(Some(Err(e))) => tracing::warn!(error = %e, "WebSocket writer task failed"),
        Err(_) => {
            tracing::debug!(limit = ?limit, "WebSocket writer stalled while closing");
            writer.abort_all();
        }
    }
}

enum Ending {
    CloseFrame,
    EndOfStream,
    Shutdown,
}

async fn read_loop<R>(
    reader: &mut R,
    dispatcher: &Arc<Dispatcher>,
    sender: &FrameSender,
    settings: &WebSocketSettings,
) -> Result<Ending, WebSocketError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = tokio::time::timeout(
            settings.idle_timeout,
            read_frame(reader, settings.max_frame_bytes),
        )
        .await
        .map_err(|_| WebSocketError::IdleTimeout)??;

        let Some(frame) = frame else {
            tracing::debug!("WebSocket peer went away without a close frame");
            return Ok(Ending::EndOfStream);
        };
        metrics::record_ws_frame("in");

        match frame.opcode {
            Opcode::Close => return Ok(Ending::CloseFrame),
            Opcode::Text | Opcode::Binary => deliver(&frame.payload, dispatcher, sender)?,
            other => tracing::trace!(opcode = ?other, "Discarding frame"),
        }
    }
}

/// Route one payload to its sub-path handler on a fresh task.
fn deliver(
    payload: &[u8],
    dispatcher: &Arc<Dispatcher>,
    sender: &FrameSender,
) -> Result<(), WebSocketError> {
    let (sub_path, message) = envelope::split(payload)?;
    let handler: Arc<dyn MessageHandler> = match dispatcher.table().websocket(sub_path) {
        Some(handler) => handler.clone(),
        None => {
            tracing::debug!(sub_path, "No WebSocket handler for sub-path");
            Arc::new(NotFoundHandler)
        }
    };

    let ctx = dispatcher.context(RouteMatch::new(sub_path, HashMap::new()));
    let request_id = ctx.request_id();
    let call = handler.call(message.to_vec(), sender.clone(), ctx);
    let dispatcher = dispatcher.clone();
    let sub_path = sub_path.to_string();

    tokio::spawn(async move {
        let outcome = AssertUnwindSafe(call)
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Box::new(Panicked::from_payload(panic.as_ref())) as BoxError));
        if let Err(error) = outcome {
            dispatcher.report(request_id, FailureOrigin::WebSocket { sub_path }, &error);
        }
    });
    Ok(())
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<Outgoing>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(outgoing) = rx.recv().await {
        match outgoing {
            Outgoing::Frame(bytes) => {
                writer.write_all(&bytes).await?;
                writer.flush().await?;
            }
            Outgoing::Close => {
                writer.write_all(&encode_frame(Opcode::Close, &[], None)).await?;
                writer.flush().await?;
                break;
            }
        }
    }
    rx.close();
    writer.shutdown().await
}
