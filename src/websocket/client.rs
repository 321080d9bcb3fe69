//! Client role: connect, send enveloped messages, read server frames.

use std::io::Cursor;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, Chain, ReadHalf, WriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::websocket::envelope;
use crate::websocket::frame::{encode_frame, read_frame, Frame, Opcode};
use crate::websocket::handshake::{client_request, generate_key, read_head, verify_upgrade_response};
use crate::websocket::{HandshakeError, WebSocketError};

const MAX_RESPONSE_HEAD: usize = 8 * 1024;
const MAX_INBOUND_FRAME: usize = 16 * 1024 * 1024;

/// A connected client.
///
/// Every outbound frame is masked with a fresh random key.
pub struct WebSocketClient<S = TcpStream> {
    reader: Chain<Cursor<Vec<u8>>, ReadHalf<S>>,
    writer: WriteHalf<S>,
}

impl WebSocketClient<TcpStream> {
    /// Open a TCP connection and run the handshake for `path`.
    pub async fn connect<A>(addr: A, path: &str) -> Result<Self, WebSocketError>
    where
        A: ToSocketAddrs + std::fmt::Display,
    {
        let host = addr.to_string();
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Self::handshake(stream, &host, path).await
    }
}

impl<S> WebSocketClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Run the client handshake over an already connected stream.
    pub async fn handshake(stream: S, host: &str, path: &str) -> Result<Self, WebSocketError> {
        let (mut read_half, mut writer) = tokio::io::split(stream);
        let key = generate_key();
        writer
            .write_all(client_request(host, path, &key).as_bytes())
            .await
            .map_err(HandshakeError::from)?;
        writer.flush().await.map_err(HandshakeError::from)?;

        let (head, leftover) = read_head(&mut read_half, MAX_RESPONSE_HEAD).await?;
        verify_upgrade_response(&head, &key)?;

        Ok(Self {
            reader: Cursor::new(leftover).chain(read_half),
            writer,
        })
    }

    /// Send `message` to the server-side handler registered for `sub_path`.
    pub async fn send(&mut self, sub_path: &str, message: &[u8]) -> Result<(), WebSocketError> {
        let payload = envelope::join(sub_path, message)?;
        self.send_frame(Opcode::Binary, &payload).await
    }

    /// Send a raw masked frame.
    pub async fn send_frame(&mut self, opcode: Opcode, payload: &[u8]) -> Result<(), WebSocketError> {
        let mut mask = [0u8; 4];
        fastrand::fill(&mut mask);
        self.writer
            .write_all(&encode_frame(opcode, payload, Some(mask)))
            .await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next frame from the server, or `None` once the stream ended.
    pub async fn recv(&mut self) -> Result<Option<Frame>, WebSocketError> {
        Ok(read_frame(&mut self.reader, MAX_INBOUND_FRAME).await?)
    }

    /// Send a close frame and wait for the server's.
    pub async fn close(mut self) -> Result<(), WebSocketError> {
        self.send_frame(Opcode::Close, &[]).await?;
        while let Some(frame) = self.recv().await? {
            if frame.opcode == Opcode::Close {
                break;
            }
        }
        Ok(())
    }
}

impl<S> std::fmt::Debug for WebSocketClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketClient").finish_non_exhaustive()
    }
}
