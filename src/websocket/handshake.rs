//! Opening handshake for both roles.

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::websocket::HandshakeError;

pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const MAX_HEADERS: usize = 64;

/// Offset just past the `\r\n\r\n` ending an HTTP head.
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

/// Read an HTTP head of at most `max` bytes.
///
/// Returns the head and any bytes read past it, which belong to the first
/// frame and must be replayed before reading the socket again.
pub async fn read_head<R>(reader: &mut R, max: usize) -> Result<(Vec<u8>, Vec<u8>), HandshakeError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(HandshakeError::ConnectionClosed);
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = find_header_end(&buf) {
            if end > max {
                return Err(HandshakeError::TooLarge { limit: max });
            }
            let leftover = buf.split_off(end);
            return Ok((buf, leftover));
        }
        if buf.len() > max {
            return Err(HandshakeError::TooLarge { limit: max });
        }
    }
}

/// Validate a client upgrade request and return its `Sec-WebSocket-Key`.
pub fn parse_upgrade_request(head: &[u8]) -> Result<String, HandshakeError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    let status = req
        .parse(head)
        .map_err(|e| HandshakeError::Malformed(e.to_string()))?;
    if status.is_partial() {
        return Err(HandshakeError::Malformed("partial request head".into()));
    }

    let method = req.method.unwrap_or_default();
    if method != "GET" {
        return Err(HandshakeError::NotUpgrade(method.to_string()));
    }

    req.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("sec-websocket-key"))
        .and_then(|h| std::str::from_utf8(h.value).ok())
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or(HandshakeError::MissingKey)
}

/// `base64(SHA1(key + GUID))`.
pub fn compute_accept_key(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(WEBSOCKET_GUID.as_bytes());
    BASE64_STANDARD.encode(sha1.finalize())
}

/// The fixed three-header `101` reply.
pub fn upgrade_response(key: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {}\r\n\r\n",
        compute_accept_key(key)
    )
}

/// Random 16-byte nonce, base64 encoded.
pub fn generate_key() -> String {
    let mut nonce = [0u8; 16];
    fastrand::fill(&mut nonce);
    BASE64_STANDARD.encode(nonce)
}

pub fn client_request(host: &str, path: &str, key: &str) -> String {
    format!(
        "GET {path} HTTP/1.1\r\nHost: {host}\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: {key}\r\nSec-WebSocket-Version: 13\r\n\r\n"
    )
}

/// Check the server's reply to [`client_request`].
pub fn verify_upgrade_response(head: &[u8], key: &str) -> Result<(), HandshakeError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut res = httparse::Response::new(&mut headers);
    let status = res
        .parse(head)
        .map_err(|e| HandshakeError::Malformed(e.to_string()))?;
    if status.is_partial() {
        return Err(HandshakeError::Malformed("partial response head".into()));
    }

    let code = res.code.unwrap_or_default();
    if code != 101 {
        return Err(HandshakeError::Rejected(code));
    }

    let expected = compute_accept_key(key);
    let accepted = res
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("sec-websocket-accept"))
        .is_some_and(|h| h.value == expected.as_bytes());
    if !accepted {
        return Err(HandshakeError::AcceptMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"GET /chat HTTP/1.1\r\nHost: server.example.com\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n";

    #[test]
    fn accept_key_matches_rfc_vector() {
        assert_eq!(
            compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn parses_upgrade_request() {
        assert_eq!(parse_upgrade_request(SAMPLE).unwrap(), "dGhlIHNhbXBsZSBub25jZQ==");

        let no_key = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n";
        assert!(matches!(parse_upgrade_request(no_key), Err(HandshakeError::MissingKey)));

        let post = b"POST / HTTP/1.1\r\nSec-WebSocket-Key: abc\r\n\r\n";
        assert!(matches!(parse_upgrade_request(post), Err(HandshakeError::NotUpgrade(_))));
    }

    #[test]
    fn response_carries_three_headers() {
        let response = upgrade_response("dGhlIHNhbXBsZSBub25jZQ==");
        assert!(response.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
        assert!(verify_upgrade_response(response.as_bytes(), "dGhlIHNhbXBsZSBub25jZQ==").is_ok());
        assert!(matches!(
            verify_upgrade_response(response.as_bytes(), "b3RoZXIga2V5IG5vbmNlIQ=="),
            Err(HandshakeError::AcceptMismatch)
        ));
    }

    #[tokio::test]
    async fn read_head_keeps_leftover_bytes() {
        let mut input = SAMPLE.to_vec();
        input.extend_from_slice(&[0x81, 0x00]);
        let mut reader = std::io::Cursor::new(input);

        let (head, leftover) = read_head(&mut reader, 4096).await.unwrap();
        assert_eq!(head, SAMPLE);
        assert_eq!(leftover, vec![0x81, 0x00]);

        let mut reader = std::io::Cursor::new(SAMPLE.to_vec());
        assert!(matches!(
            read_head(&mut reader, 16).await,
            Err(HandshakeError::TooLarge { limit: 16 })
        ));
    }

    #[test]
    fn generated_keys_are_16_bytes() {
        let key = generate_key();
        assert_eq!(BASE64_STANDARD.decode(&key).unwrap().len(), 16);
        assert_ne!(key, generate_key());
    }
}
