//! Sub-path envelope carried at the front of every inbound payload.
//!
//! Layout: one length byte `N`, `N` ASCII bytes of sub-path, then the message.

use crate::routing::CompositionError;
use crate::websocket::EnvelopeError;

/// Longest sub-path the length byte can describe.
pub const MAX_SUB_PATH: usize = u8::MAX as usize;

/// Check at registration time that `path` fits the envelope.
pub fn validate_sub_path(path: &str) -> Result<(), CompositionError> {
    if path.len() > MAX_SUB_PATH {
        return Err(CompositionError::InvalidSubPath {
            path: path.to_string(),
            reason: "longer than 255 bytes",
        });
    }
    if !path.is_ascii() {
        return Err(CompositionError::InvalidSubPath {
            path: path.to_string(),
            reason: "not ASCII",
        });
    }
    Ok(())
}

/// Split a payload into `(sub_path, message)`.
pub fn split(payload: &[u8]) -> Result<(&str, &[u8]), EnvelopeError> {
    let (&len, rest) = payload.split_first().ok_or(EnvelopeError::Empty)?;
    let len = usize::from(len);
    if rest.len() < len {
        return Err(EnvelopeError::Truncated {
            declared: len,
            available: rest.len(),
        });
    }
    let (path, message) = rest.split_at(len);
    if !path.is_ascii() {
        return Err(EnvelopeError::NonAscii);
    }
    let path = std::str::from_utf8(path).map_err(|_| EnvelopeError::NonAscii)?;
    Ok((path, message))
}

/// Build a payload addressed to `sub_path`.
pub fn join(sub_path: &str, message: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    if !sub_path.is_ascii() {
        return Err(EnvelopeError::NonAscii);
    }
    let len = u8::try_from(sub_path.len()).map_err(|_| EnvelopeError::TooLong {
        len: sub_path.len(),
    })?;
    let mut payload = Vec::with_capacity(1 + sub_path.len() + message.len());
    payload.push(len);
    payload.extend_from_slice(sub_path.as_bytes());
    payload.extend_from_slice(message);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_sub_path_from_message() {
        let payload = [3, b'/', b'a', b'b', b'h', b'i'];
        assert_eq!(split(&payload), Ok(("/ab", &b"hi"[..])));
        assert_eq!(split(&[0]), Ok(("", &b""[..])));
    }

    #[test]
    fn rejects_malformed_envelopes() {
        assert_eq!(split(&[]), Err(EnvelopeError::Empty));
        assert_eq!(
            split(&[4, b'/', b'a']),
            Err(EnvelopeError::Truncated {
                declared: 4,
                available: 2
            })
        );
        assert_eq!(split(&[1, 0xC3]), Err(EnvelopeError::NonAscii));
    }

    #[test]
    fn join_limits_sub_path_length() {
        assert_eq!(join("/ab", b"x").unwrap(), vec![3, b'/', b'a', b'b', b'x']);
        let long = "x".repeat(256);
        assert_eq!(join(&long, b""), Err(EnvelopeError::TooLong { len: 256 }));
        assert!(validate_sub_path(&long).is_err());
        assert!(validate_sub_path(&"x".repeat(255)).is_ok());
        assert!(validate_sub_path("/caf\u{e9}").is_err());
    }
}
