//! RFC 6455 frame codec.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::websocket::FrameError;

const FIN: u8 = 0x80;
const MASKED: u8 = 0x80;
const LEN_16: u8 = 126;
const LEN_64: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    Reserved(u8),
}

impl Opcode {
    pub fn from_u8(value: u8) -> Self {
        match value & 0x0F {
            0x0 => Opcode::Continuation,
            0x1 => Opcode::Text,
            0x2 => Opcode::Binary,
            0x8 => Opcode::Close,
            0x9 => Opcode::Ping,
            0xA => Opcode::Pong,
            other => Opcode::Reserved(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Opcode::Continuation => 0x0,
            Opcode::Text => 0x1,
            Opcode::Binary => 0x2,
            Opcode::Close => 0x8,
            Opcode::Ping => 0x9,
            Opcode::Pong => 0xA,
            Opcode::Reserved(other) => *other & 0x0F,
        }
    }
}

/// A decoded frame. The payload is already unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: Opcode,
    /// Mask key the peer used, if any.
    pub mask: Option<[u8; 4]>,
    pub payload: Vec<u8>,
}

/// Read one frame.
///
/// Returns `Ok(None)` on a clean end of stream before the first header byte.
/// A stream that ends anywhere later is [`FrameError::ConnectionClosed`].
pub async fn read_frame<R>(reader: &mut R, max_payload: usize) -> Result<Option<Frame>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    let first = reader.read(&mut header[..1]).await?;
    if first == 0 {
        return Ok(None);
    }
    read_exact(reader, &mut header[1..]).await?;

    let fin = header[0] & FIN != 0;
    let opcode = Opcode::from_u8(header[0]);
    let masked = header[1] & MASKED != 0;

    let len = match header[1] & 0x7F {
        LEN_16 => {
            let mut ext = [0u8; 2];
            read_exact(reader, &mut ext).await?;
            u64::from(u16::from_be_bytes(ext))
        }
        LEN_64 => {
            let mut ext = [0u8; 8];
            read_exact(reader, &mut ext).await?;
            let len = u64::from_be_bytes(ext);
            if len >> 63 != 0 {
                return Err(FrameError::InvalidLength);
            }
            len
        }
        short => u64::from(short),
    };
    let len = usize::try_from(len)
        .ok()
        .filter(|len| *len <= max_payload)
        .ok_or(FrameError::TooLarge {
            len,
            limit: max_payload,
        })?;

    let mask = if masked {
        let mut key = [0u8; 4];
        read_exact(reader, &mut key).await?;
        Some(key)
    } else {
        None
    };

    let mut payload = vec![0u8; len];
    read_exact(reader, &mut payload).await?;
    if let Some(key) = mask {
        apply_mask(&mut payload, key);
    }

    Ok(Some(Frame {
        fin,
        opcode,
        mask,
        payload,
    }))
}

async fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), FrameError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(FrameError::ConnectionClosed),
        Err(e) => Err(FrameError::Io(e)),
    }
}

/// Encode a single FIN frame, masking the payload when a key is given.
pub fn encode_frame(opcode: Opcode, payload: &[u8], mask: Option<[u8; 4]>) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 14);
    frame.push(FIN | opcode.as_u8());

    let mask_bit = if mask.is_some() { MASKED } else { 0 };
    let len = payload.len();
    if len < usize::from(LEN_16) {
        frame.push(mask_bit | len as u8);
    } else if len <= usize::from(u16::MAX) {
        frame.push(mask_bit | LEN_16);
        frame.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        frame.push(mask_bit | LEN_64);
        frame.extend_from_slice(&(len as u64).to_be_bytes());
    }

    match mask {
        Some(key) => {
            frame.extend_from_slice(&key);
            let start = frame.len();
            frame.extend_from_slice(payload);
            apply_mask(&mut frame[start..], key);
        }
        None => frame.extend_from_slice(payload),
    }
    frame
}

/// XOR every byte against `key[i % 4]`. Applying it twice restores the input.
pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn decode(bytes: Vec<u8>) -> Result<Option<Frame>, FrameError> {
        let mut reader = std::io::Cursor::new(bytes);
        read_frame(&mut reader, 1 << 20).await
    }

    #[tokio::test]
    async fn round_trips_every_length_encoding() {
        for len in [5usize, 200, 70_000] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let encoded = encode_frame(Opcode::Binary, &payload, None);
            let header_len = match len {
                5 => 2,
                200 => 4,
                _ => 10,
            };
            assert_eq!(encoded.len(), header_len + len);

            let frame = decode(encoded).await.unwrap().unwrap();
            assert!(frame.fin);
            assert_eq!(frame.opcode, Opcode::Binary);
            assert_eq!(frame.payload, payload);
        }
    }

    #[tokio::test]
    async fn unmasks_against_known_key() {
        // RFC 6455 5.7: masked "Hello".
        let bytes = vec![
            0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58,
        ];
        let frame = decode(bytes).await.unwrap().unwrap();
        assert_eq!(frame.opcode, Opcode::Text);
        assert_eq!(frame.mask, Some([0x37, 0xfa, 0x21, 0x3d]));
        assert_eq!(frame.payload, b"Hello");

        let encoded = encode_frame(Opcode::Text, b"Hello", Some([0x37, 0xfa, 0x21, 0x3d]));
        assert_eq!(
            encoded,
            vec![0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58]
        );
    }

    #[tokio::test]
    async fn clean_eof_is_not_an_error() {
        assert!(decode(Vec::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn short_payload_is_connection_closed() {
        let mut bytes = encode_frame(Opcode::Text, b"truncated", None);
        bytes.truncate(6);
        assert!(matches!(
            decode(bytes).await,
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn oversized_frames_are_rejected() {
        let mut bytes = vec![0x82, 127];
        bytes.extend_from_slice(&(1u64 << 63).to_be_bytes());
        assert!(matches!(decode(bytes).await, Err(FrameError::InvalidLength)));

        let encoded = encode_frame(Opcode::Binary, &[0u8; 300], None);
        let mut reader = std::io::Cursor::new(encoded);
        assert!(matches!(
            read_frame(&mut reader, 100).await,
            Err(FrameError::TooLarge { len: 300, limit: 100 })
        ));
    }

    #[test]
    fn opcodes_round_trip() {
        for byte in 0u8..16 {
            assert_eq!(Opcode::from_u8(byte).as_u8(), byte);
        }
    }
}
