use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::opcode::Opcode;

/// Frame header: opcode (4) + length (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Largest payload accepted in either direction: 1 MiB.
///
/// Lengths above this are rejected before any allocation happens.
pub const MAX_PAYLOAD: usize = 1_048_576;

/// An opcode-tagged message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// What kind of message this is.
    pub opcode: Opcode,
    /// The message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(opcode: Opcode, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Payload as UTF-8 text, with invalid sequences replaced.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────┬──────────────────┐
/// │ Opcode       │ Length       │ Payload          │
/// │ (4B LE u32)  │ (4B LE u32)  │ (Length bytes)   │
/// └──────────────┴──────────────┴──────────────────┘
/// ```
pub fn encode_frame(opcode: Opcode, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::InvalidFrameLength {
            length: payload.len() as u64,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u32_le(opcode.as_u32());
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Encode a single frame into a fresh buffer.
pub fn encode(opcode: Opcode, payload: &[u8]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    encode_frame(opcode, payload, &mut buf)?;
    Ok(buf.freeze())
}

/// Decode a frame header into `(opcode, payload length)`.
///
/// Only the first [`HEADER_SIZE`] bytes are inspected.
pub fn decode_header(header: &[u8]) -> Result<(Opcode, usize)> {
    if header.len() < HEADER_SIZE {
        return Err(FrameError::MalformedHeader {
            available: header.len(),
        });
    }

    let mut fields = &header[..HEADER_SIZE];
    let raw_opcode = fields.get_u32_le();
    let length = fields.get_u32_le();

    if length as usize > MAX_PAYLOAD {
        return Err(FrameError::InvalidFrameLength {
            length: u64::from(length),
        });
    }

    let opcode = Opcode::try_from(raw_opcode)?;
    Ok((opcode, length as usize))
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. A header that fails
/// validation is an error as soon as its 8 bytes are present.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let (opcode, payload_len) = decode_header(&src[..HEADER_SIZE])?;

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { opcode, payload }))
}
