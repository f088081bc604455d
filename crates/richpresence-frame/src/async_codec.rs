//! `tokio-util` codec for async hosts.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, decode_header, encode_frame, Frame, HEADER_SIZE};
use crate::error::FrameError;

/// Frame codec for `tokio_util::codec::Framed*`.
///
/// End of stream follows the same classification as
/// [`FrameReader`](crate::FrameReader): clean at a boundary, malformed inside a
/// header, truncated inside a payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct IpcCodec;

impl Decoder for IpcCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        decode_frame(src)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if let Some(frame) = decode_frame(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let (_, expected) = decode_header(src)?;
        Err(FrameError::TruncatedFrame {
            expected,
            received: src.len() - HEADER_SIZE,
        })
    }
}

impl Encoder<Frame> for IpcCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(item.opcode, &item.payload, dst)
    }
}

impl Encoder<&Frame> for IpcCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(item.opcode, &item.payload, dst)
    }
}
