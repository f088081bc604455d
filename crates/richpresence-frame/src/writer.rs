use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, Frame};
use crate::error::{FrameError, Result};
use crate::opcode::Opcode;

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Writes complete frames to any `Write` stream.
///
/// Header and payload go out in a single buffer so that a frame is never
/// interleaved with another writer's bytes on the same handle.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.opcode, frame.payload.as_ref())
    }

    /// Encode and send a payload under an opcode.
    pub fn send(&mut self, opcode: Opcode, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(opcode, payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::EndOfStream),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{decode_frame, MAX_PAYLOAD};

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(Opcode::Message, b"hello").unwrap();

        let inner = writer.into_inner();
        let mut wire = BytesMut::from(inner.into_inner().as_slice());
        let frame = decode_frame(&mut wire).unwrap().unwrap();
        assert_eq!(frame.opcode, Opcode::Message);
        assert_eq!(frame.payload.as_ref(), b"hello");
    }

    #[test]
    fn write_frame_uses_frame_fields() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer
            .write_frame(&Frame::new(Opcode::Pong, b"abc".to_vec()))
            .unwrap();

        let bytes = writer.into_inner().into_inner();
        assert_eq!(&bytes[..8], &[4, 0, 0, 0, 3, 0, 0, 0]);
        assert_eq!(&bytes[8..], b"abc");
    }

    #[test]
    fn empty_payload_is_header_only() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(Opcode::Close, b"").unwrap();
        assert_eq!(writer.get_ref().get_ref().len(), 8);
    }

    #[test]
    fn oversized_payload_is_rejected_without_writing() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        let err = writer.send(Opcode::Message, &payload).unwrap_err();
        assert!(matches!(err, FrameError::InvalidFrameLength { .. }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn zero_length_write_means_peer_gone() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(Opcode::Message, b"x").unwrap_err();
        assert!(matches!(err, FrameError::EndOfStream));
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn interrupted_write_retries() {
        let mut writer = FrameWriter::new(InterruptOnce {
            interrupted: false,
            out: Vec::new(),
        });
        writer.send(Opcode::Ping, b"hi").unwrap();
        assert_eq!(writer.get_ref().out.len(), 10);
    }

    struct InterruptOnce {
        interrupted: bool,
        out: Vec<u8>,
    }

    impl Write for InterruptOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.out.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
