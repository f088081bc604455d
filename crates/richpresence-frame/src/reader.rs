use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use richpresence_transport::{IpcStream, TransportError};

use crate::codec::{decode_frame, decode_header, Frame, HEADER_SIZE};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// End of stream is classified by where it lands: at a frame boundary it
    /// is [`FrameError::EndOfStream`], inside a header it is
    /// [`FrameError::MalformedHeader`], inside a payload it is
    /// [`FrameError::TruncatedFrame`].
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(self.end_of_stream_error());
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    fn end_of_stream_error(&self) -> FrameError {
        if self.buf.is_empty() {
            return FrameError::EndOfStream;
        }
        match decode_header(&self.buf) {
            Ok((_, expected)) => FrameError::TruncatedFrame {
                expected,
                received: self.buf.len() - HEADER_SIZE,
            },
            Err(err) => err,
        }
    }

    /// Bytes already pulled off the stream but not yet returned as frames.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl FrameReader<IpcStream> {
    /// Whether at least one full header is available without blocking,
    /// counting both this reader's buffer and bytes queued in the stream.
    ///
    /// A peer that hung up with nothing left to read is reported the same
    /// way [`FrameReader::read_frame`] would report it.
    pub fn has_pending_header(&self) -> Result<bool> {
        if self.buf.len() >= HEADER_SIZE {
            return Ok(true);
        }
        let available = match self.inner.bytes_available() {
            Ok(available) => available,
            Err(TransportError::Io(io)) if io.kind() == ErrorKind::UnexpectedEof => {
                return Err(self.end_of_stream_error());
            }
            Err(err) => return Err(transport_to_frame_error(err)),
        };
        Ok(self.buf.len() + available >= HEADER_SIZE)
    }
}

fn transport_to_frame_error(err: TransportError) -> FrameError {
    match err {
        TransportError::Io(io) => FrameError::Io(io),
        TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
