/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer than a full header's worth of bytes were available.
    #[error("malformed frame header ({available} of 8 bytes)")]
    MalformedHeader { available: usize },

    /// The declared payload length is outside the accepted range.
    #[error("invalid frame length {length} (max 1048576)")]
    InvalidFrameLength { length: u64 },

    /// The stream ended before the declared payload was complete.
    #[error("truncated frame ({received} of {expected} payload bytes)")]
    TruncatedFrame { expected: usize, received: usize },

    /// The header carries an opcode the protocol does not define.
    #[error("unknown opcode {0}")]
    UnknownOpcode(u32),

    /// The peer closed the stream cleanly at a frame boundary.
    #[error("end of stream")]
    EndOfStream,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Whether the error means the stream has ended, cleanly or not.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(
            self,
            FrameError::EndOfStream
                | FrameError::TruncatedFrame { .. }
                | FrameError::MalformedHeader { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
