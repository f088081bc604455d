//! Frame codec for the Discord desktop IPC.
//!
//! Every message on the wire is framed with:
//! - A 4-byte little-endian opcode
//! - A 4-byte little-endian payload length
//!
//! followed by exactly `length` payload bytes, with no padding.
//! No partial reads, no buffer management in user code.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod opcode;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::IpcCodec;
pub use codec::{
    decode_frame, decode_header, encode, encode_frame, Frame, HEADER_SIZE, MAX_PAYLOAD,
};
pub use error::{FrameError, Result};
pub use opcode::Opcode;
pub use reader::FrameReader;
pub use writer::FrameWriter;
