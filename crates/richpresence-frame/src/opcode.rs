//! Frame opcodes.
//!
//! The set is fixed by the desktop client and is not extensible.

use crate::error::FrameError;

/// Frame opcode, the first header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    /// Client identification, first frame on a new connection.
    Handshake = 0,
    /// JSON command or event.
    Message = 1,
    /// Peer is closing the connection.
    Close = 2,
    /// Keep-alive request; must be answered with a `Pong` echoing the payload.
    Ping = 3,
    /// Keep-alive response.
    Pong = 4,
}

impl Opcode {
    /// Wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Handshake => "HANDSHAKE",
            Opcode::Message => "MESSAGE",
            Opcode::Close => "CLOSE",
            Opcode::Ping => "PING",
            Opcode::Pong => "PONG",
        }
    }
}

impl TryFrom<u32> for Opcode {
    type Error = FrameError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Handshake),
            1 => Ok(Opcode::Message),
            2 => Ok(Opcode::Close),
            3 => Ok(Opcode::Ping),
            4 => Ok(Opcode::Pong),
            other => Err(FrameError::UnknownOpcode(other)),
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
