//! Discord rich presence over the local desktop IPC.
//!
//! # Crate Structure
//!
//! - [`transport`]: OS channel to the desktop client (Unix socket, named pipe)
//! - [`frame`]: opcode-tagged, length-prefixed framing
//! - [`ipc`]: handshake, connection state and the `SET_ACTIVITY` payload
//! - [`engine`]: the presence service, identity resolution and config

/// Re-export transport types.
pub mod transport {
    pub use richpresence_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use richpresence_frame::*;
}

/// Re-export client types.
pub mod ipc {
    pub use richpresence_ipc::*;
}

/// Re-export presence engine types.
pub mod engine {
    pub use richpresence_engine::*;
}
