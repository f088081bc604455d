//! Discord desktop IPC client.
//!
//! This is the connection layer: find a listening desktop client, identify
//! with an application id, then exchange opcode-tagged frames. It also owns
//! the `SET_ACTIVITY` payload shape.

pub mod activity;
pub mod client;
pub mod error;
pub mod handshake;

pub use activity::{Activity, SetActivity};
pub use client::{ConnectionState, IpcClient, ShutdownHandle};
pub use error::{IpcError, Result};
pub use handshake::{
    handshake, validate_client_id, HandshakeConfig, HandshakeRequest, HandshakeResult,
};
