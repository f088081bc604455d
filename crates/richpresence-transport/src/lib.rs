//! Local IPC channel handles for talking to the Discord desktop client.
//!
//! Provides a unified stream type over the two local transports the desktop
//! client listens on:
//! - Unix domain sockets (Linux/macOS), `$XDG_RUNTIME_DIR/discord-ipc-N`
//! - Named pipes (Windows), `\\?\pipe\discord-ipc-N`
//!
//! This is the lowest layer of richpresence. Everything else builds on top of
//! the [`IpcStream`] type and the [`Discovery`] trait provided here.

pub mod discovery;
pub mod error;
pub mod traits;

#[cfg(windows)]
pub mod pipe;
#[cfg(unix)]
pub mod uds;

pub use discovery::{channel_name, Discovery, LocalDiscovery, CANDIDATE_COUNT};
pub use error::{Result, TransportError};
pub use traits::IpcStream;

#[cfg(windows)]
pub use pipe::NamedPipe;
#[cfg(unix)]
pub use uds::UnixDomainSocket;
