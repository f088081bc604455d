//! Candidate channel discovery.
//!
//! The desktop client listens on the first free name out of
//! `discord-ipc-0` .. `discord-ipc-9`, so several running instances each get
//! their own index. Callers probe indices in ascending order.

use std::path::PathBuf;

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::IpcStream;

/// Number of candidate channel indices probed during discovery.
pub const CANDIDATE_COUNT: u8 = 10;

/// Channel name for a candidate index.
pub fn channel_name(index: u8) -> String {
    format!("discord-ipc-{index}")
}

/// Opens candidate channel `index`, or fails.
///
/// This is the only thing the connection layer needs to know about where the
/// peer lives. Closures `Fn(u8) -> Result<IpcStream>` implement it as well.
pub trait Discovery: Send {
    /// Open candidate `index` (0..[`CANDIDATE_COUNT`]).
    fn open(&self, index: u8) -> Result<IpcStream>;
}

impl<F> Discovery for F
where
    F: Fn(u8) -> Result<IpcStream> + Send,
{
    fn open(&self, index: u8) -> Result<IpcStream> {
        self(index)
    }
}

/// Platform default discovery.
///
/// On Unix the socket is looked up in the runtime/temp directories (plus the
/// Flatpak and Snap sandboxes inside each). On Windows it is
/// `\\?\pipe\discord-ipc-N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDiscovery {
    dirs: Vec<PathBuf>,
}

#[cfg(unix)]
const ENV_DIRS: [&str; 4] = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"];

#[cfg(unix)]
const SANDBOX_SUBDIRS: [&str; 2] = ["app/com.discordapp.Discord", "snap.discord"];

impl LocalDiscovery {
    /// Build the search list from the process environment.
    #[cfg(unix)]
    pub fn from_env() -> Self {
        let mut bases: Vec<PathBuf> = ENV_DIRS
            .iter()
            .filter_map(|key| std::env::var_os(key))
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .collect();
        bases.push(PathBuf::from("/tmp"));

        let mut dirs = Vec::with_capacity(bases.len() * (SANDBOX_SUBDIRS.len() + 1));
        for base in bases {
            let mut group = vec![base.clone()];
            group.extend(SANDBOX_SUBDIRS.iter().map(|sub| base.join(sub)));
            for dir in group {
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        }
        Self { dirs }
    }

    /// Build the search list from the process environment.
    #[cfg(windows)]
    pub fn from_env() -> Self {
        Self {
            dirs: vec![PathBuf::from(r"\\?\pipe\")],
        }
    }

    /// Look only in `dir`.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dirs: vec![dir.into()],
        }
    }

    /// Directories searched, in order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Every location candidate `index` may live at, in search order.
    pub fn candidates(&self, index: u8) -> Vec<PathBuf> {
        let name = channel_name(index);
        self.dirs.iter().map(|dir| dir.join(&name)).collect()
    }
}

impl Default for LocalDiscovery {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Discovery for LocalDiscovery {
    #[cfg(unix)]
    fn open(&self, index: u8) -> Result<IpcStream> {
        let mut last_err = None;
        for path in self.candidates(index) {
            if !crate::uds::UnixDomainSocket::exists(&path) {
                continue;
            }
            match crate::uds::UnixDomainSocket::connect(&path) {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    trace!(?path, error = %err, "candidate socket refused connection");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or(TransportError::NoCandidates { index }))
    }

    #[cfg(windows)]
    fn open(&self, index: u8) -> Result<IpcStream> {
        let mut last_err = None;
        for path in self.candidates(index) {
            match crate::pipe::NamedPipe::connect(&path) {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    trace!(?path, error = %err, "candidate pipe unavailable");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or(TransportError::NoCandidates { index }))
    }
}
