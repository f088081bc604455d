use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::IpcStream;

/// Unix domain socket transport (client side).
///
/// The desktop client owns the listening socket; this side only ever
/// connects to it.
pub struct UnixDomainSocket;

impl UnixDomainSocket {
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    pub const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    pub const MAX_PATH_LEN: usize = 104;

    /// Connect to a listening Unix domain socket (blocking).
    pub fn connect(path: impl AsRef<Path>) -> Result<IpcStream> {
        let path = path.as_ref();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::Connect {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("socket path too long ({path_bytes} bytes, max {})", Self::MAX_PATH_LEN),
                ),
            });
        }

        let stream =
            std::os::unix::net::UnixStream::connect(path).map_err(|e| TransportError::Connect {
                path: path.to_path_buf(),
                source: e,
            })?;
        debug!(?path, "connected to unix domain socket");
        Ok(IpcStream::from(stream))
    }

    /// Whether `path` currently names a socket file.
    pub fn exists(path: impl AsRef<Path>) -> bool {
        std::fs::symlink_metadata(path.as_ref())
            .map(|metadata| metadata.file_type().is_socket())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::unix::net::UnixListener;

    fn unique_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "rp-uds-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_connect_to_listener() {
        let dir = unique_dir("connect");
        let sock_path = dir.join("discord-ipc-0");
        let listener = UnixListener::bind(&sock_path).unwrap();
        assert!(UnixDomainSocket::exists(&sock_path));

        let path_clone = sock_path.clone();
        let handle = std::thread::spawn(move || {
            let mut client = UnixDomainSocket::connect(&path_clone).unwrap();
            client.write_all(b"hello").unwrap();
        });

        let (mut server, _) = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        handle.join().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_connect_missing_socket() {
        let dir = unique_dir("missing");
        let result = UnixDomainSocket::connect(dir.join("discord-ipc-9"));
        assert!(matches!(result, Err(TransportError::Connect { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let result = UnixDomainSocket::connect(&long_path);
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_regular_file_is_not_a_socket() {
        let dir = unique_dir("file");
        let path = dir.join("discord-ipc-0");
        std::fs::write(&path, b"regular-file").unwrap();
        assert!(!UnixDomainSocket::exists(&path));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
