use std::io::{Read, Write};

use crate::error::Result;

/// A connected IPC stream (`Read + Write`).
///
/// This is the fundamental I/O type returned by discovery.
/// On Unix, this wraps a Unix domain socket stream.
/// On Windows, this wraps a named pipe client handle.
pub struct IpcStream {
    inner: IpcStreamInner,
}

enum IpcStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    #[cfg(windows)]
    Pipe(std::fs::File),
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.read(buf),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => file.read(buf),
        }
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.write(buf),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.flush(),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => file.flush(),
        }
    }
}

#[cfg(unix)]
impl From<std::os::unix::net::UnixStream> for IpcStream {
    fn from(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: IpcStreamInner::Unix(stream),
        }
    }
}

#[cfg(windows)]
impl From<std::fs::File> for IpcStream {
    fn from(file: std::fs::File) -> Self {
        Self {
            inner: IpcStreamInner::Pipe(file),
        }
    }
}

impl IpcStream {
    /// Set read timeout on the underlying stream.
    ///
    /// Named pipe handles opened as files have no per-read timeout; the call
    /// is accepted and ignored there.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(windows)]
            IpcStreamInner::Pipe(_) => {
                let _ = timeout;
                Ok(())
            }
        }
    }

    /// Try to clone this stream (creates a new descriptor/handle).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => Ok(Self::from(stream.try_clone()?)),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => Ok(Self::from(file.try_clone()?)),
        }
    }

    /// Number of bytes that can be read right now without blocking.
    ///
    /// Fails with [`std::io::ErrorKind::UnexpectedEof`] once the peer has
    /// hung up and nothing is left to read.
    #[cfg(unix)]
    pub fn bytes_available(&self) -> Result<usize> {
        use std::os::fd::AsRawFd;

        let fd = match &self.inner {
            IpcStreamInner::Unix(stream) => stream.as_raw_fd(),
        };

        let mut available: libc::c_int = 0;
        // SAFETY: `fd` is an open socket descriptor owned by this stream and
        // `available` is a valid writable c_int as FIONREAD requires.
        let rc = unsafe { libc::ioctl(fd, libc::FIONREAD, &mut available) };
        if rc < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        if available > 0 {
            return Ok(usize::try_from(available).unwrap_or(0));
        }

        // FIONREAD is 0 both for "nothing yet" and for end of stream.
        let mut probe = [0u8; 1];
        // SAFETY: `probe` is a valid 1-byte buffer; MSG_PEEK leaves the data
        // queued and MSG_DONTWAIT keeps the call from blocking.
        let peeked = unsafe {
            libc::recv(
                fd,
                probe.as_mut_ptr().cast(),
                probe.len(),
                libc::MSG_PEEK | libc::MSG_DONTWAIT,
            )
        };
        match peeked {
            0 => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "peer closed the channel",
            )
            .into()),
            n if n > 0 => Ok(usize::try_from(n).unwrap_or(0)),
            _ => {
                let err = std::io::Error::last_os_error();
                match err.kind() {
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted => Ok(0),
                    _ => Err(err.into()),
                }
            }
        }
    }

    /// Number of bytes that can be read right now without blocking.
    #[cfg(windows)]
    pub fn bytes_available(&self) -> Result<usize> {
        use std::os::windows::io::AsRawHandle;
        use windows_sys::Win32::System::Pipes::PeekNamedPipe;

        let handle = match &self.inner {
            IpcStreamInner::Pipe(file) => file.as_raw_handle(),
        };

        let mut available: u32 = 0;
        // SAFETY: `handle` is an open pipe handle owned by this stream; null
        // buffer pointers with size 0 are allowed and only the total count is read.
        let ok = unsafe {
            PeekNamedPipe(
                handle as _,
                std::ptr::null_mut(),
                0,
                std::ptr::null_mut(),
                &mut available,
                std::ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(available as usize)
    }

    /// Tear the stream down so that reads blocked on any clone of it fail.
    ///
    /// On Unix this shuts both directions of the socket. On Windows pending
    /// I/O on the handle is cancelled; this is best-effort for synchronous
    /// handles.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => match stream.shutdown(std::net::Shutdown::Both) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
                Err(err) => Err(err.into()),
            },
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => {
                use std::os::windows::io::AsRawHandle;
                use windows_sys::Win32::System::IO::CancelIoEx;

                // SAFETY: the handle is open for the lifetime of `file`; a null
                // OVERLAPPED pointer cancels every pending request on it.
                unsafe {
                    CancelIoEx(file.as_raw_handle() as _, std::ptr::null());
                }
                Ok(())
            }
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(_) => "unix-domain-socket",
            #[cfg(windows)]
            IpcStreamInner::Pipe(_) => "named-pipe",
        }
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcStream")
            .field("type", &self.transport_name())
            .finish()
    }
}
