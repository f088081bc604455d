use richpresence_frame::{Frame, FrameReader, FrameWriter, Opcode};
use richpresence_transport::{Discovery, IpcStream, LocalDiscovery, CANDIDATE_COUNT};
use tracing::{debug, info, trace};

use crate::activity::{Activity, SetActivity};
use crate::error::{IpcError, Result};
use crate::handshake::{handshake, validate_client_id, HandshakeConfig, HandshakeResult};

/// Observable connection state.
///
/// Handshaking only exists inside [`IpcClient::connect`] and is never visible
/// from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected, or the last connect attempt failed.
    Disconnected,
    /// Handshake accepted; frames can flow.
    Connected,
    /// The connection ended (local close, peer close, I/O or protocol error).
    Closed,
}

struct Connection {
    reader: FrameReader<IpcStream>,
    writer: FrameWriter<IpcStream>,
    index: u8,
    user: Option<String>,
}

/// Closes the client's stream from another thread.
///
/// A read blocked on the client fails once [`ShutdownHandle::shutdown`] runs.
pub struct ShutdownHandle {
    stream: IpcStream,
}

impl ShutdownHandle {
    pub fn shutdown(&self) -> Result<()> {
        self.stream.shutdown()?;
        Ok(())
    }
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle").finish_non_exhaustive()
    }
}

/// Client side of the desktop IPC protocol.
///
/// Owns at most one connection. All frame I/O goes through `&mut self`, so a
/// single owner serializes reads and writes and frame boundaries stay intact.
pub struct IpcClient<D: Discovery = LocalDiscovery> {
    discovery: D,
    handshake_config: HandshakeConfig,
    conn: Option<Connection>,
    state: ConnectionState,
}

impl Default for IpcClient<LocalDiscovery> {
    fn default() -> Self {
        Self::new(LocalDiscovery::default())
    }
}

impl<D: Discovery> IpcClient<D> {
    pub fn new(discovery: D) -> Self {
        Self {
            discovery,
            handshake_config: HandshakeConfig::default(),
            conn: None,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn with_handshake_config(mut self, config: HandshakeConfig) -> Self {
        self.handshake_config = config;
        self
    }

    /// Probe candidates `0..10` and connect to the first one that accepts
    /// the handshake.
    ///
    /// Returns `false` when none does; the peer not running is an expected
    /// outcome and is only logged.
    pub fn connect(&mut self, client_id: &str) -> bool {
        match self.try_connect(client_id) {
            Ok(_) => true,
            Err(err) => {
                debug!(error = %err, "connect failed");
                false
            }
        }
    }

    /// Like [`IpcClient::connect`], reporting why no candidate was usable.
    ///
    /// Any existing connection is dropped first. On failure the client is
    /// left `Disconnected` with no handle open.
    pub fn try_connect(&mut self, client_id: &str) -> Result<HandshakeResult> {
        validate_client_id(client_id)?;
        self.conn = None;
        self.state = ConnectionState::Disconnected;

        let mut last_err = None;
        for index in 0..CANDIDATE_COUNT {
            match self.open_candidate(index, client_id) {
                Ok((conn, result)) => {
                    info!(
                        index,
                        user = result.user.as_deref().unwrap_or(""),
                        "connected to desktop client"
                    );
                    self.conn = Some(conn);
                    self.state = ConnectionState::Connected;
                    return Ok(result);
                }
                Err(err) => {
                    debug!(index, error = %err, "candidate rejected");
                    last_err = Some(err);
                }
            }
        }

        Err(IpcError::HandshakeFailed(match last_err {
            Some(err) => format!("no candidate accepted the handshake (last: {err})"),
            None => "no candidate accepted the handshake".to_string(),
        }))
    }

    fn open_candidate(&self, index: u8, client_id: &str) -> Result<(Connection, HandshakeResult)> {
        let stream = self.discovery.open(index)?;
        stream.set_read_timeout(self.handshake_config.timeout)?;

        let mut reader = FrameReader::new(stream.try_clone()?);
        let mut writer = FrameWriter::new(stream);
        let result = handshake(&mut reader, &mut writer, client_id)?;

        // Steady-state reads block until data or close.
        reader.get_ref().set_read_timeout(None)?;

        let conn = Connection {
            reader,
            writer,
            index,
            user: result.user.clone(),
        };
        Ok((conn, result))
    }

    /// Send a text payload (UTF-8) under `opcode`.
    pub fn send(&mut self, opcode: Opcode, payload: &str) -> Result<()> {
        self.send_raw(opcode, payload.as_bytes())
    }

    /// Send raw payload bytes under `opcode`.
    ///
    /// A write failure closes the connection.
    pub fn send_raw(&mut self, opcode: Opcode, payload: &[u8]) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(IpcError::NotConnected)?;
        let sent = conn.writer.send(opcode, payload);
        match sent {
            Ok(()) => {
                trace!(%opcode, len = payload.len(), "frame sent");
                Ok(())
            }
            Err(err) => {
                self.mark_closed();
                Err(err.into())
            }
        }
    }

    /// Block until one complete frame arrives.
    ///
    /// Any error (end of stream, corruption, I/O) closes the connection.
    pub fn receive(&mut self) -> Result<Frame> {
        let conn = self.conn.as_mut().ok_or(IpcError::NotConnected)?;
        let received = conn.reader.read_frame();
        match received {
            Ok(frame) => {
                trace!(opcode = %frame.opcode, len = frame.payload.len(), "frame received");
                Ok(frame)
            }
            Err(err) => {
                self.mark_closed();
                Err(err.into())
            }
        }
    }

    /// Whether a full frame header is already available, without blocking.
    pub fn has_pending_data(&mut self) -> Result<bool> {
        let conn = self.conn.as_ref().ok_or(IpcError::NotConnected)?;
        let pending = conn.reader.has_pending_header();
        pending.map_err(|err| {
            self.mark_closed();
            err.into()
        })
    }

    /// Send `activity` as a `SET_ACTIVITY` command for this process.
    pub fn set_activity(&mut self, activity: &Activity) -> Result<()> {
        let payload = SetActivity::for_current_process(activity).to_json()?;
        self.send(Opcode::Message, &payload)
    }

    /// Send an all-empty activity, which removes the presence.
    pub fn clear_activity(&mut self) -> Result<()> {
        self.set_activity(&Activity::cleared())
    }

    /// Handle for tearing the stream down from another thread.
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        let conn = self.conn.as_ref().ok_or(IpcError::NotConnected)?;
        Ok(ShutdownHandle {
            stream: conn.writer.get_ref().try_clone()?,
        })
    }

    /// Release the connection. Safe from any state, any number of times.
    pub fn close(&mut self) {
        if self.conn.is_some() {
            debug!("closing connection");
        }
        self.mark_closed();
    }

    fn mark_closed(&mut self) {
        if let Some(conn) = self.conn.take() {
            // Unblocks readers holding a clone of this stream.
            let _ = conn.writer.get_ref().shutdown();
            self.state = ConnectionState::Closed;
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Candidate index of the live connection.
    pub fn pipe_index(&self) -> Option<u8> {
        self.conn.as_ref().map(|conn| conn.index)
    }

    /// Username reported by the peer's `READY` dispatch.
    pub fn user(&self) -> Option<&str> {
        self.conn.as_ref().and_then(|conn| conn.user.as_deref())
    }
}

impl<D: Discovery> std::fmt::Debug for IpcClient<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcClient")
            .field("state", &self.state)
            .field("pipe_index", &self.pipe_index())
            .finish_non_exhaustive()
    }
}
