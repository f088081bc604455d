use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use richpresence_frame::{FrameError, FrameReader, FrameWriter, Opcode};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{IpcError, Result};

/// Handshake protocol version understood by the desktop client.
pub const HANDSHAKE_VERSION: u32 = 1;

const MAX_CLIENT_ID_LEN: usize = 64;

/// Client identification sent as the first frame of a connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Protocol version.
    pub v: u32,
    /// Application id the presence is shown for.
    pub client_id: String,
}

impl HandshakeRequest {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            v: HANDSHAKE_VERSION,
            client_id: client_id.into(),
        }
    }
}

/// Result of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResult {
    /// Opcode of the frame that accepted the handshake.
    pub accepted_with: Opcode,
    /// Username from the `READY` dispatch, when the peer sent one.
    pub user: Option<String>,
}

/// Configuration for handshake negotiation.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Upper bound on waiting for the handshake response, where the
    /// platform supports read timeouts. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(5)),
        }
    }
}

/// Perform the client handshake on an open channel.
///
/// Sends `{"v":1,"client_id":...}` and reads exactly one frame back. A
/// `Message` or `Ping` response accepts the handshake; anything else rejects
/// it.
pub fn handshake<R: Read, W: Write>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    client_id: &str,
) -> Result<HandshakeResult> {
    validate_client_id(client_id)?;

    let request = HandshakeRequest::new(client_id);
    let payload = serde_json::to_vec(&request)?;
    writer.send(Opcode::Handshake, &payload)?;

    let frame = match reader.read_frame() {
        Ok(frame) => frame,
        Err(FrameError::Io(err))
            if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
        {
            return Err(IpcError::HandshakeFailed(
                "timed out waiting for handshake response".to_string(),
            ));
        }
        Err(err) => return Err(IpcError::Frame(err)),
    };
    trace!(opcode = %frame.opcode, len = frame.payload.len(), "handshake response");

    match frame.opcode {
        Opcode::Message | Opcode::Ping => Ok(HandshakeResult {
            accepted_with: frame.opcode,
            user: ready_user(&frame.payload),
        }),
        Opcode::Close => Err(IpcError::from_close_payload(&frame.payload)),
        other => Err(IpcError::HandshakeFailed(format!(
            "unexpected {other} response to handshake"
        ))),
    }
}

/// Reject application ids the desktop client can never accept.
///
/// Ids are Discord snowflakes: non-empty ASCII digit strings.
pub fn validate_client_id(client_id: &str) -> Result<()> {
    if client_id.is_empty() || client_id.len() > MAX_CLIENT_ID_LEN {
        return Err(IpcError::InvalidClientId(format!(
            "invalid length: {}",
            client_id.len()
        )));
    }
    if !client_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IpcError::InvalidClientId(format!(
            "'{client_id}' is not a numeric id"
        )));
    }
    Ok(())
}

#[derive(Deserialize)]
struct ReadyDispatch {
    evt: Option<String>,
    data: Option<ReadyData>,
}

#[derive(Deserialize)]
struct ReadyData {
    user: Option<ReadyUser>,
}

#[derive(Deserialize)]
struct ReadyUser {
    username: Option<String>,
}

fn ready_user(payload: &[u8]) -> Option<String> {
    let dispatch: ReadyDispatch = serde_json::from_slice(payload).ok()?;
    if dispatch.evt.as_deref() != Some("READY") {
        return None;
    }
    dispatch.data?.user?.username
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;
    use richpresence_frame::encode_frame;

    use super::*;

    fn reader_with(opcode: Opcode, payload: &[u8]) -> FrameReader<Cursor<Vec<u8>>> {
        let mut wire = BytesMut::new();
        encode_frame(opcode, payload, &mut wire).unwrap();
        FrameReader::new(Cursor::new(wire.to_vec()))
    }

    #[test]
    fn sends_versioned_request() {
        let mut reader = reader_with(Opcode::Message, b"{}");
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        handshake(&mut reader, &mut writer, "1234567890").unwrap();

        let sent = writer.into_inner().into_inner();
        assert_eq!(&sent[..4], &[0, 0, 0, 0]);
        assert_eq!(&sent[8..], br#"{"v":1,"client_id":"1234567890"}"#);
    }

    #[test]
    fn accepts_ready_message_and_reads_user() {
        let ready = br#"{"cmd":"DISPATCH","evt":"READY","data":{"v":1,"user":{"id":"1","username":"steve"}}}"#;
        let mut reader = reader_with(Opcode::Message, ready);
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let result = handshake(&mut reader, &mut writer, "42").unwrap();
        assert_eq!(result.accepted_with, Opcode::Message);
        assert_eq!(result.user.as_deref(), Some("steve"));
    }

    #[test]
    fn accepts_ping_response() {
        let mut reader = reader_with(Opcode::Ping, b"");
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let result = handshake(&mut reader, &mut writer, "42").unwrap();
        assert_eq!(result.accepted_with, Opcode::Ping);
        assert!(result.user.is_none());
    }

    #[test]
    fn close_response_is_peer_closed() {
        let mut reader = reader_with(Opcode::Close, br#"{"code":4000,"message":"Invalid Client ID"}"#);
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let err = handshake(&mut reader, &mut writer, "42").unwrap_err();
        match err {
            IpcError::PeerClosed { code, message } => {
                assert_eq!(code, Some(4000));
                assert_eq!(message, "Invalid Client ID");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn pong_response_is_rejected() {
        let mut reader = reader_with(Opcode::Pong, b"");
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let err = handshake(&mut reader, &mut writer, "42").unwrap_err();
        assert!(matches!(err, IpcError::HandshakeFailed(_)));
    }

    #[test]
    fn eof_response_is_frame_error() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let err = handshake(&mut reader, &mut writer, "42").unwrap_err();
        assert!(matches!(err, IpcError::Frame(FrameError::EndOfStream)));
    }

    #[test]
    fn invalid_client_ids_never_hit_the_wire() {
        let mut reader = reader_with(Opcode::Message, b"{}");
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let too_long = "9".repeat(65);
        for id in ["", "abc", "12 34", too_long.as_str()] {
            let err = handshake(&mut reader, &mut writer, id).unwrap_err();
            assert!(matches!(err, IpcError::InvalidClientId(_)), "id {id:?}");
        }
        assert!(writer.get_ref().get_ref().is_empty());
    }
}
