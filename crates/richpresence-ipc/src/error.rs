/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] richpresence_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] richpresence_frame::FrameError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// No candidate channel accepted the handshake.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// The application id cannot be sent to the peer.
    #[error("invalid client id: {0}")]
    InvalidClientId(String),

    /// Operation requires a connected client.
    #[error("not connected")]
    NotConnected,

    /// The peer sent a `Close` frame.
    #[error("peer closed the connection (code {code:?}): {message}")]
    PeerClosed { code: Option<i64>, message: String },

    /// The peer reported an error event.
    #[error("peer error: {0}")]
    PeerError(String),
}

#[derive(serde::Deserialize)]
struct ClosePayload {
    code: Option<i64>,
    message: Option<String>,
}

#[derive(serde::Deserialize)]
struct EventPayload {
    evt: Option<String>,
    data: Option<EventData>,
}

#[derive(serde::Deserialize)]
struct EventData {
    code: Option<i64>,
    message: Option<String>,
}

impl IpcError {
    /// Build [`IpcError::PeerClosed`] from a `Close` frame payload.
    ///
    /// The payload is usually `{"code":...,"message":...}`; anything else is
    /// kept verbatim as the message.
    pub fn from_close_payload(payload: &[u8]) -> Self {
        match serde_json::from_slice::<ClosePayload>(payload) {
            Ok(close) => IpcError::PeerClosed {
                code: close.code,
                message: close.message.unwrap_or_default(),
            },
            Err(_) => IpcError::PeerClosed {
                code: None,
                message: String::from_utf8_lossy(payload).into_owned(),
            },
        }
    }

    /// Inspect a `Message` payload for an `"evt":"ERROR"` marker.
    ///
    /// Returns `None` for empty, non-JSON, or non-error payloads.
    pub fn from_error_event(payload: &[u8]) -> Option<Self> {
        if payload.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        let event: EventPayload = serde_json::from_slice(payload).ok()?;
        if event.evt.as_deref() != Some("ERROR") {
            return None;
        }
        let detail = match event.data {
            Some(EventData {
                code,
                message: Some(message),
            }) => match code {
                Some(code) => format!("{message} (code {code})"),
                None => message,
            },
            _ => String::from_utf8_lossy(payload).into_owned(),
        };
        Some(IpcError::PeerError(detail))
    }

    /// Whether this error ends the current connection.
    pub fn is_connection_fatal(&self) -> bool {
        !matches!(self, IpcError::NotConnected | IpcError::InvalidClientId(_))
    }
}

pub type Result<T> = std::result::Result<T, IpcError>;
