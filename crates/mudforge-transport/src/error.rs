use mudforge_protocol::{ProtocolError, SessionId};

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No connection is attached for this session.
    #[error("no connection attached for session {0}")]
    UnknownSession(SessionId),

    /// The receiving side of the session's connection has gone away.
    #[error("connection closed for session {0}")]
    ConnectionClosed(SessionId),

    /// The frame could not be encoded.
    #[error(transparent)]
    Encode(#[from] ProtocolError),
}
