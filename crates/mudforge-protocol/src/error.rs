//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A value passed deserialization but makes no sense to the game,
    /// e.g. a command record with an empty verb.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
