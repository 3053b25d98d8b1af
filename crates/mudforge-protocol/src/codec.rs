//! Codec trait and implementations for serializing outbound frames.
//!
//! The transport doesn't care HOW a frame is turned into bytes: it holds
//! something that implements [`Codec`] and calls it. [`JsonCodec`] is the
//! only implementation for now; it keeps frames readable in logs and in a
//! browser's network tab.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because the codec lives inside a transport
/// that is shared with the scheduler task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use mudforge_protocol::{Codec, JsonCodec, OutboundFrame};
///
/// let codec = JsonCodec;
/// let frame = OutboundFrame::Text { text: "Converse mode OFF.".into() };
///
/// let bytes = codec.encode(&frame).unwrap();
/// let decoded: OutboundFrame = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
