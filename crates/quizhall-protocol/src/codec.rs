//! Codec trait and implementations for serializing/deserializing events.
//!
//! The lobby core never looks at bytes. It works with
//! [`ClientEvent`](crate::ClientEvent) and
//! [`ServerEvent`](crate::ServerEvent), and whatever implements
//! [`Codec`] decides what those look like on the wire. [`JsonCodec`] is
//! the one shipped today; a compact binary codec can be dropped in later
//! without touching the lobby or connection code.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a single codec instance is shared by
/// every connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Human-readable, so lobby traffic can be inspected straight from the
/// browser's network panel.
///
/// ## Example
///
/// ```rust
/// use quizhall_protocol::{ClientEvent, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let event = ClientEvent::GiveAnswer { answer: "42".into() };
///
/// let bytes = codec.encode(&event).unwrap();
/// let decoded: ClientEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(event, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
