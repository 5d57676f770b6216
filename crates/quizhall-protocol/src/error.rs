//! Error types for the protocol layer.
//!
//! Each crate in Quizhall defines its own error enum. A `ProtocolError`
//! always means the problem is in turning bytes into events (or back),
//! never in networking or lobby state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields,
    /// wrong data types, or truncated messages.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The envelope names an event kind the server has no handler for.
    #[error("unsupported event kind: {0}")]
    UnsupportedEvent(String),

    /// The message is well-formed but violates the protocol, e.g. a
    /// lobby event sent before joining.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
