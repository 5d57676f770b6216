//! Unified error type for the Quizhall server.

use quizhall_lobby::{LobbyError, StorageError};
use quizhall_protocol::ProtocolError;
use quizhall_session::SessionError;
use quizhall_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum QuizhallError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unknown event).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A token error (unknown, used, expired).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A lobby-level error (not found, unauthorized, wrong phase).
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// Loading the catalog or writing results failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let quizhall_err: QuizhallError = err.into();
        assert!(matches!(quizhall_err, QuizhallError::Transport(_)));
        assert!(quizhall_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let quizhall_err: QuizhallError = err.into();
        assert!(matches!(quizhall_err, QuizhallError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let quizhall_err: QuizhallError = SessionError::TokenUsed.into();
        assert!(matches!(quizhall_err, QuizhallError::Session(_)));
    }

    #[test]
    fn test_from_lobby_error() {
        let err = LobbyError::NotFound("abc".into());
        let quizhall_err: QuizhallError = err.into();
        assert!(matches!(quizhall_err, QuizhallError::Lobby(_)));
        assert!(quizhall_err.to_string().contains("abc"));
    }

    #[test]
    fn test_from_storage_error() {
        let err = StorageError::InvalidKey("../x".into());
        let quizhall_err: QuizhallError = err.into();
        assert!(matches!(quizhall_err, QuizhallError::Storage(_)));
    }
}
