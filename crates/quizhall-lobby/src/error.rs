//! Error types for the lobby layer.

use quizhall_protocol::{LobbyId, ProtocolError};

use crate::Phase;

/// Errors that can occur during lobby operations.
///
/// Most variants are reported back to the originating connection with
/// [`status_code`](Self::status_code); [`is_internal`](Self::is_internal)
/// marks the ones that are only logged.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The lobby does not exist (never created, or already removed).
    #[error("lobby {0} not found")]
    NotFound(LobbyId),

    /// The lobby finished and no longer accepts anyone.
    #[error("lobby {0} has finished")]
    Gone(LobbyId),

    /// Wrong owner, wrong password, or a bad/reused/expired token.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// `start` while a round is already running (or over).
    #[error("round already in progress")]
    RoundInProgress,

    /// A round action arrived while no round is running.
    #[error("round not in progress")]
    RoundNotInProgress,

    /// A round was requested with nothing to play.
    #[error("no problems available for this round")]
    NoProblems,

    /// The event payload could not be decoded.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// No handler is registered for the event kind.
    #[error("unsupported event kind: {0}")]
    Unsupported(String),

    /// An internal phase edge was attempted out of order.
    #[error("invalid phase transition {from} -> {to}")]
    InvalidTransition { from: Phase, to: Phase },

    /// The lobby actor stopped or its command channel is closed.
    #[error("lobby {0} is unavailable")]
    Unavailable(LobbyId),
}

impl LobbyError {
    /// HTTP-style status code reported to the client.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Malformed(_) | Self::NoProblems => 400,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Unsupported(_) => 405,
            Self::RoundInProgress | Self::RoundNotInProgress => 409,
            Self::Gone(_) => 410,
            Self::InvalidTransition { .. } | Self::Unavailable(_) => 500,
        }
    }

    /// Internal contract breaches, logged but never shown to clients.
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<ProtocolError> for LobbyError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnsupportedEvent(kind) => Self::Unsupported(kind),
            other => Self::Malformed(other.to_string()),
        }
    }
}

/// Errors reading the problem catalog or writing results.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the file failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents are not the expected JSON shape.
    #[error("storage format invalid: {0}")]
    Json(#[from] serde_json::Error),

    /// The lobby id cannot be used as a file name.
    #[error("lobby id {0:?} is not a valid result key")]
    InvalidKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_covers_client_conditions() {
        assert_eq!(LobbyError::NotFound("x".into()).status_code(), 404);
        assert_eq!(LobbyError::Gone("x".into()).status_code(), 410);
        assert_eq!(LobbyError::Unauthorized("no".into()).status_code(), 401);
        assert_eq!(LobbyError::RoundInProgress.status_code(), 409);
        assert_eq!(LobbyError::RoundNotInProgress.status_code(), 409);
        assert_eq!(LobbyError::Unsupported("x".into()).status_code(), 405);
        assert_eq!(LobbyError::Malformed("x".into()).status_code(), 400);
    }

    #[test]
    fn test_invalid_transition_is_internal() {
        let err = LobbyError::InvalidTransition {
            from: Phase::Waiting,
            to: Phase::Finished,
        };
        assert!(err.is_internal());
        assert!(!LobbyError::RoundInProgress.is_internal());
    }

    #[test]
    fn test_from_protocol_unsupported_maps_to_unsupported() {
        let err: LobbyError =
            ProtocolError::UnsupportedEvent("fly".into()).into();
        assert!(matches!(err, LobbyError::Unsupported(ref k) if k == "fly"));
    }

    #[test]
    fn test_from_protocol_invalid_maps_to_malformed() {
        let err: LobbyError =
            ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, LobbyError::Malformed(_)));
    }
}
