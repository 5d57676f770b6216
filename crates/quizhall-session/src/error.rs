//! Error types for the session layer.

/// Why a one-time token was refused.
///
/// Refusal is an expected outcome (typos, replays, slow clients), so
/// callers usually collapse all of these into a single "unauthorized"
/// reply and keep the variant only for logging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The key was never issued by this store, or has been swept.
    #[error("unknown token")]
    UnknownToken,

    /// The key was already redeemed once.
    #[error("token already used")]
    TokenUsed,

    /// The retention window elapsed before the key was redeemed.
    #[error("token expired")]
    TokenExpired,
}
