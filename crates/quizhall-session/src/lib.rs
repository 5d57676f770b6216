//! Lobby entry credentials for Quizhall.
//!
//! Getting into a lobby is a two-step exchange:
//!
//! 1. **Login**: a name and password are checked with a
//!    [`CredentialHasher`]; success yields a one-time [`Token`].
//! 2. **Join**: the token is redeemed once against the lobby's
//!    [`TokenStore`] and the socket is bound to the login name.
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby Layer (above)  ← owns one TokenStore per lobby
//!     ↕
//! Session Layer (this crate)  ← tokens and credential hashes
//!     ↕
//! Protocol Layer (below)  ← provides PlayerName
//! ```

mod credential;
mod error;
mod token;

pub use credential::{CredentialHasher, Sha256Hasher};
pub use error::SessionError;
pub use token::{Token, TokenConfig, TokenStore};
