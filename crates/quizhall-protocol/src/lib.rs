//! Wire protocol for Quizhall.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`LobbyId`], [`PlayerName`], [`Problem`], [`LobbyStatus`])
//! - **Events** ([`ClientEvent`], [`ServerEvent`], [`EventKind`])
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): events to/from bytes
//! - **Errors** ([`ProtocolError`])
//!
//! The protocol layer sits between transport (raw frames) and the lobby
//! core. It knows nothing about connections or lobby state.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEvent) → Lobby (state machine)
//! ```

mod codec;
mod error;
mod event;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::{ClientEvent, EventKind, ServerEvent, StartOptions};
pub use types::{LobbyId, LobbyStatus, PlayerName, Problem, ScoreEntry};
