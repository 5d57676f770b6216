//! Lobby lifecycle management for Quizhall.
//!
//! Each lobby runs as an isolated Tokio task (actor model) that owns its
//! membership, participant progress, phase, and round clock.
//!
//! # Key types
//!
//! - [`SessionRegistry`]: creates lobbies, resolves ids, routes events
//! - [`LobbyHandle`]: send commands to a running lobby actor
//! - [`Phase`]: lifecycle state machine
//! - [`ProblemSource`] / [`Catalog`]: the problem set and answer checking
//! - [`ResultSink`] / [`JsonFileSink`]: where final scores go

mod config;
mod error;
mod lobby;
mod problems;
mod registry;
mod results;

pub use config::{LobbyConfig, Phase};
pub use error::{LobbyError, StorageError};
pub use lobby::{
    AnswerOutcome, LobbyHandle, LobbyInfo, LoginGrant, MemberId, MemberSender,
    MemberTicket, ParticipantInfo, WeakLobbyHandle,
};
pub use problems::{Catalog, ProblemSource, points_for};
pub use registry::{MemberContext, SessionRegistry};
pub use results::{GameResult, JsonFileSink, ResultSink};
