//! Identifiers and payload types shared by every layer.
//!
//! These are the values that travel inside events: who a player is,
//! which lobby they are in, and what a problem looks like.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for a lobby.
///
/// Freshly generated lobbies get a random UUID v4, but any string a client
/// sends back is accepted as a lookup key, so the type wraps a `String`
/// rather than a `Uuid`. `#[serde(transparent)]` keeps it a plain string
/// on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyId(String);

impl LobbyId {
    /// Generates a fresh, globally unique lobby id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LobbyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for LobbyId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The name a participant logged in with. Unique within a lobby and
/// immutable once a connection has been bound to it.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerName(String);

impl PlayerName {
    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PlayerName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Problems
// ---------------------------------------------------------------------------

/// One quiz problem.
///
/// `answer` is read from catalogs and custom problem sets but never
/// written back out, so clients cannot peek at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub title: String,
    pub description: String,
    /// The expression to render; also the basis for scoring.
    pub latex: String,
    #[serde(default, skip_serializing)]
    pub answer: Option<String>,
}

// ---------------------------------------------------------------------------
// Lobby status
// ---------------------------------------------------------------------------

/// Coarse lobby status as reported to clients probing a lobby id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LobbyStatus {
    /// Accepting logins; the round has not started.
    Waiting,
    /// A round is running.
    Playing,
    /// The round ended and results were recorded.
    Finished,
    /// No such lobby, live or recorded.
    Dne,
}

/// One row of a score table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: PlayerName,
    pub score: u32,
}
