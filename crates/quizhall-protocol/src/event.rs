//! Client and server events.
//!
//! Every message on the wire is adjacently tagged:
//!
//! ```text
//! { "type": "give_answer", "payload": { "answer": "42" } }
//! { "type": "request_problem" }
//! ```
//!
//! The `type` discriminant is read first (see [`ClientEvent::decode`]) so
//! that a kind the server does not know is reported as *unsupported*
//! rather than lumped in with malformed payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Codec, LobbyId, LobbyStatus, PlayerName, Problem, ProtocolError,
};

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// The closed set of event kinds a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CreateLobby,
    Login,
    LobbyStatus,
    Join,
    StartGameOwner,
    GiveAnswer,
    RequestProblem,
}

impl EventKind {
    /// Every client kind, in wire order.
    pub const ALL: [EventKind; 7] = [
        Self::CreateLobby,
        Self::Login,
        Self::LobbyStatus,
        Self::Join,
        Self::StartGameOwner,
        Self::GiveAnswer,
        Self::RequestProblem,
    ];

    /// The `type` tag used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateLobby => "create_lobby",
            Self::Login => "login",
            Self::LobbyStatus => "lobby_status",
            Self::Join => "join",
            Self::StartGameOwner => "start_game_owner",
            Self::GiveAnswer => "give_answer",
            Self::RequestProblem => "request_problem",
        }
    }

    /// Looks up a kind by its wire tag.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ClientEvent
// ---------------------------------------------------------------------------

/// Options the owner sends with `start_game_owner`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartOptions {
    /// Round length. `None` falls back to the lobby default.
    pub duration_seconds: Option<u64>,
    /// Shuffle the problem order for this round.
    pub random_order: bool,
    /// Problems supplied by the owner for this round only.
    pub custom_problems: Vec<Problem>,
    /// Use only `custom_problems` instead of putting them ahead of the
    /// catalog.
    pub exclusive_custom_problems: bool,
}

/// Client → Server events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientEvent {
    // -- Before joining --
    /// "Open a new lobby with this display name."
    CreateLobby { name: String },

    /// "Let me in under this name." The first login for a name sets its
    /// password; the first login into a lobby makes that name the owner.
    Login {
        lobby_id: LobbyId,
        username: PlayerName,
        password: String,
    },

    /// "Is this lobby waiting, playing, finished, or unknown?"
    LobbyStatus { lobby_id: LobbyId },

    /// "Bind this socket to the lobby using my one-time token."
    Join { lobby_id: LobbyId, token: String },

    // -- Inside a lobby --
    /// Owner only: start the round.
    StartGameOwner(StartOptions),

    /// Submit an answer to the current problem.
    GiveAnswer { answer: String },

    /// Skip to the next problem.
    RequestProblem,
}

/// Just enough of an envelope to read its discriminant.
#[derive(Deserialize)]
struct EventProbe {
    #[serde(rename = "type")]
    kind: String,
}

impl ClientEvent {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::CreateLobby { .. } => EventKind::CreateLobby,
            Self::Login { .. } => EventKind::Login,
            Self::LobbyStatus { .. } => EventKind::LobbyStatus,
            Self::Join { .. } => EventKind::Join,
            Self::StartGameOwner(_) => EventKind::StartGameOwner,
            Self::GiveAnswer { .. } => EventKind::GiveAnswer,
            Self::RequestProblem => EventKind::RequestProblem,
        }
    }

    /// Decodes a client event, separating unknown kinds from bad payloads.
    ///
    /// # Errors
    /// - [`ProtocolError::UnsupportedEvent`] if the `type` tag is not a
    ///   known client kind
    /// - [`ProtocolError::Decode`] if the envelope or payload is malformed
    pub fn decode<C: Codec>(
        codec: &C,
        data: &[u8],
    ) -> Result<Self, ProtocolError> {
        let probe: EventProbe = codec.decode(data)?;
        if EventKind::parse(&probe.kind).is_none() {
            return Err(ProtocolError::UnsupportedEvent(probe.kind));
        }
        codec.decode(data)
    }
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Server → Client events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    // -- Membership --
    NewMember { name: PlayerName },
    RemoveMember { name: PlayerName },

    // -- Round --
    /// The round is running. Sent to everyone on start and replayed to
    /// anyone joining mid-round.
    StartGame {
        start_timestamp: DateTime<Utc>,
        duration: u64,
    },
    /// The recipient's current problem and its position in the order.
    NewProblem { index: usize, problem: Problem },
    NewScoreUpdate { name: PlayerName, score: u32 },
    WrongAnswer,
    EndGame { message: String },

    // -- Control replies --
    LobbyCreated { lobby_id: LobbyId },
    LoginAccepted { token: String, is_owner: bool },
    LobbyStatus {
        lobby_id: LobbyId,
        status: LobbyStatus,
    },
    Joined { name: PlayerName, is_owner: bool },

    /// `code` follows HTTP conventions (400 malformed, 401 unauthorized,
    /// 404 not found, 405 unsupported, 409 conflict, 410 gone).
    Error { code: u16, message: String },
}

impl ServerEvent {
    /// Shorthand for [`ServerEvent::Error`].
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::JsonCodec;

    fn decode(json: &str) -> Result<ClientEvent, ProtocolError> {
        ClientEvent::decode(&JsonCodec, json.as_bytes())
    }

    // =====================================================================
    // EventKind
    // =====================================================================

    #[test]
    fn test_event_kind_parse_matches_as_str() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::parse("new_problem"), None);
    }

    #[test]
    fn test_event_kind_matches_serde_tag() {
        let event = ClientEvent::StartGameOwner(StartOptions::default());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind().as_str());
    }

    // =====================================================================
    // ClientEvent::decode
    // =====================================================================

    #[test]
    fn test_decode_give_answer() {
        let event =
            decode(r#"{"type":"give_answer","payload":{"answer":"7"}}"#)
                .unwrap();
        assert_eq!(event, ClientEvent::GiveAnswer { answer: "7".into() });
    }

    #[test]
    fn test_decode_request_problem_without_payload() {
        let event = decode(r#"{"type":"request_problem"}"#).unwrap();
        assert_eq!(event, ClientEvent::RequestProblem);
    }

    #[test]
    fn test_decode_start_options_fill_defaults() {
        let event = decode(
            r#"{"type":"start_game_owner","payload":{"random_order":true}}"#,
        )
        .unwrap();
        let ClientEvent::StartGameOwner(opts) = event else {
            panic!("expected start_game_owner");
        };
        assert!(opts.random_order);
        assert!(!opts.exclusive_custom_problems);
        assert!(opts.custom_problems.is_empty());
        assert_eq!(opts.duration_seconds, None);
    }

    #[test]
    fn test_decode_login_reads_all_fields() {
        let event = decode(
            r#"{"type":"login","payload":{"lobby_id":"L","username":"ada","password":"pw"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::Login {
                lobby_id: LobbyId::from("L"),
                username: PlayerName::from("ada"),
                password: "pw".into(),
            }
        );
    }

    #[test]
    fn test_decode_unknown_kind_is_unsupported() {
        let err = decode(r#"{"type":"fly_to_moon","payload":{}}"#).unwrap_err();
        assert!(
            matches!(err, ProtocolError::UnsupportedEvent(ref k) if k == "fly_to_moon")
        );
    }

    #[test]
    fn test_decode_server_kind_from_client_is_unsupported() {
        let err = decode(r#"{"type":"wrong_answer"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedEvent(_)));
    }

    #[test]
    fn test_decode_known_kind_bad_payload_is_decode_error() {
        let err =
            decode(r#"{"type":"give_answer","payload":{"nope":1}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_decode_missing_type_is_decode_error() {
        let err = decode(r#"{"payload":{}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    // =====================================================================
    // ServerEvent JSON shape
    // =====================================================================

    #[test]
    fn test_server_event_new_problem_json_format() {
        let event = ServerEvent::NewProblem {
            index: 2,
            problem: Problem {
                title: "Sum".into(),
                description: "add".into(),
                latex: "1+1".into(),
                answer: Some("2".into()),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "new_problem");
        assert_eq!(json["payload"]["index"], 2);
        assert_eq!(json["payload"]["problem"]["title"], "Sum");
        assert!(json["payload"]["problem"].get("answer").is_none());
    }

    #[test]
    fn test_server_event_start_game_timestamp_is_rfc3339() {
        let start = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = ServerEvent::StartGame {
            start_timestamp: start,
            duration: 300,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "start_game");
        assert_eq!(json["payload"]["start_timestamp"], "2024-05-01T12:00:00Z");
        assert_eq!(json["payload"]["duration"], 300);
    }

    #[test]
    fn test_server_event_error_helper() {
        let json =
            serde_json::to_value(ServerEvent::error(401, "unauthorized"))
                .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["payload"]["code"], 401);
        assert_eq!(json["payload"]["message"], "unauthorized");
    }

    #[test]
    fn test_server_event_lobby_status_json_format() {
        let event = ServerEvent::LobbyStatus {
            lobby_id: LobbyId::from("abc"),
            status: LobbyStatus::Finished,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "lobby_status");
        assert_eq!(json["payload"]["status"], "finished");
    }
}
