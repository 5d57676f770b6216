//! Lobby configuration and phase state machine.

use std::time::Duration;

use quizhall_protocol::LobbyStatus;
use quizhall_session::TokenConfig;

use crate::LobbyError;

// ---------------------------------------------------------------------------
// LobbyConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every lobby a registry creates.
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// Round length when the owner does not pick one.
    pub default_duration_secs: u64,

    /// Longest round an owner may ask for.
    pub max_duration_secs: u64,

    /// Largest inbound frame accepted from the lobby owner. Large enough
    /// to carry a custom problem set.
    pub owner_max_frame: usize,

    /// Largest inbound frame accepted from everyone else.
    pub player_max_frame: usize,

    /// How long a connection may stay silent (no frame, no pong) before
    /// it is torn down.
    pub pong_wait: Duration,

    /// How often the server probes each connection. Must be shorter
    /// than `pong_wait`.
    pub ping_interval: Duration,

    /// Capacity of each lobby's command channel.
    pub command_buffer: usize,

    /// One-time token settings for each lobby's token store.
    pub token: TokenConfig,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        let pong_wait = Duration::from_secs(10);
        Self {
            default_duration_secs: 600,
            max_duration_secs: 86_400,
            owner_max_frame: 131_072,
            player_max_frame: 512,
            pong_wait,
            ping_interval: pong_wait * 9 / 10,
            command_buffer: 64,
            token: TokenConfig::default(),
        }
    }
}

impl LobbyConfig {
    /// Frame ceiling for a connection, fixed once at join time.
    pub fn max_frame_for(&self, is_owner: bool) -> usize {
        if is_owner {
            self.owner_max_frame
        } else {
            self.player_max_frame
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a lobby.
///
/// Transitions are strictly ordered, with no skipping and no way back:
///
/// ```text
/// Waiting → InPlay → Finished
/// ```
///
/// - **Waiting**: logins and joins accepted, owner has not started.
/// - **InPlay**: the round clock is running; answers are scored.
/// - **Finished**: results are final; the lobby is about to be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    InPlay,
    Finished,
}

impl Phase {
    /// Returns the phase that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::InPlay),
            Self::InPlay => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    /// Moves to `target`, or reports the illegal edge.
    ///
    /// # Errors
    /// [`LobbyError::InvalidTransition`] if `target` is not the next phase.
    pub fn transition_to(&mut self, target: Self) -> Result<(), LobbyError> {
        if !self.can_transition_to(target) {
            return Err(LobbyError::InvalidTransition {
                from: *self,
                to: target,
            });
        }
        *self = target;
        Ok(())
    }

    /// Returns `true` if new members may still join.
    pub fn is_joinable(self) -> bool {
        !matches!(self, Self::Finished)
    }

    /// The status reported to clients probing this lobby.
    pub fn status(self) -> LobbyStatus {
        match self {
            Self::Waiting => LobbyStatus::Waiting,
            Self::InPlay => LobbyStatus::Playing,
            Self::Finished => LobbyStatus::Finished,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::InPlay => write!(f, "InPlay"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_next_follows_strict_order() {
        assert_eq!(Phase::Waiting.next(), Some(Phase::InPlay));
        assert_eq!(Phase::InPlay.next(), Some(Phase::Finished));
        assert_eq!(Phase::Finished.next(), None);
    }

    #[test]
    fn test_phase_can_transition_to() {
        assert!(Phase::Waiting.can_transition_to(Phase::InPlay));
        assert!(!Phase::Waiting.can_transition_to(Phase::Finished));
        assert!(!Phase::Finished.can_transition_to(Phase::Waiting));
        assert!(!Phase::InPlay.can_transition_to(Phase::InPlay));
    }

    #[test]
    fn test_phase_transition_to_rejects_skip_and_leaves_phase() {
        let mut phase = Phase::Waiting;
        let err = phase.transition_to(Phase::Finished).unwrap_err();
        assert!(matches!(
            err,
            LobbyError::InvalidTransition {
                from: Phase::Waiting,
                to: Phase::Finished
            }
        ));
        assert_eq!(phase, Phase::Waiting);
    }

    #[test]
    fn test_phase_transition_to_twice_fails_second_time() {
        let mut phase = Phase::Waiting;
        phase.transition_to(Phase::InPlay).unwrap();
        assert!(phase.transition_to(Phase::InPlay).is_err());
        assert_eq!(phase, Phase::InPlay);
    }

    #[test]
    fn test_phase_is_joinable() {
        assert!(Phase::Waiting.is_joinable());
        assert!(Phase::InPlay.is_joinable());
        assert!(!Phase::Finished.is_joinable());
    }

    #[test]
    fn test_phase_status_maps_to_wire_status() {
        assert_eq!(Phase::Waiting.status(), LobbyStatus::Waiting);
        assert_eq!(Phase::InPlay.status(), LobbyStatus::Playing);
        assert_eq!(Phase::Finished.status(), LobbyStatus::Finished);
    }

    #[test]
    fn test_lobby_config_default() {
        let config = LobbyConfig::default();
        assert_eq!(config.default_duration_secs, 600);
        assert_eq!(config.max_frame_for(true), 131_072);
        assert_eq!(config.max_frame_for(false), 512);
        assert_eq!(config.ping_interval, Duration::from_secs(9));
        assert!(config.ping_interval < config.pong_wait);
    }
}
