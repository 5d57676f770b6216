//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use quizhall_lobby::LobbyConfig;

/// Settings for a [`QuizServer`](crate::QuizServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// How long a socket that has not joined a lobby may stay silent.
    pub handshake_timeout: Duration,

    /// Directory finished-lobby results are written to.
    pub results_dir: PathBuf,

    /// Settings applied to every lobby.
    pub lobby: LobbyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            handshake_timeout: Duration::from_secs(5),
            results_dir: PathBuf::from("logs"),
            lobby: LobbyConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.results_dir, PathBuf::from("logs"));
        assert_eq!(config.lobby.default_duration_secs, 600);
    }
}
