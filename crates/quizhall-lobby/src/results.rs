//! Final score persistence.
//!
//! When a round ends the lobby hands its score table to a [`ResultSink`]
//! before it is removed from the registry. The sink is also what lets a
//! status probe tell "finished" apart from "never existed" once the lobby
//! itself is gone.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quizhall_protocol::{LobbyId, ScoreEntry};
use serde::{Deserialize, Serialize};

use crate::StorageError;

/// The record written for a finished lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    /// The lobby's display name.
    pub name: String,
    /// Every participant, highest score first.
    pub players: Vec<ScoreEntry>,
    pub start_timestamp: Option<DateTime<Utc>>,
    /// Configured round length in seconds.
    pub game_duration: u64,
}

/// Durable storage for finished lobbies.
#[async_trait]
pub trait ResultSink: Send + Sync + 'static {
    /// Persists `result` under `lobby_id`.
    async fn save(
        &self,
        lobby_id: &LobbyId,
        result: &GameResult,
    ) -> Result<(), StorageError>;

    /// Returns `true` if a result exists for `lobby_id`.
    async fn contains(&self, lobby_id: &LobbyId) -> bool;
}

/// Writes one `<lobby_id>.result.json` file per lobby into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    /// Creates a sink rooted at `dir`. The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory results are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the result file for `lobby_id`.
    ///
    /// Ids are client-supplied on status probes, so anything but ASCII
    /// alphanumerics and `-` is refused rather than joined into a path.
    pub fn result_path(&self, lobby_id: &LobbyId) -> Result<PathBuf, StorageError> {
        let key = lobby_id.as_str();
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.result.json")))
    }
}

#[async_trait]
impl ResultSink for JsonFileSink {
    async fn save(
        &self,
        lobby_id: &LobbyId,
        result: &GameResult,
    ) -> Result<(), StorageError> {
        let path = self.result_path(lobby_id)?;
        let bytes = serde_json::to_vec_pretty(result)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(%lobby_id, path = %path.display(), "results saved");
        Ok(())
    }

    async fn contains(&self, lobby_id: &LobbyId) -> bool {
        match self.result_path(lobby_id) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GameResult {
        GameResult {
            name: "friday quiz".into(),
            players: vec![
                ScoreEntry {
                    name: "ada".into(),
                    score: 4,
                },
                ScoreEntry {
                    name: "bob".into(),
                    score: 1,
                },
            ],
            start_timestamp: None,
            game_duration: 60,
        }
    }

    #[tokio::test]
    async fn test_save_writes_result_file_and_contains_sees_it() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("logs"));
        let id = LobbyId::from("abc-123");

        assert!(!sink.contains(&id).await);
        sink.save(&id, &sample()).await.unwrap();
        assert!(sink.contains(&id).await);

        let text = std::fs::read_to_string(
            dir.path().join("logs").join("abc-123.result.json"),
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["name"], "friday quiz");
        assert_eq!(json["players"][0]["name"], "ada");
        assert_eq!(json["players"][0]["score"], 4);
        assert_eq!(json["game_duration"], 60);
    }

    #[tokio::test]
    async fn test_save_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());
        let err = sink
            .save(&LobbyId::from("../escape"), &sample())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_contains_path_like_id_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());
        assert!(!sink.contains(&LobbyId::from("../../etc/passwd")).await);
    }
}
