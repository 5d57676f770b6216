//! Session registry: creates lobbies, resolves ids, and routes events.

use std::collections::HashMap;
use std::sync::Arc;

use quizhall_protocol::{ClientEvent, LobbyId, LobbyStatus, PlayerName};
use quizhall_session::CredentialHasher;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::lobby::{Collaborators, Directory, spawn_lobby};
use crate::{
    AnswerOutcome, LobbyConfig, LobbyError, LobbyHandle, LoginGrant,
    MemberId, MemberSender, Phase, ProblemSource, ResultSink,
    WeakLobbyHandle,
};

/// Everything a connection needs to talk to its lobby after joining.
///
/// Holds only a weak reference: once the lobby finishes and leaves the
/// registry, dispatching through a stale context reports `NotFound`.
#[derive(Debug, Clone)]
pub struct MemberContext {
    pub lobby_id: LobbyId,
    pub name: PlayerName,
    pub is_owner: bool,
    pub member_id: MemberId,
    /// Cancelled when the lobby removes this member or shuts down.
    pub closer: CancellationToken,
    lobby: WeakLobbyHandle,
}

/// Tracks every live lobby and routes member events to them.
///
/// Cheap to clone; all clones share the same lobby map. Lookups take
/// the map lock only long enough to clone a handle, never across a
/// round trip to a lobby actor.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    lobbies: Arc<Directory>,
    deps: Collaborators,
    config: LobbyConfig,
    shutdown: CancellationToken,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new(
        config: LobbyConfig,
        source: Arc<dyn ProblemSource>,
        sink: Arc<dyn ResultSink>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                lobbies: Arc::new(RwLock::new(HashMap::new())),
                deps: Collaborators {
                    source,
                    sink,
                    hasher,
                },
                config,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// The root token every lobby's lifetime hangs off.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    /// Stops every lobby and disconnects every member.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let drained = {
            let mut lobbies = self.inner.lobbies.write().await;
            let count = lobbies.len();
            lobbies.clear();
            count
        };
        tracing::info!(lobbies = drained, "registry shut down");
    }

    /// Creates a new lobby and returns its id.
    pub async fn create_lobby(&self, name: impl Into<String>) -> LobbyId {
        let name = name.into();
        let id = LobbyId::generate();
        let handle = spawn_lobby(
            id.clone(),
            name.clone(),
            self.inner.config.clone(),
            self.inner.deps.clone(),
            Arc::downgrade(&self.inner.lobbies),
            &self.inner.shutdown,
        );
        self.inner.lobbies.write().await.insert(id.clone(), handle);
        tracing::info!(lobby_id = %id, %name, "lobby created");
        id
    }

    /// Returns a handle to a live lobby.
    pub async fn lobby(&self, id: &LobbyId) -> Option<LobbyHandle> {
        self.inner.lobbies.read().await.get(id).cloned()
    }

    /// Number of live lobbies.
    pub async fn lobby_count(&self) -> usize {
        self.inner.lobbies.read().await.len()
    }

    async fn require(&self, id: &LobbyId) -> Result<LobbyHandle, LobbyError> {
        self.lobby(id)
            .await
            .ok_or_else(|| LobbyError::NotFound(id.clone()))
    }

    /// Authenticates `username` in a lobby and issues a one-time token.
    ///
    /// A lobby that has already finished is reported as not found.
    pub async fn login(
        &self,
        id: &LobbyId,
        username: PlayerName,
        password: String,
    ) -> Result<LoginGrant, LobbyError> {
        let handle = self.require(id).await?;
        if handle.phase() == Phase::Finished {
            return Err(LobbyError::NotFound(id.clone()));
        }
        handle.authenticate(username, password).await
    }

    /// Reports a lobby's status, falling back to persisted results once
    /// the lobby itself is gone.
    pub async fn lobby_status(&self, id: &LobbyId) -> LobbyStatus {
        if let Some(handle) = self.lobby(id).await {
            return handle.phase().status();
        }
        if self.inner.deps.sink.contains(id).await {
            LobbyStatus::Finished
        } else {
            LobbyStatus::Dne
        }
    }

    /// Redeems a one-time token and adds the connection to the lobby.
    ///
    /// # Errors
    /// - [`LobbyError::NotFound`] if no such lobby is live.
    /// - [`LobbyError::Gone`] if the lobby has finished; this is checked
    ///   before the token is touched.
    /// - [`LobbyError::Unauthorized`] if the token is unknown, used, or
    ///   expired.
    pub async fn join(
        &self,
        id: &LobbyId,
        token: &str,
        sender: MemberSender,
    ) -> Result<MemberContext, LobbyError> {
        let handle = self.require(id).await?;
        if !handle.phase().is_joinable() {
            return Err(LobbyError::Gone(id.clone()));
        }

        let name = handle.tokens().redeem(token).await.map_err(|e| {
            tracing::warn!(lobby_id = %id, error = %e, "token rejected");
            LobbyError::Unauthorized(e.to_string())
        })?;

        let ticket = handle.add_member(name.clone(), sender).await?;
        Ok(MemberContext {
            lobby_id: id.clone(),
            name,
            is_owner: ticket.is_owner,
            member_id: ticket.id,
            closer: ticket.closer,
            lobby: handle.downgrade(),
        })
    }

    /// Routes a decoded event from a joined member to its handler.
    ///
    /// Pre-join control events have no handler here and are reported as
    /// [`LobbyError::Unsupported`].
    pub async fn dispatch(
        &self,
        member: &MemberContext,
        event: ClientEvent,
    ) -> Result<Option<AnswerOutcome>, LobbyError> {
        let handle = member
            .lobby
            .upgrade()
            .ok_or_else(|| LobbyError::NotFound(member.lobby_id.clone()))?;

        match event {
            ClientEvent::StartGameOwner(options) => {
                handle.start(member.name.clone(), options).await?;
                Ok(None)
            }
            ClientEvent::GiveAnswer { answer } => handle
                .submit_answer(member.name.clone(), answer)
                .await
                .map(Some),
            ClientEvent::RequestProblem => handle
                .request_problem(member.name.clone())
                .await
                .map(Some),
            other => Err(LobbyError::Unsupported(other.kind().to_string())),
        }
    }

    /// Removes a member from its lobby. A no-op if the lobby is gone.
    pub async fn leave(&self, member: &MemberContext) {
        if let Some(handle) = member.lobby.upgrade() {
            handle.remove_member(member.member_id).await;
        }
    }
}
