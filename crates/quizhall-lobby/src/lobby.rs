//! Lobby actor: an isolated Tokio task that owns one quiz session.
//!
//! All lobby state (membership, participant progress, phase, the round
//! clock) lives inside a single task and is only touched while that task
//! handles a command, so every read-modify-write is atomic with respect
//! to every other. Handlers never block: outbound events go onto each
//! member's unbounded queue and are written by that member's own
//! connection task.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use quizhall_protocol::{
    LobbyId, PlayerName, Problem, ScoreEntry, ServerEvent, StartOptions,
};
use quizhall_session::{CredentialHasher, TokenStore};
use rand::seq::SliceRandom;
use tokio::sync::{RwLock, mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    GameResult, LobbyConfig, LobbyError, Phase, ProblemSource, ResultSink,
};

/// Channel for delivering outbound events to one member's connection.
pub type MemberSender = mpsc::UnboundedSender<ServerEvent>;

/// The registry's lobby map, as seen by a lobby removing itself.
pub(crate) type Directory = RwLock<HashMap<LobbyId, LobbyHandle>>;

/// Identifies one connection's membership within a lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberId(u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m-{}", self.0)
    }
}

/// What a successful login hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    /// One-time token to present on join.
    pub token: String,
    pub is_owner: bool,
}

/// What a successful join hands back to the connection.
#[derive(Debug, Clone)]
pub struct MemberTicket {
    pub id: MemberId,
    pub is_owner: bool,
    /// Cancelled by the lobby when this member is removed or the lobby
    /// closes; the connection's read loop watches it.
    pub closer: CancellationToken,
}

/// Result of an answer or skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Incorrect; progress unchanged, the participant may retry.
    Wrong,
    /// Progress advanced and the next problem was delivered.
    Advanced,
    /// The participant ran out of problems and the round ended.
    RoundOver,
}

/// Per-participant progress, as reported by [`LobbyInfo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub name: PlayerName,
    pub problem_index: usize,
    pub score: u32,
}

/// A snapshot of lobby metadata.
#[derive(Debug, Clone)]
pub struct LobbyInfo {
    pub id: LobbyId,
    pub name: String,
    pub phase: Phase,
    pub owner: Option<PlayerName>,
    /// Number of live connections.
    pub member_count: usize,
    /// Round length, once started.
    pub duration_secs: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    /// Everyone who ever logged in, sorted by name.
    pub participants: Vec<ParticipantInfo>,
}

impl LobbyInfo {
    /// Progress for one participant, if they have logged in.
    pub fn participant(&self, name: &PlayerName) -> Option<&ParticipantInfo> {
        self.participants.iter().find(|p| &p.name == name)
    }
}

/// Collaborators every lobby shares with its registry.
#[derive(Clone)]
pub(crate) struct Collaborators {
    pub(crate) source: Arc<dyn ProblemSource>,
    pub(crate) sink: Arc<dyn ResultSink>,
    pub(crate) hasher: Arc<dyn CredentialHasher>,
}

/// Commands sent to a lobby actor through its channel.
pub(crate) enum LobbyCommand {
    Authenticate {
        name: PlayerName,
        password: String,
        reply: oneshot::Sender<Result<LoginGrant, LobbyError>>,
    },
    AddMember {
        name: PlayerName,
        sender: MemberSender,
        reply: oneshot::Sender<Result<MemberTicket, LobbyError>>,
    },
    RemoveMember {
        member: MemberId,
    },
    Start {
        caller: PlayerName,
        options: StartOptions,
        reply: oneshot::Sender<Result<(), LobbyError>>,
    },
    SubmitAnswer {
        name: PlayerName,
        answer: String,
        reply: oneshot::Sender<Result<AnswerOutcome, LobbyError>>,
    },
    RequestProblem {
        name: PlayerName,
        reply: oneshot::Sender<Result<AnswerOutcome, LobbyError>>,
    },
    End {
        message: String,
        reply: oneshot::Sender<Result<(), LobbyError>>,
    },
    Info {
        reply: oneshot::Sender<LobbyInfo>,
    },
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Handle to a running lobby actor.
///
/// Cheap to clone. The registry holds one per lobby; connections hold a
/// [`WeakLobbyHandle`] so they never keep a finished lobby alive.
#[derive(Clone)]
pub struct LobbyHandle {
    id: LobbyId,
    sender: mpsc::Sender<LobbyCommand>,
    phase: watch::Receiver<Phase>,
    tokens: TokenStore,
}

impl LobbyHandle {
    /// Returns the lobby's id.
    pub fn id(&self) -> &LobbyId {
        &self.id
    }

    /// Returns the lobby's current phase without a round trip.
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// The lobby's one-time token store.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Returns a handle that does not keep the actor's channel open.
    pub fn downgrade(&self) -> WeakLobbyHandle {
        WeakLobbyHandle {
            id: self.id.clone(),
            sender: self.sender.downgrade(),
            phase: self.phase.clone(),
            tokens: self.tokens.clone(),
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> LobbyCommand,
    ) -> Result<T, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| LobbyError::Unavailable(self.id.clone()))?;
        reply_rx
            .await
            .map_err(|_| LobbyError::Unavailable(self.id.clone()))
    }

    /// Checks (or, on first login, records) a name's password and issues
    /// a one-time token. The first name ever to log in becomes the owner.
    pub async fn authenticate(
        &self,
        name: PlayerName,
        password: String,
    ) -> Result<LoginGrant, LobbyError> {
        self.request(|reply| LobbyCommand::Authenticate {
            name,
            password,
            reply,
        })
        .await?
    }

    /// Adds a connection for `name` to the membership set.
    pub async fn add_member(
        &self,
        name: PlayerName,
        sender: MemberSender,
    ) -> Result<MemberTicket, LobbyError> {
        self.request(|reply| LobbyCommand::AddMember {
            name,
            sender,
            reply,
        })
        .await?
    }

    /// Removes a member and closes its connection. Removing a member that
    /// is already gone, or from a lobby that has stopped, is a no-op.
    pub async fn remove_member(&self, member: MemberId) {
        let _ = self
            .sender
            .send(LobbyCommand::RemoveMember { member })
            .await;
    }

    /// Starts the round. Only the owner may do this, and only once.
    pub async fn start(
        &self,
        caller: PlayerName,
        options: StartOptions,
    ) -> Result<(), LobbyError> {
        self.request(|reply| LobbyCommand::Start {
            caller,
            options,
            reply,
        })
        .await?
    }

    /// Submits `answer` for `name`'s current problem.
    pub async fn submit_answer(
        &self,
        name: PlayerName,
        answer: String,
    ) -> Result<AnswerOutcome, LobbyError> {
        self.request(|reply| LobbyCommand::SubmitAnswer {
            name,
            answer,
            reply,
        })
        .await?
    }

    /// Skips `name` ahead to the next problem.
    pub async fn request_problem(
        &self,
        name: PlayerName,
    ) -> Result<AnswerOutcome, LobbyError> {
        self.request(|reply| LobbyCommand::RequestProblem { name, reply })
            .await?
    }

    /// Ends the running round now.
    ///
    /// # Errors
    /// [`LobbyError::InvalidTransition`] if no round is running, or
    /// [`LobbyError::Unavailable`] if the lobby already shut down.
    pub async fn end(&self, message: impl Into<String>) -> Result<(), LobbyError> {
        let message = message.into();
        self.request(|reply| LobbyCommand::End { message, reply })
            .await?
    }

    /// Requests a metadata snapshot.
    pub async fn info(&self) -> Result<LobbyInfo, LobbyError> {
        self.request(|reply| LobbyCommand::Info { reply }).await
    }
}

/// A non-owning reference to a lobby.
#[derive(Debug, Clone)]
pub struct WeakLobbyHandle {
    id: LobbyId,
    sender: mpsc::WeakSender<LobbyCommand>,
    phase: watch::Receiver<Phase>,
    tokens: TokenStore,
}

impl WeakLobbyHandle {
    /// Returns the lobby's id.
    pub fn id(&self) -> &LobbyId {
        &self.id
    }

    /// Returns a strong handle if the lobby actor is still reachable.
    pub fn upgrade(&self) -> Option<LobbyHandle> {
        let sender = self.sender.upgrade()?;
        Some(LobbyHandle {
            id: self.id.clone(),
            sender,
            phase: self.phase.clone(),
            tokens: self.tokens.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct Member {
    name: PlayerName,
    sender: MemberSender,
    closer: CancellationToken,
}

#[derive(Debug, Clone)]
struct Participant {
    credential: String,
    problem_index: usize,
    score: u32,
}

enum Wake {
    Cancelled,
    Deadline,
    Command(Option<LobbyCommand>),
}

#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// The internal lobby state. Runs inside a Tokio task.
struct LobbyActor {
    id: LobbyId,
    name: String,
    config: LobbyConfig,
    phase: Phase,
    phase_tx: watch::Sender<Phase>,
    owner: Option<PlayerName>,
    duration_secs: Option<u64>,
    started_at: Option<DateTime<Utc>>,
    deadline: Option<Instant>,
    /// Problems for the current round and the order they are served in.
    round: Vec<Problem>,
    order: Vec<usize>,
    members: HashMap<MemberId, Member>,
    next_member: u64,
    participants: HashMap<PlayerName, Participant>,
    tokens: TokenStore,
    deps: Collaborators,
    directory: Weak<Directory>,
    cancel: CancellationToken,
    receiver: mpsc::Receiver<LobbyCommand>,
}

impl LobbyActor {
    /// Runs the actor loop until the round ends or the lobby is cancelled.
    async fn run(mut self) {
        tracing::info!(lobby_id = %self.id, name = %self.name, "lobby actor started");

        loop {
            let wake = tokio::select! {
                _ = self.cancel.cancelled() => Wake::Cancelled,
                _ = wait_until(self.deadline) => Wake::Deadline,
                cmd = self.receiver.recv() => Wake::Command(cmd),
            };

            match wake {
                Wake::Cancelled => {
                    tracing::info!(lobby_id = %self.id, "lobby cancelled");
                    self.close_all_members();
                    break;
                }
                Wake::Deadline => {
                    if let Err(e) = self.finish("Time is up!".to_string()).await {
                        tracing::warn!(lobby_id = %self.id, error = %e, "round deadline ignored");
                        self.deadline = None;
                        continue;
                    }
                    break;
                }
                Wake::Command(Some(cmd)) => {
                    if self.handle(cmd).await == Flow::Stop {
                        break;
                    }
                }
                Wake::Command(None) => break,
            }
        }

        // Stops the token sweeper and any member closers still armed.
        self.cancel.cancel();
        tracing::info!(lobby_id = %self.id, "lobby actor stopped");
    }

    async fn handle(&mut self, cmd: LobbyCommand) -> Flow {
        match cmd {
            LobbyCommand::Authenticate {
                name,
                password,
                reply,
            } => {
                let result = self.authenticate(name, &password).await;
                let _ = reply.send(result);
            }
            LobbyCommand::AddMember {
                name,
                sender,
                reply,
            } => {
                let _ = reply.send(self.add_member(name, sender));
            }
            LobbyCommand::RemoveMember { member } => {
                self.remove_member(member);
            }
            LobbyCommand::Start {
                caller,
                options,
                reply,
            } => {
                let _ = reply.send(self.start(&caller, options));
            }
            LobbyCommand::SubmitAnswer {
                name,
                answer,
                reply,
            } => {
                let result = self.submit_answer(&name, &answer);
                return self.after_progress(&name, result, reply).await;
            }
            LobbyCommand::RequestProblem { name, reply } => {
                let result = self.request_problem(&name);
                return self.after_progress(&name, result, reply).await;
            }
            LobbyCommand::End { message, reply } => {
                let result = self.finish(message).await;
                let finished = result.is_ok();
                if let Err(e) = &result {
                    tracing::warn!(lobby_id = %self.id, error = %e, "end rejected");
                }
                let _ = reply.send(result);
                if finished {
                    return Flow::Stop;
                }
            }
            LobbyCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
        }
        Flow::Continue
    }

    /// Ends the round if a participant just ran out of problems, then replies.
    async fn after_progress(
        &mut self,
        name: &PlayerName,
        result: Result<AnswerOutcome, LobbyError>,
        reply: oneshot::Sender<Result<AnswerOutcome, LobbyError>>,
    ) -> Flow {
        let round_over = matches!(result, Ok(AnswerOutcome::RoundOver));
        if round_over {
            let message = format!("{name} has completed every problem!");
            if let Err(e) = self.finish(message).await {
                tracing::warn!(lobby_id = %self.id, error = %e, "finish after exhaustion failed");
            }
        }
        let _ = reply.send(result);
        if round_over { Flow::Stop } else { Flow::Continue }
    }

    async fn authenticate(
        &mut self,
        name: PlayerName,
        password: &str,
    ) -> Result<LoginGrant, LobbyError> {
        match self.participants.get(&name) {
            Some(existing) => {
                if !self.deps.hasher.verify(password, &existing.credential) {
                    tracing::warn!(lobby_id = %self.id, %name, "login rejected");
                    return Err(LobbyError::Unauthorized(
                        "wrong password".into(),
                    ));
                }
            }
            None => {
                self.participants.insert(
                    name.clone(),
                    Participant {
                        credential: self.deps.hasher.hash(password),
                        problem_index: 0,
                        score: 0,
                    },
                );
                tracing::info!(lobby_id = %self.id, %name, "participant registered");
            }
        }

        if self.owner.is_none() {
            tracing::info!(lobby_id = %self.id, %name, "owner assigned");
            self.owner = Some(name.clone());
        }
        let is_owner = self.is_owner(&name);
        let token = self.tokens.issue(name).await;
        Ok(LoginGrant {
            token: token.key,
            is_owner,
        })
    }

    fn add_member(
        &mut self,
        name: PlayerName,
        sender: MemberSender,
    ) -> Result<MemberTicket, LobbyError> {
        let index = match self.participants.get(&name) {
            Some(participant) => participant.problem_index,
            None => {
                return Err(LobbyError::Unauthorized(format!(
                    "{name} has not logged in"
                )));
            }
        };

        let is_owner = self.is_owner(&name);
        let _ = sender.send(ServerEvent::Joined {
            name: name.clone(),
            is_owner,
        });

        match self.phase {
            Phase::Waiting => {
                self.broadcast(ServerEvent::NewMember { name: name.clone() });
                let mut names: BTreeSet<PlayerName> =
                    self.members.values().map(|m| m.name.clone()).collect();
                names.insert(name.clone());
                for existing in names {
                    let _ = sender.send(ServerEvent::NewMember { name: existing });
                }
            }
            Phase::InPlay => {
                if let (Some(start_timestamp), Some(duration)) =
                    (self.started_at, self.duration_secs)
                {
                    let _ = sender.send(ServerEvent::StartGame {
                        start_timestamp,
                        duration,
                    });
                }
                if let Some(event) = self.problem_event(index) {
                    let _ = sender.send(event);
                }
            }
            Phase::Finished => return Err(LobbyError::Gone(self.id.clone())),
        }

        let id = MemberId(self.next_member);
        self.next_member += 1;
        let closer = self.cancel.child_token();
        self.members.insert(
            id,
            Member {
                name: name.clone(),
                sender,
                closer: closer.clone(),
            },
        );
        tracing::info!(
            lobby_id = %self.id,
            %name,
            member = %id,
            members = self.members.len(),
            "member joined"
        );

        Ok(MemberTicket {
            id,
            is_owner,
            closer,
        })
    }

    fn remove_member(&mut self, id: MemberId) {
        let Some(member) = self.members.remove(&id) else {
            return;
        };
        member.closer.cancel();
        tracing::info!(
            lobby_id = %self.id,
            name = %member.name,
            member = %id,
            members = self.members.len(),
            "member left"
        );
        self.broadcast(ServerEvent::RemoveMember { name: member.name });
    }

    fn start(
        &mut self,
        caller: &PlayerName,
        options: StartOptions,
    ) -> Result<(), LobbyError> {
        if !self.is_owner(caller) {
            return Err(LobbyError::Unauthorized(
                "only the owner may start the round".into(),
            ));
        }
        if self.phase != Phase::Waiting {
            return Err(LobbyError::RoundInProgress);
        }

        let StartOptions {
            duration_seconds,
            random_order,
            custom_problems,
            exclusive_custom_problems,
        } = options;

        let round = if exclusive_custom_problems && !custom_problems.is_empty() {
            custom_problems
        } else {
            let mut all = custom_problems;
            all.extend_from_slice(self.deps.source.problems());
            all
        };
        if round.is_empty() {
            return Err(LobbyError::NoProblems);
        }

        let duration = duration_seconds.unwrap_or(self.config.default_duration_secs);
        let deadline = (duration <= self.config.max_duration_secs)
            .then(|| Instant::now().checked_add(Duration::from_secs(duration)))
            .flatten()
            .ok_or_else(|| {
                LobbyError::Malformed(format!(
                    "round duration of {duration}s exceeds the {}s limit",
                    self.config.max_duration_secs
                ))
            })?;

        let mut order: Vec<usize> = (0..round.len()).collect();
        if random_order {
            order.shuffle(&mut rand::rng());
        }

        self.phase.transition_to(Phase::InPlay)?;
        self.phase_tx.send_replace(self.phase);

        let started_at = Utc::now();
        self.duration_secs = Some(duration);
        self.started_at = Some(started_at);
        self.deadline = Some(deadline);
        self.round = round;
        self.order = order;

        tracing::info!(
            lobby_id = %self.id,
            duration,
            problems = self.round.len(),
            random_order,
            "round started"
        );

        self.broadcast(ServerEvent::StartGame {
            start_timestamp: started_at,
            duration,
        });
        for member in self.members.values() {
            let index = self
                .participants
                .get(&member.name)
                .map_or(0, |p| p.problem_index);
            if let Some(event) = self.problem_event(index) {
                let _ = member.sender.send(event);
            }
        }
        Ok(())
    }

    fn submit_answer(
        &mut self,
        name: &PlayerName,
        answer: &str,
    ) -> Result<AnswerOutcome, LobbyError> {
        let (current, slot) = self.current_slot(name)?;
        let problem = &self.round[slot];

        if !self.deps.source.check_answer(problem, answer) {
            tracing::debug!(lobby_id = %self.id, %name, "wrong answer");
            self.send_to(name, ServerEvent::WrongAnswer);
            return Ok(AnswerOutcome::Wrong);
        }

        let updated = Participant {
            credential: current.credential,
            problem_index: current.problem_index + 1,
            score: current.score + self.deps.source.points(problem),
        };
        let score = updated.score;
        let next = updated.problem_index;
        self.participants.insert(name.clone(), updated);

        self.broadcast(ServerEvent::NewScoreUpdate {
            name: name.clone(),
            score,
        });
        Ok(self.deliver_next(name, next))
    }

    fn request_problem(
        &mut self,
        name: &PlayerName,
    ) -> Result<AnswerOutcome, LobbyError> {
        let (current, _) = self.current_slot(name)?;
        let next = current.problem_index + 1;
        self.participants.insert(
            name.clone(),
            Participant {
                problem_index: next,
                ..current
            },
        );
        Ok(self.deliver_next(name, next))
    }

    /// The participant's record and the catalog slot of their current problem.
    fn current_slot(
        &self,
        name: &PlayerName,
    ) -> Result<(Participant, usize), LobbyError> {
        if self.phase != Phase::InPlay {
            return Err(LobbyError::RoundNotInProgress);
        }
        let current = self.participants.get(name).cloned().ok_or_else(|| {
            LobbyError::Unauthorized(format!("{name} has not logged in"))
        })?;
        let slot = *self
            .order
            .get(current.problem_index)
            .ok_or(LobbyError::RoundNotInProgress)?;
        Ok((current, slot))
    }

    fn deliver_next(&self, name: &PlayerName, next: usize) -> AnswerOutcome {
        match self.problem_event(next) {
            Some(event) => {
                self.send_to(name, event);
                AnswerOutcome::Advanced
            }
            None => AnswerOutcome::RoundOver,
        }
    }

    /// Ends the round: notify, disconnect, persist, deregister.
    async fn finish(&mut self, message: String) -> Result<(), LobbyError> {
        self.phase.transition_to(Phase::Finished)?;
        self.phase_tx.send_replace(self.phase);
        self.deadline = None;

        tracing::info!(lobby_id = %self.id, %message, "round ended");
        self.broadcast(ServerEvent::EndGame { message });
        self.close_all_members();

        let result = self.result();
        if let Err(e) = self.deps.sink.save(&self.id, &result).await {
            tracing::error!(lobby_id = %self.id, error = %e, "failed to save results");
        }

        if let Some(directory) = self.directory.upgrade() {
            directory.write().await.remove(&self.id);
            tracing::info!(lobby_id = %self.id, "lobby removed from registry");
        }
        Ok(())
    }

    fn close_all_members(&mut self) {
        for (_, member) in self.members.drain() {
            member.closer.cancel();
        }
    }

    fn problem_event(&self, index: usize) -> Option<ServerEvent> {
        let slot = *self.order.get(index)?;
        Some(ServerEvent::NewProblem {
            index,
            problem: self.round.get(slot)?.clone(),
        })
    }

    fn is_owner(&self, name: &PlayerName) -> bool {
        self.owner.as_ref() == Some(name)
    }

    /// Sends an event to every member.
    fn broadcast(&self, event: ServerEvent) {
        for member in self.members.values() {
            let _ = member.sender.send(event.clone());
        }
    }

    /// Sends an event to every connection logged in as `name`. Silently
    /// drops if the connection is already gone.
    fn send_to(&self, name: &PlayerName, event: ServerEvent) {
        for member in self.members.values().filter(|m| &m.name == name) {
            let _ = member.sender.send(event.clone());
        }
    }

    fn result(&self) -> GameResult {
        let mut players: Vec<ScoreEntry> = self
            .participants
            .iter()
            .map(|(name, p)| ScoreEntry {
                name: name.clone(),
                score: p.score,
            })
            .collect();
        players.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        GameResult {
            name: self.name.clone(),
            players,
            start_timestamp: self.started_at,
            game_duration: self.duration_secs.unwrap_or(self.config.default_duration_secs),
        }
    }

    fn info(&self) -> LobbyInfo {
        let mut participants: Vec<ParticipantInfo> = self
            .participants
            .iter()
            .map(|(name, p)| ParticipantInfo {
                name: name.clone(),
                problem_index: p.problem_index,
                score: p.score,
            })
            .collect();
        participants.sort_by(|a, b| a.name.cmp(&b.name));
        LobbyInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            phase: self.phase,
            owner: self.owner.clone(),
            member_count: self.members.len(),
            duration_secs: self.duration_secs,
            started_at: self.started_at,
            participants,
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Spawns a lobby actor and its token sweeper, returning a handle.
///
/// The lobby's lifetime is a child of `parent`: cancelling `parent`
/// stops the actor, its sweeper, and every member connection.
pub(crate) fn spawn_lobby(
    id: LobbyId,
    name: String,
    config: LobbyConfig,
    deps: Collaborators,
    directory: Weak<Directory>,
    parent: &CancellationToken,
) -> LobbyHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
    let (phase_tx, phase_rx) = watch::channel(Phase::Waiting);
    let cancel = parent.child_token();
    let tokens = TokenStore::new(config.token.clone());
    tokens.spawn_sweeper(cancel.child_token());

    let actor = LobbyActor {
        id: id.clone(),
        name,
        config,
        phase: Phase::Waiting,
        phase_tx,
        owner: None,
        duration_secs: None,
        started_at: None,
        deadline: None,
        round: Vec::new(),
        order: Vec::new(),
        members: HashMap::new(),
        next_member: 1,
        participants: HashMap::new(),
        tokens: tokens.clone(),
        deps,
        directory,
        cancel,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    LobbyHandle {
        id,
        sender: tx,
        phase: phase_rx,
        tokens,
    }
}
