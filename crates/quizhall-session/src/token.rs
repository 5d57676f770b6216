//! One-time lobby tokens.
//!
//! A successful login is exchanged for a short-lived token, and the token
//! is exchanged exactly once for a lobby connection. The store keeps every
//! issued token until it is redeemed or its retention window runs out; a
//! background sweeper then drops it.
//!
//! # Atomicity
//!
//! [`TokenStore::redeem`] checks and marks a token under a single
//! exclusive lock, so two concurrent redemptions of the same key can
//! never both succeed.
//!
//! # Lifecycle
//!
//! ```text
//! issue() ──→ [live] ──redeem()──→ [used] ──sweep()──→ gone
//!               │
//!               └──(retention elapsed)──→ [expired] ──sweep()──→ gone
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use quizhall_protocol::PlayerName;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::SessionError;

/// Timing knobs for a [`TokenStore`].
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// How long an issued token stays redeemable.
    pub retention: Duration,
    /// How often the sweeper purges expired and used tokens.
    pub sweep_interval: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

/// A freshly issued token, as handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The secret the client presents when joining.
    pub key: String,
    /// When the token was issued.
    pub created_at: Instant,
}

#[derive(Debug)]
struct Entry {
    holder: PlayerName,
    created_at: Instant,
    used: bool,
}

impl Entry {
    fn is_expired(&self, retention: Duration, now: Instant) -> bool {
        self.created_at + retention <= now
    }
}

/// Issues and redeems single-use tokens for one lobby.
///
/// Cheap to clone: clones share the same underlying map.
#[derive(Debug, Clone)]
pub struct TokenStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    config: TokenConfig,
}

impl TokenStore {
    /// Creates an empty store.
    pub fn new(config: TokenConfig) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    /// Issues a new token bound to `holder`.
    pub async fn issue(&self, holder: PlayerName) -> Token {
        let mut entries = self.entries.lock().await;
        let key = loop {
            let candidate = generate_key();
            if !entries.contains_key(&candidate) {
                break candidate;
            }
        };
        let created_at = Instant::now();
        entries.insert(
            key.clone(),
            Entry {
                holder,
                created_at,
                used: false,
            },
        );
        Token { key, created_at }
    }

    /// Redeems `key`, returning the name it was issued to.
    ///
    /// Succeeds at most once per key, and only inside the retention window.
    ///
    /// # Errors
    /// - [`SessionError::UnknownToken`]: never issued, or already swept
    /// - [`SessionError::TokenUsed`]: redeemed before
    /// - [`SessionError::TokenExpired`]: retention window elapsed
    pub async fn redeem(&self, key: &str) -> Result<PlayerName, SessionError> {
        let mut entries = self.entries.lock().await;
        let entry = entries.get_mut(key).ok_or(SessionError::UnknownToken)?;
        if entry.used {
            return Err(SessionError::TokenUsed);
        }
        if entry.is_expired(self.config.retention, Instant::now()) {
            return Err(SessionError::TokenExpired);
        }
        entry.used = true;
        Ok(entry.holder.clone())
    }

    /// Returns `true` and consumes the token if `key` is live.
    pub async fn verify(&self, key: &str) -> bool {
        self.redeem(key).await.is_ok()
    }

    /// Removes every expired or used token. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let retention = self.config.retention;
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.used && !entry.is_expired(retention, now));
        before - entries.len()
    }

    /// Number of tokens currently held (live, used, or expired-but-unswept).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if the store holds no tokens.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Spawns the periodic sweeper. It stops when `cancel` fires.
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.config.sweep_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = store.sweep().await;
                        if removed > 0 {
                            tracing::debug!(removed, "swept stale tokens");
                        }
                    }
                }
            }
            tracing::debug!("token sweeper stopped");
        })
    }
}

/// Generates a random 32-character hex key (128 bits of entropy).
fn generate_key() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Time-dependent tests run with `start_paused = true`, so the clock
    //! only moves when the test sleeps or advances it.

    use super::*;

    fn store() -> TokenStore {
        TokenStore::new(TokenConfig::default())
    }

    fn name(n: &str) -> PlayerName {
        PlayerName::from(n)
    }

    // =====================================================================
    // issue()
    // =====================================================================

    #[tokio::test]
    async fn test_issue_returns_unique_hex_keys() {
        let store = store();
        let a = store.issue(name("ada")).await;
        let b = store.issue(name("ada")).await;
        assert_ne!(a.key, b.key);
        assert_eq!(a.key.len(), 32);
        assert!(a.key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(store.len().await, 2);
    }

    // =====================================================================
    // redeem() / verify()
    // =====================================================================

    #[tokio::test]
    async fn test_redeem_fresh_token_returns_holder() {
        let store = store();
        let token = store.issue(name("ada")).await;
        assert_eq!(store.redeem(&token.key).await, Ok(name("ada")));
    }

    #[tokio::test]
    async fn test_redeem_twice_second_is_used() {
        let store = store();
        let token = store.issue(name("ada")).await;
        assert!(store.verify(&token.key).await);
        assert_eq!(
            store.redeem(&token.key).await,
            Err(SessionError::TokenUsed)
        );
        assert!(!store.verify(&token.key).await);
    }

    #[tokio::test]
    async fn test_redeem_unknown_key_returns_unknown() {
        let store = store();
        assert_eq!(
            store.redeem("deadbeef").await,
            Err(SessionError::UnknownToken)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_redeem_just_before_retention_succeeds() {
        let store = store();
        let token = store.issue(name("ada")).await;
        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(store.verify(&token.key).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redeem_at_retention_boundary_is_expired() {
        let store = store();
        let token = store.issue(name("ada")).await;
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(
            store.redeem(&token.key).await,
            Err(SessionError::TokenExpired)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_redeem_expired_and_unused_never_succeeds_later() {
        let store = store();
        let token = store.issue(name("ada")).await;
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!store.verify(&token.key).await);
        assert!(!store.verify(&token.key).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_verify_concurrent_redemptions_succeed_once() {
        let store = store();
        let token = store.issue(name("ada")).await;

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            let key = token.key.clone();
            handles.push(tokio::spawn(async move { store.verify(&key).await }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    // =====================================================================
    // sweep()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_used_and_expired_keeps_live() {
        let store = store();
        let used = store.issue(name("a")).await;
        store.verify(&used.key).await;
        let _expired = store.issue(name("b")).await;
        tokio::time::advance(Duration::from_secs(3)).await;
        let live = store.issue(name("c")).await;
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(store.sweep().await, 2);
        assert_eq!(store.len().await, 1);
        assert!(store.verify(&live.key).await);
    }

    #[tokio::test]
    async fn test_sweep_empty_store_removes_nothing() {
        let store = store();
        assert_eq!(store.sweep().await, 0);
        assert!(store.is_empty().await);
    }

    // =====================================================================
    // spawn_sweeper()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_spawn_sweeper_purges_on_interval() {
        let store = store();
        let cancel = CancellationToken::new();
        let handle = store.spawn_sweeper(cancel.clone());

        let token = store.issue(name("ada")).await;
        store.verify(&token.key).await;
        assert_eq!(store.len().await, 1);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(store.is_empty().await);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_sweeper_stops_on_cancel() {
        let store = store();
        let cancel = CancellationToken::new();
        let handle = store.spawn_sweeper(cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should stop promptly")
            .unwrap();
    }
}
