//! Password hashing for lobby logins.
//!
//! Lobby passwords only live as long as the lobby, so the bar is "never
//! keep the plain text around", not long-term storage. [`Sha256Hasher`]
//! salts each password with 16 random bytes and stores
//! `"<salt-hex>$<digest-hex>"`. Swap in a slow KDF by implementing
//! [`CredentialHasher`].

use rand::Rng;
use sha2::{Digest, Sha256};

/// Turns a plain-text secret into a stored credential and checks
/// secrets against it.
///
/// # Example
///
/// ```rust
/// use quizhall_session::{CredentialHasher, Sha256Hasher};
///
/// let hasher = Sha256Hasher;
/// let stored = hasher.hash("hunter2");
/// assert!(hasher.verify("hunter2", &stored));
/// assert!(!hasher.verify("hunter3", &stored));
/// ```
pub trait CredentialHasher: Send + Sync + 'static {
    /// Produces a stored credential for `secret`.
    fn hash(&self, secret: &str) -> String;

    /// Returns `true` if `secret` matches `stored`.
    fn verify(&self, secret: &str, stored: &str) -> bool;
}

/// Salted SHA-256 [`CredentialHasher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Sha256Hasher {
    fn digest(salt: &str, secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl CredentialHasher for Sha256Hasher {
    fn hash(&self, secret: &str) -> String {
        let salt: [u8; 16] = rand::rng().random();
        let salt = hex::encode(salt);
        let digest = Self::digest(&salt, secret);
        format!("{salt}${digest}")
    }

    fn verify(&self, secret: &str, stored: &str) -> bool {
        match stored.split_once('$') {
            Some((salt, digest)) => Self::digest(salt, secret) == digest,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_never_contains_plain_text() {
        let stored = Sha256Hasher.hash("correct horse");
        assert!(!stored.contains("correct horse"));
    }

    #[test]
    fn test_hash_same_secret_differs_by_salt() {
        let a = Sha256Hasher.hash("pw");
        let b = Sha256Hasher.hash("pw");
        assert_ne!(a, b);
        assert!(Sha256Hasher.verify("pw", &a));
        assert!(Sha256Hasher.verify("pw", &b));
    }

    #[test]
    fn test_verify_wrong_secret_returns_false() {
        let stored = Sha256Hasher.hash("pw");
        assert!(!Sha256Hasher.verify("PW", &stored));
    }

    #[test]
    fn test_verify_garbage_stored_value_returns_false() {
        assert!(!Sha256Hasher.verify("pw", "no-separator"));
    }
}
