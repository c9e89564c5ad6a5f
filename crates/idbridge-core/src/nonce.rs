//! Single-use CSRF nonces binding an authorization request to its callback.
//!
//! A nonce is issued when a login starts, rides along as the OAuth `state`
//! parameter, and must be consumed exactly once when the provider redirects
//! back. Consumption is atomic get-and-remove: two concurrent callbacks can
//! never both observe the same nonce.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use dashmap::DashMap;
use time::{Duration, OffsetDateTime};

/// Default window between issuing a nonce and the provider callback.
pub const DEFAULT_NONCE_TTL: Duration = Duration::minutes(10);

/// Errors raised when a nonce cannot be consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NonceError {
    /// No nonce was issued for this session, or it was already consumed.
    #[error("No login nonce issued for this session")]
    NotFound,

    /// The nonce outlived its time-to-live before the callback arrived.
    #[error("Login nonce expired before the callback arrived")]
    Expired,
}

/// Issues and single-use-consumes CSRF nonces keyed by session context.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Issues a fresh nonce for `session`, replacing any previous one
    /// (a restarted login supersedes the old attempt).
    async fn issue(&self, session: &str) -> Result<String, NonceError>;

    /// Atomically removes and returns the nonce stored for `session`.
    ///
    /// A second consume for the same session fails with [`NonceError::NotFound`];
    /// it never returns the same value twice.
    async fn consume(&self, session: &str) -> Result<String, NonceError>;
}

/// Generates a random url-safe nonce value (32 bytes of entropy).
#[must_use]
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug, Clone)]
struct IssuedNonce {
    value: String,
    issued_at: OffsetDateTime,
}

/// In-process [`NonceStore`] backed by a concurrent map.
///
/// Entries carry their issue time; consuming an entry older than the
/// configured time-to-live fails with [`NonceError::Expired`], and
/// [`MemoryNonceStore::purge_expired`] evicts abandoned attempts (the server
/// runs it on an interval).
pub struct MemoryNonceStore {
    entries: DashMap<String, IssuedNonce>,
    ttl: Duration,
}

impl MemoryNonceStore {
    /// Creates a store whose nonces live for `ttl` after issuance.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Number of nonces currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no nonce is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evicts entries older than the time-to-live, returning how many were
    /// removed.
    pub fn purge_expired(&self) -> usize {
        let cutoff = OffsetDateTime::now_utc() - self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, nonce| nonce.issued_at > cutoff);
        before - self.entries.len()
    }
}

impl Default for MemoryNonceStore {
    fn default() -> Self {
        Self::new(DEFAULT_NONCE_TTL)
    }
}

#[async_trait]
impl NonceStore for MemoryNonceStore {
    async fn issue(&self, session: &str) -> Result<String, NonceError> {
        let value = generate_nonce();
        self.entries.insert(
            session.to_string(),
            IssuedNonce {
                value: value.clone(),
                issued_at: OffsetDateTime::now_utc(),
            },
        );
        Ok(value)
    }

    async fn consume(&self, session: &str) -> Result<String, NonceError> {
        // DashMap::remove is the atomic observe-and-clear; expiry is checked
        // on the value after it has already been taken out of the map.
        let (_, nonce) = self
            .entries
            .remove(session)
            .ok_or(NonceError::NotFound)?;

        if OffsetDateTime::now_utc() - nonce.issued_at > self.ttl {
            return Err(NonceError::Expired);
        }

        Ok(nonce.value)
    }
}
