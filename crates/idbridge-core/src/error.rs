//! Flow-level error taxonomy for the federation engine.
//!
//! Component-specific failures (exchange, identity lookup, signing, nonce
//! handling) bubble up into [`FlowError`] so the HTTP layer sees one
//! inspectable outcome per failed login attempt.

use crate::nonce::NonceError;
use crate::provider::{ExchangeError, IdentityLookupError};
use crate::token::SigningError;

/// Errors surfaced by a single authentication attempt.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// No adapter is registered under the requested provider name.
    #[error("Unknown identity provider: {0}")]
    UnknownProvider(String),

    /// The callback's `state` parameter does not equal the issued nonce.
    #[error("Callback state does not match the issued login nonce")]
    CsrfMismatch,

    /// The callback carried no authorization code.
    #[error("Callback carried no authorization code")]
    MissingAuthorizationCode,

    /// The nonce store held no live nonce for this session.
    #[error(transparent)]
    Nonce(#[from] NonceError),

    /// The provider rejected the code exchange, or the call failed.
    #[error("Code exchange failed: {0}")]
    Exchange(#[from] ExchangeError),

    /// The provider profile lookup failed.
    #[error("Identity lookup failed: {0}")]
    IdentityLookup(#[from] IdentityLookupError),

    /// Signing the assembled claims failed.
    #[error("Token signing failed: {0}")]
    Signing(#[from] SigningError),
}

impl FlowError {
    /// Returns `true` when the callback was denied for CSRF reasons
    /// (mismatched, missing, or stale nonce).
    #[must_use]
    pub fn is_csrf_failure(&self) -> bool {
        matches!(self, Self::CsrfMismatch | Self::Nonce(_))
    }

    /// Returns `true` when the failure originated in the upstream provider.
    #[must_use]
    pub fn is_upstream_failure(&self) -> bool {
        matches!(self, Self::Exchange(_) | Self::IdentityLookup(_))
    }

    /// Returns `true` when the failure indicates broken deployment
    /// configuration rather than a per-request condition.
    #[must_use]
    pub fn is_configuration_failure(&self) -> bool {
        matches!(self, Self::Signing(_))
    }
}
