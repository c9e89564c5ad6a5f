//! The federation orchestrator.
//!
//! [`FederationService`] ties the pieces together: it issues the CSRF nonce
//! and builds the provider redirect when a login starts, then drives the
//! callback through nonce consumption, state comparison, code exchange,
//! profile lookup, identity resolution, and signing. The service itself is
//! immutable after construction; the nonce store is the only component that
//! mutates between requests.

use std::sync::Arc;

use url::Url;

use crate::claims::{FederatedIdentity, TokenPolicy};
use crate::error::FlowError;
use crate::identity::IdentityResolver;
use crate::nonce::NonceStore;
use crate::provider::ProviderRegistry;
use crate::token::{SignedToken, SigningError, TokenSigner, TokenVerifier};

/// Orchestrates the login handshake from redirect to minted token.
///
/// Thread-safe (`Send + Sync`); build one at startup and share it.
pub struct FederationService {
    providers: ProviderRegistry,
    signer: TokenSigner,
    resolver: Arc<dyn IdentityResolver>,
    nonces: Arc<dyn NonceStore>,
    policy: TokenPolicy,
}

impl FederationService {
    /// Creates a service over an already-built provider registry, signer,
    /// and policies.
    #[must_use]
    pub fn new(
        providers: ProviderRegistry,
        signer: TokenSigner,
        resolver: Arc<dyn IdentityResolver>,
        nonces: Arc<dyn NonceStore>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            providers,
            signer,
            resolver,
            nonces,
            policy,
        }
    }

    /// Starts a login: issues a fresh nonce for `session` and returns the
    /// provider redirect with that nonce bound as `state`.
    ///
    /// # Errors
    /// Returns `UnknownProvider` when no adapter is registered under
    /// `provider`.
    pub async fn begin_login(&self, provider: &str, session: &str) -> Result<Url, FlowError> {
        let adapter = self
            .providers
            .get(provider)
            .ok_or_else(|| FlowError::UnknownProvider(provider.to_string()))?;

        let nonce = self.nonces.issue(session).await?;
        let url = adapter.authorization_url(&nonce);

        tracing::debug!(
            "Generated authorization URL for provider {}: {}",
            provider,
            url.as_str().split('?').next().unwrap_or("")
        );

        Ok(url)
    }

    /// Completes a login from the provider callback.
    ///
    /// The session's nonce is consumed before anything else, so a callback
    /// burns it no matter how the rest of the flow ends. Only when the
    /// returned `state` equals that nonce does the authorization code get
    /// exchanged; a mismatched callback never reaches the provider.
    ///
    /// # Errors
    /// Returns a CSRF failure when no live nonce exists or `state` does not
    /// match, `MissingAuthorizationCode` for an empty code, and the wrapped
    /// exchange, lookup, or signing error when a downstream step fails.
    pub async fn complete_login(
        &self,
        provider: &str,
        code: &str,
        state: &str,
        session: &str,
    ) -> Result<SignedToken, FlowError> {
        let nonce = self.nonces.consume(session).await?;

        if state != nonce {
            tracing::warn!("Rejected {} callback with mismatched state", provider);
            return Err(FlowError::CsrfMismatch);
        }

        if code.is_empty() {
            return Err(FlowError::MissingAuthorizationCode);
        }

        let adapter = self
            .providers
            .get(provider)
            .ok_or_else(|| FlowError::UnknownProvider(provider.to_string()))?;

        let token = adapter.exchange(code).await?;
        let provider_user_id = adapter.resolve_user_id(&token).await?;
        let user_id = self.resolver.resolve(provider, &provider_user_id);

        let identity = FederatedIdentity {
            provider: provider.to_string(),
            user_id,
            token,
        };
        let claims = self.policy.claims_for(&identity);
        let signed = self.signer.sign(&claims)?;

        tracing::info!("Authenticated user {} via provider {}", claims.user, provider);

        Ok(signed)
    }

    /// Registered provider names, sorted.
    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.names()
    }

    /// PEM-encoded public keys for the signing key, empty for HMAC.
    #[must_use]
    pub fn public_keys(&self) -> Vec<String> {
        self.signer.public_key_pems()
    }

    /// Builds a verifier for tokens minted by this service.
    ///
    /// # Errors
    /// Returns an error if the verification key cannot be parsed.
    pub fn verifier(&self) -> Result<TokenVerifier, SigningError> {
        self.signer.verifier()
    }
}
