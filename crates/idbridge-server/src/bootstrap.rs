//! Wires validated settings into the running service.
//!
//! Everything long-lived is constructed here once: the shared HTTP client,
//! the provider registry, the signer and the nonce store. Handlers only see
//! the resulting [`AppState`].

use std::sync::Arc;

use anyhow::Context;
use idbridge_config::{IdentityPolicy, Settings};
use idbridge_core::provider::{ProviderSettings, build_adapter, callback_url};
use idbridge_core::{
    FederationService, HashedIdentityResolver, IdentityResolver, MemoryNonceStore,
    PlainIdentityResolver, ProviderRegistry, TokenSigner, TokenVerifier,
};
use url::Url;

/// How often expired nonces are swept out of the in-memory store.
const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub federation: Arc<FederationService>,
    pub verifier: Arc<TokenVerifier>,
    pub nonces: Arc<MemoryNonceStore>,
    /// Where the browser lands with `?token=` after a completed login.
    pub redirect_uri: Url,
    /// Lifetime of the session correlation cookie, same as the nonce TTL.
    pub session_ttl: time::Duration,
    pub secure_cookies: bool,
}

/// Builds the application state from validated settings.
///
/// # Errors
/// Fails when the HTTP client cannot be constructed, a provider name has no
/// dialect, or the signing key does not parse.
pub fn build_state(settings: Settings) -> anyhow::Result<AppState> {
    let http = reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .user_agent(concat!("idbridge/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build the shared HTTP client")?;

    let mut registry = ProviderRegistry::new();
    for (name, provider) in &settings.providers {
        let redirect = callback_url(settings.root_uri.as_str(), name);
        let redirect_url = Url::parse(&redirect)
            .with_context(|| format!("Callback URL for {name} is not valid: {redirect}"))?;

        let adapter = build_adapter(
            name,
            ProviderSettings {
                client_id: provider.client_id.clone(),
                client_secret: provider.client_secret.clone(),
                scopes: provider.scopes.clone(),
                redirect_url,
            },
            http.clone(),
        )
        .with_context(|| format!("No provider dialect is known under the name {name}"))?;
        registry.register(adapter);
    }

    if registry.is_empty() {
        tracing::warn!("No identity providers are configured; logins cannot start");
    }

    let resolver: Arc<dyn IdentityResolver> = match settings.identity_policy {
        IdentityPolicy::Plain => Arc::new(PlainIdentityResolver),
        IdentityPolicy::Hashed => Arc::new(HashedIdentityResolver),
    };

    let signer = TokenSigner::new(settings.token.algorithm, settings.token.key_material)
        .context("Failed to construct the token signer")?;

    let nonces = Arc::new(MemoryNonceStore::new(settings.nonce_ttl));

    let federation = FederationService::new(
        registry,
        signer,
        resolver,
        nonces.clone(),
        settings.token.policy,
    );
    let verifier = federation
        .verifier()
        .context("Failed to derive the token verifier")?;

    let secure_cookies = settings.root_uri.scheme() == "https";

    Ok(AppState {
        federation: Arc::new(federation),
        verifier: Arc::new(verifier),
        nonces,
        redirect_uri: settings.redirect_uri,
        session_ttl: settings.nonce_ttl,
        secure_cookies,
    })
}

/// Periodically drops expired nonces so abandoned logins do not accumulate.
pub fn spawn_nonce_sweeper(store: Arc<MemoryNonceStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = store.purge_expired();
            if removed > 0 {
                tracing::debug!("Swept {removed} expired login nonces");
            }
        }
    });
}
