//! # idbridge-core
//!
//! Identity federation and token-minting engine for the idbridge server.
//!
//! This crate turns a third-party OAuth2 login into a self-issued, signed
//! token that downstream services verify offline:
//! - Provider adapters translate each provider's OAuth2 dialect into one
//!   capability contract (authorization URL, code exchange, profile lookup)
//! - A CSRF nonce store binds every authorization request to its callback
//! - Identity resolvers map provider identities onto stable local user ids
//! - A signing strategy serializes the minted claims into a compact JWT
//!
//! The crate performs no file, environment, or listener access; it is
//! constructed from an already-validated settings bundle (see
//! `idbridge-config`) and driven by the HTTP layer in `idbridge-server`.
//!
//! ## Modules
//!
//! - [`provider`] - Provider adapters and the runtime registry
//! - [`identity`] - Local user-identifier policies (plain, hashed)
//! - [`claims`] - Claim assembly and the token lifetime policy
//! - [`token`] - Signing, verification, and key-pair generation
//! - [`nonce`] - Single-use CSRF nonce issuance and consumption
//! - [`federation`] - The orchestrator tying the above together
//! - [`error`] - The flow-level error taxonomy

pub mod claims;
pub mod error;
pub mod federation;
pub mod identity;
pub mod nonce;
pub mod provider;
pub mod token;

pub use claims::{Claims, FederatedIdentity, TokenPolicy};
pub use error::FlowError;
pub use federation::FederationService;
pub use identity::{HashedIdentityResolver, IdentityResolver, PlainIdentityResolver};
pub use nonce::{MemoryNonceStore, NonceError, NonceStore};
pub use provider::{
    ExchangeError, FacebookProvider, GithubProvider, GoogleProvider, IdentityLookupError,
    Provider, ProviderEndpoints, ProviderRegistry, ProviderSettings, ProviderToken,
};
pub use token::{
    GeneratedKeyPair, KeyFamily, KeyMaterial, SignedToken, SigningAlgorithm, SigningError,
    TokenSigner, TokenVerifier, VerificationError, VerifyingKey,
};
