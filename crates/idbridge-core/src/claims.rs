//! Claim construction for freshly minted tokens.
//!
//! [`TokenPolicy`] holds the issuer-side constants (who signs, for whom, how
//! long) and stamps a [`FederatedIdentity`] into the [`Claims`] that get
//! signed. Claim layout:
//!
//! - Registered: `iss`, `sub`, `aud`, `iat`, `exp`, `nbf`, `jti`
//! - Custom: `provider`, `user`, `access_token`, `token_type`,
//!   `refresh_token` (omitted when the provider returned none)

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::provider::ProviderToken;

/// A provider-verified identity, paired with the credentials the provider
/// handed back during the code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct FederatedIdentity {
    /// Registry name of the provider that verified the user.
    pub provider: String,
    /// Local user identifier, already shaped by the identity policy.
    pub user_id: String,
    /// Upstream credentials from the code exchange.
    pub token: ProviderToken,
}

/// Claim set carried by minted tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub jti: String,
    /// Provider that verified this identity.
    pub provider: String,
    /// Resolved user identifier, shaped by the configured identity policy.
    pub user: String,
    /// Upstream access token, passed through for resource calls.
    pub access_token: String,
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Issuer-side constants stamped into every minted token.
#[derive(Debug, Clone)]
pub struct TokenPolicy {
    pub issuer: String,
    pub audience: String,
    pub subject: String,
    /// Lifetime used when the provider reports no expiry, or one already in
    /// the past.
    pub lifetime: Duration,
}

impl TokenPolicy {
    /// Builds the claim set for `identity`, timestamped now.
    #[must_use]
    pub fn claims_for(&self, identity: &FederatedIdentity) -> Claims {
        self.claims_at(identity, OffsetDateTime::now_utc())
    }

    fn claims_at(&self, identity: &FederatedIdentity, now: OffsetDateTime) -> Claims {
        let iat = now.unix_timestamp();

        // The provider's own expiry wins when it is still ahead of us;
        // anything stale (or absent) falls back to the policy lifetime so
        // that exp always lands strictly after iat.
        let exp = match identity.token.expires_at {
            Some(expires_at) if expires_at.unix_timestamp() > iat => expires_at.unix_timestamp(),
            _ => iat + self.lifetime.whole_seconds(),
        };

        Claims {
            iss: self.issuer.clone(),
            sub: self.subject.clone(),
            aud: self.audience.clone(),
            iat,
            exp,
            nbf: iat,
            jti: Uuid::new_v4().to_string(),
            provider: identity.provider.clone(),
            user: identity.user_id.clone(),
            access_token: identity.token.access_token.clone(),
            token_type: identity.token.token_type.clone(),
            refresh_token: identity.token.refresh_token.clone(),
        }
    }
}
