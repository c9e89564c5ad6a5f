//! OAuth2 provider adapters.
//!
//! Every supported provider speaks the same authorization-code flow with its
//! own dialect quirks. The [`Provider`] trait pins the shared surface
//! (authorization redirect, code exchange, profile lookup) and each adapter
//! supplies endpoints plus whatever its dialect needs on top. Adapters are
//! stateless: per-login data rides in the `state` parameter and the nonce
//! store, never in the adapter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use url::Url;

pub mod facebook;
pub mod github;
pub mod google;

pub use facebook::FacebookProvider;
pub use github::GithubProvider;
pub use google::GoogleProvider;

/// Errors raised while exchanging an authorization code.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// The provider answered with an OAuth error payload.
    #[error("Provider rejected the exchange: {error} - {description}")]
    Rejected {
        /// OAuth error code, e.g. `invalid_grant`.
        error: String,
        /// Human-readable description, empty when the provider sent none.
        description: String,
    },

    /// The token endpoint answered with a non-success status.
    #[error("Token endpoint returned HTTP {status} - {body}")]
    Endpoint { status: u16, body: String },

    /// The token endpoint could not be reached.
    #[error("Token endpoint unreachable: {0}")]
    Network(#[from] reqwest::Error),

    /// The response parsed but did not carry a usable token.
    #[error("Unusable token response: {message}")]
    Malformed { message: String },
}

impl ExchangeError {
    /// Creates a new `Rejected` error.
    #[must_use]
    pub fn rejected(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Rejected {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Errors raised while resolving the provider-side user id.
#[derive(Debug, thiserror::Error)]
pub enum IdentityLookupError {
    /// The profile endpoint answered with a non-success status.
    #[error("Profile endpoint returned HTTP {status} - {body}")]
    Endpoint { status: u16, body: String },

    /// The profile endpoint could not be reached.
    #[error("Profile endpoint unreachable: {0}")]
    Network(#[from] reqwest::Error),

    /// The profile parsed but lacks the identifying field.
    #[error("Profile response missing field: {field}")]
    MissingField { field: String },

    /// The profile response could not be parsed.
    #[error("Unusable profile response: {message}")]
    Malformed { message: String },
}

impl IdentityLookupError {
    /// Creates a new `MissingField` error.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Token set a provider hands back for a successful code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderToken {
    /// Access token for calls against the provider's APIs.
    pub access_token: String,
    /// Token type, `Bearer` unless the provider says otherwise.
    pub token_type: String,
    /// Refresh token, when the provider issued one.
    pub refresh_token: Option<String>,
    /// Absolute expiry derived from the provider's `expires_in`, when given.
    pub expires_at: Option<OffsetDateTime>,
}

/// OAuth2 client credentials and redirect target for one provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Scopes requested at authorization time, joined with spaces.
    pub scopes: Vec<String>,
    /// The callback URL registered with the provider.
    pub redirect_url: Url,
}

/// The three endpoints an authorization-code dialect talks to.
///
/// Adapters ship their provider's production endpoints; tests swap in a
/// local server via `with_endpoints`.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    /// Browser-facing authorization endpoint.
    pub authorization: Url,
    /// Server-to-server token endpoint.
    pub token: Url,
    /// Server-to-server profile endpoint.
    pub profile: Url,
}

/// One OAuth2 provider dialect.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Registry name, as it appears in login and callback paths.
    fn name(&self) -> &str;

    /// Builds the browser redirect for this provider, binding `state` to the
    /// returning callback. Pure URL construction, no network.
    fn authorization_url(&self, state: &str) -> Url;

    /// Exchanges an authorization code for the provider's token set.
    async fn exchange(&self, code: &str) -> Result<ProviderToken, ExchangeError>;

    /// Looks up the provider-side user id for an exchanged token.
    async fn resolve_user_id(
        &self,
        token: &ProviderToken,
    ) -> Result<String, IdentityLookupError>;
}

/// Immutable lookup table of provider adapters, built once at startup.
#[derive(Default)]
pub struct ProviderRegistry {
    adapters: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under its own name.
    pub fn register(&mut self, adapter: Arc<dyn Provider>) {
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    /// Looks up an adapter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        self.adapters.get(name)
    }

    /// Registered provider names, sorted for stable listings.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Returns `true` when no adapter is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Names of the known provider dialects, sorted.
#[must_use]
pub fn known_dialects() -> [&'static str; 3] {
    [
        FacebookProvider::NAME,
        GithubProvider::NAME,
        GoogleProvider::NAME,
    ]
}

/// Builds the adapter for a configured provider name, or `None` when no
/// dialect under that name is known.
#[must_use]
pub fn build_adapter(
    name: &str,
    settings: ProviderSettings,
    http: reqwest::Client,
) -> Option<Arc<dyn Provider>> {
    match name {
        GoogleProvider::NAME => Some(Arc::new(GoogleProvider::new(settings, http))),
        GithubProvider::NAME => Some(Arc::new(GithubProvider::new(settings, http))),
        FacebookProvider::NAME => Some(Arc::new(FacebookProvider::new(settings, http))),
        _ => None,
    }
}

/// Joins the public root URI with the per-provider callback path.
#[must_use]
pub fn callback_url(root_uri: &str, provider: &str) -> String {
    format!("{}/callback/{provider}", root_uri.trim_end_matches('/'))
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    // Some providers answer HTTP 200 with an error payload instead of a
    // token (GitHub does this for bad verification codes).
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenEndpointResponse {
    fn into_provider_token(self) -> Result<ProviderToken, ExchangeError> {
        if let Some(error) = self.error {
            return Err(ExchangeError::rejected(
                error,
                self.error_description.unwrap_or_default(),
            ));
        }

        let access_token = match self.access_token {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Err(ExchangeError::malformed(
                    "token response carried no access_token",
                ));
            }
        };

        let expires_at = self
            .expires_in
            .filter(|&seconds| seconds > 0)
            .map(|seconds| OffsetDateTime::now_utc() + Duration::seconds(seconds));

        Ok(ProviderToken {
            access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            refresh_token: self.refresh_token,
            expires_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Builds the standard authorization redirect for `endpoint`.
pub(crate) fn standard_authorization_url(
    endpoint: &Url,
    settings: &ProviderSettings,
    state: &str,
) -> Url {
    let mut url = endpoint.clone();
    {
        let mut params = url.query_pairs_mut();
        params.append_pair("response_type", "code");
        params.append_pair("client_id", &settings.client_id);
        params.append_pair("redirect_uri", settings.redirect_url.as_str());
        if !settings.scopes.is_empty() {
            params.append_pair("scope", &settings.scopes.join(" "));
        }
        params.append_pair("state", state);
    }
    url
}

/// Posts the authorization code to the token endpoint as a form body.
///
/// `accept_json` asks the endpoint for a JSON answer; providers that default
/// to form-encoded responses need it.
pub(crate) async fn exchange_authorization_code(
    http: &reqwest::Client,
    endpoint: &Url,
    settings: &ProviderSettings,
    code: &str,
    accept_json: bool,
) -> Result<ProviderToken, ExchangeError> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", settings.redirect_url.as_str()),
        ("client_id", &settings.client_id),
        ("client_secret", &settings.client_secret),
    ];

    let mut request = http.post(endpoint.clone()).form(&params);
    if accept_json {
        request = request.header(reqwest::header::ACCEPT, "application/json");
    }

    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Try to parse an OAuth error payload before falling back to the
        // raw status and body.
        if let Ok(oauth_error) = serde_json::from_str::<OAuthErrorResponse>(&body) {
            return Err(ExchangeError::rejected(
                oauth_error.error,
                oauth_error.error_description.unwrap_or_default(),
            ));
        }

        return Err(ExchangeError::Endpoint {
            status: status.as_u16(),
            body,
        });
    }

    let token_response: TokenEndpointResponse = response
        .json()
        .await
        .map_err(|e| ExchangeError::malformed(format!("Failed to parse token response: {e}")))?;

    token_response.into_provider_token()
}

/// Fetches the profile document with Bearer auth and extracts `field`.
///
/// Numeric identifiers are rendered as decimal strings, so providers that
/// expose numeric ids resolve the same as string ones.
pub(crate) async fn fetch_profile_id(
    http: &reqwest::Client,
    endpoint: &Url,
    token: &ProviderToken,
    field: &str,
    headers: &[(&str, &str)],
) -> Result<String, IdentityLookupError> {
    let mut request = http.get(endpoint.clone()).bearer_auth(&token.access_token);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(IdentityLookupError::Endpoint {
            status: status.as_u16(),
            body,
        });
    }

    let profile: serde_json::Map<String, serde_json::Value> =
        response.json().await.map_err(|e| {
            IdentityLookupError::malformed(format!("Failed to parse profile response: {e}"))
        })?;

    profile
        .get(field)
        .and_then(profile_field_as_string)
        .ok_or_else(|| IdentityLookupError::missing_field(field))
}

fn profile_field_as_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> ProviderSettings {
        ProviderSettings {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            scopes: vec!["email".to_string(), "profile".to_string()],
            redirect_url: Url::parse("https://bridge.example.com/callback/test").unwrap(),
        }
    }

    #[test]
    fn test_standard_authorization_url_carries_state_verbatim() {
        let endpoint = Url::parse("https://idp.example.com/authorize").unwrap();
        let state = "Tm9uY2UtVmFsdWVfMTIz";

        let url = standard_authorization_url(&endpoint, &settings(), state);

        let round_tripped = url
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        assert_eq!(round_tripped, state);
        // Url-safe nonce characters survive encoding untouched.
        assert!(url.as_str().ends_with(&format!("state={state}")));
    }

    #[test]
    fn test_standard_authorization_url_joins_scopes() {
        let endpoint = Url::parse("https://idp.example.com/authorize").unwrap();
        let url = standard_authorization_url(&endpoint, &settings(), "s");

        let scope = url
            .query_pairs()
            .find(|(key, _)| key == "scope")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        assert_eq!(scope, "email profile");
    }

    #[test]
    fn test_standard_authorization_url_omits_empty_scope() {
        let endpoint = Url::parse("https://idp.example.com/authorize").unwrap();
        let mut settings = settings();
        settings.scopes.clear();

        let url = standard_authorization_url(&endpoint, &settings, "s");
        assert!(url.query_pairs().all(|(key, _)| key != "scope"));
    }

    #[test]
    fn test_token_response_error_payload_wins() {
        let response = TokenEndpointResponse {
            access_token: Some("ignored".to_string()),
            token_type: None,
            refresh_token: None,
            expires_in: None,
            error: Some("bad_verification_code".to_string()),
            error_description: Some("The code passed is incorrect".to_string()),
        };

        let err = response.into_provider_token().unwrap_err();
        assert!(matches!(err, ExchangeError::Rejected { .. }));
        assert!(err.to_string().contains("bad_verification_code"));
    }

    #[test]
    fn test_token_response_requires_access_token() {
        let response = TokenEndpointResponse {
            access_token: None,
            token_type: None,
            refresh_token: None,
            expires_in: None,
            error: None,
            error_description: None,
        };

        assert!(matches!(
            response.into_provider_token().unwrap_err(),
            ExchangeError::Malformed { .. }
        ));
    }

    #[test]
    fn test_token_response_defaults_and_expiry() {
        let response = TokenEndpointResponse {
            access_token: Some("tok".to_string()),
            token_type: None,
            refresh_token: None,
            expires_in: Some(3600),
            error: None,
            error_description: None,
        };

        let token = response.into_provider_token().unwrap();
        assert_eq!(token.token_type, "Bearer");
        let expires_at = token.expires_at.unwrap();
        assert!(expires_at > OffsetDateTime::now_utc() + Duration::minutes(59));

        let response = TokenEndpointResponse {
            access_token: Some("tok".to_string()),
            token_type: Some("bearer".to_string()),
            refresh_token: None,
            expires_in: Some(0),
            error: None,
            error_description: None,
        };

        let token = response.into_provider_token().unwrap();
        assert_eq!(token.token_type, "bearer");
        assert!(token.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_exchange_posts_form_and_parses_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains("client_secret=client-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "upstream-access",
                "token_type": "Bearer",
                "refresh_token": "upstream-refresh",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = Url::parse(&format!("{}/token", server.uri())).unwrap();
        let token = exchange_authorization_code(
            &reqwest::Client::new(),
            &endpoint,
            &settings(),
            "auth-code",
            false,
        )
        .await
        .unwrap();

        assert_eq!(token.access_token, "upstream-access");
        assert_eq!(token.refresh_token.as_deref(), Some("upstream-refresh"));
        assert!(token.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_exchange_surfaces_oauth_error_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Code was already redeemed"
            })))
            .mount(&server)
            .await;

        let endpoint = Url::parse(&format!("{}/token", server.uri())).unwrap();
        let err = exchange_authorization_code(
            &reqwest::Client::new(),
            &endpoint,
            &settings(),
            "auth-code",
            false,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExchangeError::Rejected { .. }));
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_exchange_surfaces_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let endpoint = Url::parse(&format!("{}/token", server.uri())).unwrap();
        let err = exchange_authorization_code(
            &reqwest::Client::new(),
            &endpoint,
            &settings(),
            "auth-code",
            false,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExchangeError::Endpoint { status: 502, .. }));
    }

    #[test]
    fn test_registry_lookup_and_names() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.is_empty());

        let http = reqwest::Client::new();
        registry.register(build_adapter("google", settings(), http.clone()).unwrap());
        registry.register(build_adapter("github", settings(), http).unwrap());

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["github", "google"]);
        assert_eq!(registry.get("google").unwrap().name(), "google");
        assert!(registry.get("gitlab").is_none());
    }

    #[test]
    fn test_build_adapter_rejects_unknown_dialect() {
        assert!(build_adapter("gitlab", settings(), reqwest::Client::new()).is_none());
    }

    #[test]
    fn test_every_known_dialect_builds() {
        for name in known_dialects() {
            let adapter = build_adapter(name, settings(), reqwest::Client::new()).unwrap();
            assert_eq!(adapter.name(), name);
        }
    }

    #[test]
    fn test_callback_url_normalizes_trailing_slash() {
        assert_eq!(
            callback_url("https://bridge.example.com/", "google"),
            "https://bridge.example.com/callback/google"
        );
        assert_eq!(
            callback_url("https://bridge.example.com", "github"),
            "https://bridge.example.com/callback/github"
        );
    }
}
