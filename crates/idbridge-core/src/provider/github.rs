//! GitHub OAuth2 adapter.
//!
//! GitHub's dialect has two quirks on top of the standard flow: the token
//! endpoint answers form-encoded unless `Accept: application/json` is sent,
//! and bad verification codes come back as HTTP 200 with an error payload.
//! GitHub also rejects requests without a `User-Agent`; the shared HTTP
//! client is built with one.

use async_trait::async_trait;
use url::Url;

use super::{
    ExchangeError, IdentityLookupError, Provider, ProviderEndpoints, ProviderSettings,
    ProviderToken, exchange_authorization_code, fetch_profile_id, standard_authorization_url,
};

pub struct GithubProvider {
    settings: ProviderSettings,
    endpoints: ProviderEndpoints,
    http: reqwest::Client,
}

impl GithubProvider {
    /// Registry name.
    pub const NAME: &'static str = "github";

    /// Creates an adapter against GitHub's production endpoints.
    #[must_use]
    pub fn new(settings: ProviderSettings, http: reqwest::Client) -> Self {
        Self::with_endpoints(settings, http, Self::default_endpoints())
    }

    /// Creates an adapter against explicit endpoints, used to point tests at
    /// a local server.
    #[must_use]
    pub fn with_endpoints(
        settings: ProviderSettings,
        http: reqwest::Client,
        endpoints: ProviderEndpoints,
    ) -> Self {
        Self {
            settings,
            endpoints,
            http,
        }
    }

    fn default_endpoints() -> ProviderEndpoints {
        ProviderEndpoints {
            authorization: Url::parse("https://github.com/login/oauth/authorize")
                .expect("static GitHub authorization endpoint"),
            token: Url::parse("https://github.com/login/oauth/access_token")
                .expect("static GitHub token endpoint"),
            profile: Url::parse("https://api.github.com/user")
                .expect("static GitHub profile endpoint"),
        }
    }
}

#[async_trait]
impl Provider for GithubProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn authorization_url(&self, state: &str) -> Url {
        standard_authorization_url(&self.endpoints.authorization, &self.settings, state)
    }

    async fn exchange(&self, code: &str) -> Result<ProviderToken, ExchangeError> {
        exchange_authorization_code(&self.http, &self.endpoints.token, &self.settings, code, true)
            .await
    }

    async fn resolve_user_id(
        &self,
        token: &ProviderToken,
    ) -> Result<String, IdentityLookupError> {
        fetch_profile_id(
            &self.http,
            &self.endpoints.profile,
            token,
            "id",
            &[("Accept", "application/vnd.github+json")],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> ProviderSettings {
        ProviderSettings {
            client_id: "github-client".to_string(),
            client_secret: "github-secret".to_string(),
            scopes: vec!["user:email".to_string()],
            redirect_url: Url::parse("https://bridge.example.com/callback/github").unwrap(),
        }
    }

    fn mock_endpoints(server: &MockServer) -> ProviderEndpoints {
        ProviderEndpoints {
            authorization: Url::parse(&format!("{}/login/oauth/authorize", server.uri())).unwrap(),
            token: Url::parse(&format!("{}/login/oauth/access_token", server.uri())).unwrap(),
            profile: Url::parse(&format!("{}/user", server.uri())).unwrap(),
        }
    }

    #[test]
    fn test_authorization_url_targets_github() {
        let provider = GithubProvider::new(settings(), reqwest::Client::new());
        let url = provider.authorization_url("csrf-nonce");

        assert_eq!(url.host_str(), Some("github.com"));
        assert_eq!(url.path(), "/login/oauth/authorize");
        assert!(url.as_str().contains("state=csrf-nonce"));
    }

    #[tokio::test]
    async fn test_exchange_requests_json_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "gho_token",
                "token_type": "bearer",
                "scope": "user:email"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GithubProvider::with_endpoints(
            settings(),
            reqwest::Client::new(),
            mock_endpoints(&server),
        );

        let token = provider.exchange("auth-code").await.unwrap();
        assert_eq!(token.access_token, "gho_token");
        assert_eq!(token.token_type, "bearer");
        assert!(token.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_exchange_rejects_error_in_200_body() {
        // GitHub answers HTTP 200 even when the code is bad.
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired."
            })))
            .mount(&server)
            .await;

        let provider = GithubProvider::with_endpoints(
            settings(),
            reqwest::Client::new(),
            mock_endpoints(&server),
        );

        let err = provider.exchange("stale-code").await.unwrap_err();
        assert!(matches!(err, ExchangeError::Rejected { .. }));
        assert!(err.to_string().contains("bad_verification_code"));
    }

    #[tokio::test]
    async fn test_resolve_user_id_renders_numeric_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer gho_token"))
            .and(header("accept", "application/vnd.github+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 583231,
                "login": "octocat"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GithubProvider::with_endpoints(
            settings(),
            reqwest::Client::new(),
            mock_endpoints(&server),
        );
        let token = ProviderToken {
            access_token: "gho_token".to_string(),
            token_type: "bearer".to_string(),
            refresh_token: None,
            expires_at: None,
        };

        let user_id = provider.resolve_user_id(&token).await.unwrap();
        assert_eq!(user_id, "583231");
    }
}
