//! Google OAuth2 adapter.
//!
//! Standard authorization-code dialect: form-encoded token exchange, JSON
//! responses, profile lookup against the `userinfo` endpoint.

use async_trait::async_trait;
use url::Url;

use super::{
    ExchangeError, IdentityLookupError, Provider, ProviderEndpoints, ProviderSettings,
    ProviderToken, exchange_authorization_code, fetch_profile_id, standard_authorization_url,
};

pub struct GoogleProvider {
    settings: ProviderSettings,
    endpoints: ProviderEndpoints,
    http: reqwest::Client,
}

impl GoogleProvider {
    /// Registry name.
    pub const NAME: &'static str = "google";

    /// Creates an adapter against Google's production endpoints.
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
            authorization: Url::parse("https://accounts.google.com/o/oauth2/auth")
                .expect("static Google authorization endpoint"),
            token: Url::parse("https://accounts.google.com/o/oauth2/token")
                .expect("static Google token endpoint"),
            profile: Url::parse("https://www.googleapis.com/oauth2/v2/userinfo")
                .expect("static Google profile endpoint"),
        }
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn authorization_url(&self, state: &str) -> Url {
        standard_authorization_url(&self.endpoints.authorization, &self.settings, state)
    }

    async fn exchange(&self, code: &str) -> Result<ProviderToken, ExchangeError> {
        exchange_authorization_code(&self.http, &self.endpoints.token, &self.settings, code, false)
            .await
    }

    async fn resolve_user_id(
        &self,
        token: &ProviderToken,
    ) -> Result<String, IdentityLookupError> {
        fetch_profile_id(&self.http, &self.endpoints.profile, token, "id", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> ProviderSettings {
        ProviderSettings {
            client_id: "google-client".to_string(),
            client_secret: "google-secret".to_string(),
            scopes: vec!["email".to_string()],
            redirect_url: Url::parse("https://bridge.example.com/callback/google").unwrap(),
        }
    }

    fn mock_endpoints(server: &MockServer) -> ProviderEndpoints {
        ProviderEndpoints {
            authorization: Url::parse(&format!("{}/authorize", server.uri())).unwrap(),
            token: Url::parse(&format!("{}/token", server.uri())).unwrap(),
            profile: Url::parse(&format!("{}/userinfo", server.uri())).unwrap(),
        }
    }

    #[test]
    fn test_authorization_url_targets_google() {
        let provider = GoogleProvider::new(settings(), reqwest::Client::new());
        let url = provider.authorization_url("csrf-nonce");

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(url.path(), "/o/oauth2/auth");

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("client_id".to_string(), "google-client".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "https://bridge.example.com/callback/google".to_string()
        )));
        assert!(pairs.contains(&("state".to_string(), "csrf-nonce".to_string())));
    }

    #[tokio::test]
    async fn test_exchange_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GoogleProvider::with_endpoints(
            settings(),
            reqwest::Client::new(),
            mock_endpoints(&server),
        );

        let token = provider.exchange("auth-code").await.unwrap();
        assert_eq!(token.access_token, "ya29.token");
        assert!(token.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_resolve_user_id_uses_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer ya29.token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "110248495921238986420",
                "email": "user@example.com"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GoogleProvider::with_endpoints(
            settings(),
            reqwest::Client::new(),
            mock_endpoints(&server),
        );
        let token = ProviderToken {
            access_token: "ya29.token".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expires_at: None,
        };

        let user_id = provider.resolve_user_id(&token).await.unwrap();
        assert_eq!(user_id, "110248495921238986420");
    }

    #[tokio::test]
    async fn test_resolve_user_id_missing_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "email": "user@example.com" })),
            )
            .mount(&server)
            .await;

        let provider = GoogleProvider::with_endpoints(
            settings(),
            reqwest::Client::new(),
            mock_endpoints(&server),
        );
        let token = ProviderToken {
            access_token: "ya29.token".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expires_at: None,
        };

        let err = provider.resolve_user_id(&token).await.unwrap_err();
        assert!(matches!(err, IdentityLookupError::MissingField { .. }));
    }
}
