//! Facebook OAuth2 adapter.
//!
//! Standard dialect against the Graph API; the profile lookup hits `/me`
//! and reads the string `id` field.

use async_trait::async_trait;
use url::Url;

use super::{
    ExchangeError, IdentityLookupError, Provider, ProviderEndpoints, ProviderSettings,
    ProviderToken, exchange_authorization_code, fetch_profile_id, standard_authorization_url,
};

pub struct FacebookProvider {
    settings: ProviderSettings,
    endpoints: ProviderEndpoints,
    http: reqwest::Client,
}

impl FacebookProvider {
    /// Registry name.
    pub const NAME: &'static str = "facebook";

    /// Creates an adapter against Facebook's production endpoints.
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
            authorization: Url::parse("https://www.facebook.com/dialog/oauth")
                .expect("static Facebook authorization endpoint"),
            token: Url::parse("https://graph.facebook.com/oauth/access_token")
                .expect("static Facebook token endpoint"),
            profile: Url::parse("https://graph.facebook.com/me")
                .expect("static Facebook profile endpoint"),
        }
    }
}

#[async_trait]
impl Provider for FacebookProvider {
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
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> ProviderSettings {
        ProviderSettings {
            client_id: "facebook-client".to_string(),
            client_secret: "facebook-secret".to_string(),
            scopes: vec!["public_profile".to_string()],
            redirect_url: Url::parse("https://bridge.example.com/callback/facebook").unwrap(),
        }
    }

    #[test]
    fn test_authorization_url_targets_facebook() {
        let provider = FacebookProvider::new(settings(), reqwest::Client::new());
        let url = provider.authorization_url("csrf-nonce");

        assert_eq!(url.host_str(), Some("www.facebook.com"));
        assert_eq!(url.path(), "/dialog/oauth");
        assert!(url.as_str().contains("state=csrf-nonce"));
    }

    #[tokio::test]
    async fn test_exchange_and_resolve_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fb_token",
                "token_type": "bearer",
                "expires_in": 5183944
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "id": "10150000000000000" })),
            )
            .mount(&server)
            .await;

        let endpoints = ProviderEndpoints {
            authorization: Url::parse(&format!("{}/dialog/oauth", server.uri())).unwrap(),
            token: Url::parse(&format!("{}/oauth/access_token", server.uri())).unwrap(),
            profile: Url::parse(&format!("{}/me", server.uri())).unwrap(),
        };
        let provider =
            FacebookProvider::with_endpoints(settings(), reqwest::Client::new(), endpoints);

        let token = provider.exchange("auth-code").await.unwrap();
        assert_eq!(token.access_token, "fb_token");

        let user_id = provider.resolve_user_id(&token).await.unwrap();
        assert_eq!(user_id, "10150000000000000");
    }
}
