//! HTTP handlers for the federation flow.
//!
//! The handshake endpoints correlate browser and callback through a session
//! cookie; everything else is stateless plumbing around the engine.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use idbridge_core::{Claims, FlowError};

use crate::bootstrap::AppState;
use crate::templates;

/// Session correlation cookie name.
const SESSION_COOKIE_NAME: &str = "idbridge_session";

/// GET `/`. The root only forwards to the login page.
pub async fn home() -> Redirect {
    Redirect::to("/login")
}

/// GET `/ping` liveness probe.
pub async fn ping() -> &'static str {
    "pong"
}

/// GET `/robots.txt`. A login redirector has nothing worth indexing.
pub async fn robots() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain")],
        "User-agent: *\nDisallow: /\n",
    )
}

/// GET `/login`.
///
/// Renders the provider list and makes sure the browser carries a session
/// cookie before any provider redirect happens.
pub async fn login_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, _) = ensure_session(jar, state.session_ttl, state.secure_cookies);
    let html = templates::render_login_page(&state.federation.provider_names());
    (jar, Html(html)).into_response()
}

/// GET `/login/{provider}`.
///
/// Starts the handshake and replies with a redirect to the provider's
/// authorization URL.
pub async fn provider_login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Response {
    let (jar, session) = ensure_session(jar, state.session_ttl, state.secure_cookies);
    match state.federation.begin_login(&provider, &session).await {
        Ok(url) => (jar, Redirect::to(url.as_str())).into_response(),
        Err(e) => flow_error_response(&provider, &e),
    }
}

/// Query parameters on the provider callback. Providers omit `code` when the
/// user denies access; both fields fall back to empty strings.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

/// GET `/callback/{provider}`.
///
/// Completes the handshake and forwards the browser to the configured
/// redirect URI with the minted token appended as the `token` query
/// parameter.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Response {
    let session = jar
        .get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .unwrap_or_default();

    match state
        .federation
        .complete_login(&provider, &params.code, &params.state, &session)
        .await
    {
        Ok(token) => {
            let mut target = state.redirect_uri.clone();
            target.query_pairs_mut().append_pair("token", token.as_str());
            Redirect::to(target.as_str()).into_response()
        }
        Err(e) => flow_error_response(&provider, &e),
    }
}

/// GET `/pubkey`. Lists the verification keys as PEM strings.
pub async fn public_keys(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "keys": state.federation.public_keys() }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub token: Option<String>,
}

/// GET|POST `/token`.
///
/// Verifies a candidate token from the `Authorization: Bearer` header, with
/// the `token` query parameter as fallback. Replies 200 with the verified
/// claims, 401 otherwise.
pub async fn verify_token(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
    headers: HeaderMap,
) -> Response {
    let Some(candidate) = bearer_token(&headers).or(params.token) else {
        return error_response(StatusCode::UNAUTHORIZED, "no token supplied");
    };

    match state.verifier.verify::<Claims>(&candidate) {
        Ok(claims) => (StatusCode::OK, Json(claims)).into_response(),
        Err(e) => {
            tracing::debug!("Rejected token verification: {}", e);
            error_response(StatusCode::UNAUTHORIZED, &e.to_string())
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
}

/// Reuses the session cookie when present, otherwise issues a fresh one.
fn ensure_session(jar: CookieJar, ttl: time::Duration, secure: bool) -> (CookieJar, String) {
    let existing = jar
        .get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());
    if let Some(session) = existing {
        return (jar, session);
    }

    let session = Uuid::new_v4().to_string();
    let cookie = session_cookie(session.clone(), ttl, secure);
    (jar.add(cookie), session)
}

fn session_cookie(value: String, ttl: time::Duration, secure: bool) -> Cookie<'static> {
    // SameSite=Lax keeps the cookie across the provider's top-level redirect
    // back to the callback.
    Cookie::build((SESSION_COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(ttl)
        .build()
}

fn flow_error_response(provider: &str, err: &FlowError) -> Response {
    let status = match err {
        FlowError::UnknownProvider(_) => StatusCode::NOT_FOUND,
        FlowError::CsrfMismatch | FlowError::MissingAuthorizationCode | FlowError::Nonce(_) => {
            StatusCode::BAD_REQUEST
        }
        FlowError::Exchange(_) | FlowError::IdentityLookup(_) => StatusCode::BAD_GATEWAY,
        FlowError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Login via provider {} failed: {}", provider, err);
    } else {
        tracing::warn!("Login via provider {} rejected: {}", provider, err);
    }

    error_response(status, &err.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use idbridge_core::{ExchangeError, NonceError, SigningError};

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc".to_string()));

        let mut basic = HeaderMap::new();
        basic.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&basic), None);

        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc".to_string(), time::Duration::minutes(10), true);
        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::minutes(10)));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_ensure_session_reuses_existing_cookie() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE_NAME, "existing"));
        let (_, session) = ensure_session(jar, time::Duration::minutes(10), false);
        assert_eq!(session, "existing");
    }

    #[test]
    fn test_ensure_session_issues_fresh_cookie() {
        let (jar, session) = ensure_session(CookieJar::new(), time::Duration::minutes(10), false);
        assert!(!session.is_empty());
        assert_eq!(
            jar.get(SESSION_COOKIE_NAME).map(|c| c.value().to_string()),
            Some(session)
        );
    }

    #[test]
    fn test_flow_error_status_mapping() {
        let cases = [
            (
                FlowError::UnknownProvider("acme".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (FlowError::CsrfMismatch, StatusCode::BAD_REQUEST),
            (FlowError::MissingAuthorizationCode, StatusCode::BAD_REQUEST),
            (FlowError::Nonce(NonceError::NotFound), StatusCode::BAD_REQUEST),
            (FlowError::Nonce(NonceError::Expired), StatusCode::BAD_REQUEST),
            (
                FlowError::Exchange(ExchangeError::malformed("empty body")),
                StatusCode::BAD_GATEWAY,
            ),
            (
                FlowError::Signing(SigningError::signing("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = flow_error_response("acme", &err);
            assert_eq!(response.status(), expected, "for {err}");
        }
    }
}
