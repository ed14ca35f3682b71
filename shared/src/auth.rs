use aws_sdk_cognitoidentityprovider::error::DisplayErrorContext;
use aws_sdk_cognitoidentityprovider::types::AttributeType;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use lambda_http::http::header::{AUTHORIZATION, COOKIE};
use lambda_http::http::{HeaderMap, StatusCode};
use lambda_http::{Body, Error, Response};
use serde::Deserialize;
use url::Url;

use crate::config::{AppConfig, CognitoSettings};
use tarefas_atoms::http;
use tarefas_atoms::session::{Session, SessionUser};

pub const ACCESS_TOKEN_COOKIE: &str = "tarefas_access_token";
/// Holds the `state` sent to the hosted UI until the callback comes back.
pub const OAUTH_STATE_COOKIE: &str = "tarefas_oauth_state";
pub const OAUTH_STATE_SECONDS: i64 = 600;
pub const DEFAULT_SESSION_SECONDS: i64 = 3600;
pub const AFTER_SIGNIN_ROUTE: &str = "/dashboard";

pub fn session_cookie(name: &str, value: &str, max_age: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age={}",
        name, value, max_age
    )
}

pub fn clear_cookie(name: &str) -> String {
    format!(
        "{}=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        name
    )
}

/// Value of cookie `name` across every `Cookie` header.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Access token from `Authorization: Bearer` or the session cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    bearer.or_else(|| cookie_value(headers, ACCESS_TOKEN_COOKIE))
}

pub fn session_from_attributes(attributes: &[AttributeType]) -> Session {
    let mut user = SessionUser::default();
    for attr in attributes {
        let value = attr.value().map(|v| v.to_string());
        match attr.name() {
            "email" => user.email = value,
            "name" => user.name = value,
            "picture" => user.image = value,
            _ => {}
        }
    }
    Session::signed_in(user)
}

/// Resolve the visitor's session from the request headers.
///
/// No token, an unknown provider, or a token the provider rejects all give an
/// anonymous session; reading public pages must keep working.
pub async fn resolve_session(cognito: Option<&CognitoClient>, headers: &HeaderMap) -> Session {
    let (Some(client), Some(token)) = (cognito, access_token(headers)) else {
        return Session::anonymous();
    };

    match client.get_user().access_token(token).send().await {
        Ok(output) => session_from_attributes(output.user_attributes()),
        Err(e) => {
            tracing::info!("Session token rejected: {}", DisplayErrorContext(&e));
            Session::anonymous()
        }
    }
}

/// Hosted UI name of a federated provider.
pub fn identity_provider(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        "google" => Some("Google"),
        "facebook" => Some("Facebook"),
        "apple" => Some("SignInWithApple"),
        "amazon" => Some("LoginWithAmazon"),
        "cognito" => Some("COGNITO"),
        _ => None,
    }
}

pub fn signin_url(settings: &CognitoSettings, provider: &str, state: &str) -> Option<Url> {
    let identity_provider = identity_provider(provider)?;
    let mut url = settings.domain.join("/oauth2/authorize").ok()?;
    url.query_pairs_mut()
        .append_pair("identity_provider", identity_provider)
        .append_pair("client_id", &settings.client_id)
        .append_pair("response_type", "code")
        .append_pair("scope", "openid email profile")
        .append_pair("redirect_uri", &settings.redirect_uri)
        .append_pair("state", state);
    Some(url)
}

pub fn new_oauth_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// The callback's `state` must echo the one this browser was given at sign-in.
pub fn state_matches(headers: &HeaderMap, returned: Option<&str>) -> bool {
    match (cookie_value(headers, OAUTH_STATE_COOKIE), returned) {
        (Some(expected), Some(returned)) => !returned.is_empty() && expected == returned,
        _ => false,
    }
}

fn found(location: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::FOUND)
        .header("Location", location)
        .body(Body::Empty)
        .map_err(Box::new)?)
}

/// GET /auth/signin/{provider}
pub fn signin(config: &AppConfig, provider: &str) -> Result<Response<Body>, Error> {
    let Some(settings) = &config.cognito else {
        tracing::warn!("Sign-in requested but no identity provider is configured");
        return http::error(StatusCode::SERVICE_UNAVAILABLE, "Sign-in is not configured");
    };

    let state = new_oauth_state();
    let Some(url) = signin_url(settings, provider, &state) else {
        return http::error(StatusCode::NOT_FOUND, "Unknown sign-in provider");
    };

    Ok(Response::builder()
        .status(StatusCode::FOUND)
        .header("Location", url.as_str())
        .header(
            "Set-Cookie",
            session_cookie(OAUTH_STATE_COOKIE, &state, OAUTH_STATE_SECONDS),
        )
        .body(Body::Empty)
        .map_err(Box::new)?)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// GET /auth/callback?code=...&state=...
///
/// Trades the authorization code for tokens and stores the access token in
/// the session cookie. A callback whose `state` does not match the sign-in
/// cookie is refused before any token exchange.
pub async fn callback(
    http_client: &reqwest::Client,
    config: &AppConfig,
    headers: &HeaderMap,
    code: Option<&str>,
    state: Option<&str>,
) -> Result<Response<Body>, Error> {
    let Some(settings) = &config.cognito else {
        return http::error(StatusCode::SERVICE_UNAVAILABLE, "Sign-in is not configured");
    };
    if !state_matches(headers, state) {
        tracing::warn!("Sign-in callback with a missing or mismatched state");
        return Ok(Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header("Content-Type", "application/json")
            .header("Set-Cookie", clear_cookie(OAUTH_STATE_COOKIE))
            .body(serde_json::json!({"error": "Invalid sign-in state"}).to_string().into())
            .map_err(Box::new)?);
    }
    let Some(code) = code.filter(|c| !c.is_empty()) else {
        return http::error(StatusCode::BAD_REQUEST, "Missing authorization code");
    };

    let token_url = settings.domain.join("/oauth2/token")?;
    let mut request = http_client.post(token_url).form(&[
        ("grant_type", "authorization_code"),
        ("client_id", settings.client_id.as_str()),
        ("code", code),
        ("redirect_uri", settings.redirect_uri.as_str()),
    ]);
    if let Some(secret) = &settings.client_secret {
        request = request.basic_auth(&settings.client_id, Some(secret));
    }

    let tokens: TokenResponse = match request.send().await.and_then(|r| r.error_for_status()) {
        Ok(resp) => resp.json().await?,
        Err(e) => {
            tracing::error!("Token exchange failed: {}", e);
            return found("/");
        }
    };

    tracing::info!("Signed in");
    let max_age = tokens.expires_in.unwrap_or(DEFAULT_SESSION_SECONDS);
    Ok(Response::builder()
        .status(StatusCode::FOUND)
        .header("Location", AFTER_SIGNIN_ROUTE)
        .header(
            "Set-Cookie",
            session_cookie(ACCESS_TOKEN_COOKIE, &tokens.access_token, max_age),
        )
        .header("Set-Cookie", clear_cookie(OAUTH_STATE_COOKIE))
        .body(Body::Empty)
        .map_err(Box::new)?)
}

/// POST /auth/signout
pub fn signout() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Set-Cookie", clear_cookie(ACCESS_TOKEN_COOKIE))
        .body(serde_json::json!({"message": "ok"}).to_string().into())
        .map_err(Box::new)?)
}
