use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Serialize;
use serde_json::json;

use crate::{
    authc::{LoginFailure, Principal},
    sso::SsoToken,
    GIT_COMMIT_HASH,
};

// axum handler for health
pub async fn health() -> impl IntoResponse {
    let body = Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "build": GIT_COMMIT_HASH,
    }));

    let short_hash = GIT_COMMIT_HASH.get(0..7).unwrap_or("");

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )) {
        headers.insert("X-App", value);
    }

    (headers, body)
}

pub async fn root(token: Option<Extension<SsoToken>>) -> impl IntoResponse {
    let id = token.as_ref().map_or("anonymous", |Extension(token)| token.id());
    Json(json!({ "message": format!("Hello, {id}") }))
}

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<SsoToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
}

pub async fn whoami(
    token: Option<Extension<SsoToken>>,
    principal: Option<Extension<Principal>>,
) -> impl IntoResponse {
    Json(WhoAmI {
        token: token.map(|Extension(token)| token),
        principal: principal.map(|Extension(principal)| principal),
    })
}

const MSG_SIGN_IN: &str = "Sign in through the SSO service.";

pub async fn login_page() -> impl IntoResponse {
    Json(json!({ "message": MSG_SIGN_IN }))
}

/// Behind the filter: a request gets here only after a failed browser login.
pub async fn login_callback(failure: Option<Extension<LoginFailure>>) -> impl IntoResponse {
    match failure {
        Some(Extension(LoginFailure(message))) => {
            (StatusCode::UNAUTHORIZED, Json(json!({ "message": message })))
        }
        None => (StatusCode::OK, Json(json!({ "message": MSG_SIGN_IN }))),
    }
}
