//! Login execution: authenticate the [`KissoToken`] against a realm and apply
//! the standard success and failure responses.

use axum::http::StatusCode;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument};

use super::{
    error::AuthenticationError, login::LoginSupport, token::KissoToken, AuthcError, Exchange,
};
use crate::sso::SsoToken;
use crate::web::{is_ajax_request, redirect, write_json_string};

/// Request attribute holding the authenticated [`Principal`].
pub const PRINCIPAL_ATTR: &str = "kissoPrincipal";
/// Request attribute holding the [`LoginFailure`] of a browser login.
pub const LOGIN_FAILURE_ATTR: &str = "shiroLoginFailure";

const MSG_LOGIN_SUCCEEDED: &str = "Authentication succeeded.";

/// Authenticated caller derived from the SSO token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Failure message left for the login page handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginFailure(pub String);

pub trait Realm: Send + Sync {
    /// # Errors
    /// Returns an [`AuthenticationError`] when the token is not acceptable.
    fn authenticate(&self, token: &KissoToken) -> Result<Principal, AuthenticationError>;
}

/// Accepts any verified SSO token, optionally bounded by token age.
#[derive(Clone, Debug, Default)]
pub struct SsoRealm {
    max_age: Option<Duration>,
}

impl SsoRealm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }
}

impl Realm for SsoRealm {
    fn authenticate(&self, token: &KissoToken) -> Result<Principal, AuthenticationError> {
        let sso_token = token.sso_token().ok_or(AuthenticationError::MissingToken)?;

        if let Some(max_age) = self.max_age.filter(|_| sso_token.time() > 0) {
            let age = crate::sso::unix_now().saturating_sub(sso_token.time());
            if u64::try_from(age).is_ok_and(|age| age > max_age.as_secs()) {
                return Err(AuthenticationError::Expired);
            }
        }

        Ok(principal(sso_token, token.host()))
    }
}

fn principal(sso_token: &SsoToken, host: Option<&str>) -> Principal {
    Principal {
        id: sso_token.id().to_string(),
        issuer: sso_token.issuer().map(str::to_string),
        host: host.map(str::to_string),
    }
}

/// Framework side of `execute_login`: authenticates a token and writes the
/// outcome. Returns whether request processing continues.
pub trait LoginExecutor: Send + Sync {
    /// # Errors
    /// Returns an error if the outcome response cannot be committed.
    fn execute_login(&self, exchange: &mut Exchange, token: KissoToken)
        -> Result<bool, AuthcError>;
}

/// Standard login execution backed by a [`Realm`].
///
/// - success: principal attached; AJAX gets `200` JSON, browsers are redirected
///   to the return URL or success URL. Processing stops.
/// - failure: AJAX gets `401` JSON with the failure message and processing stops;
///   browsers get a [`LoginFailure`] attribute and processing continues so the
///   login page can show it.
pub struct RealmLoginExecutor {
    realm: Arc<dyn Realm>,
    support: LoginSupport,
}

impl RealmLoginExecutor {
    #[must_use]
    pub fn new(realm: Arc<dyn Realm>, support: LoginSupport) -> Self {
        Self { realm, support }
    }
}

impl LoginExecutor for RealmLoginExecutor {
    #[instrument(skip_all, fields(principal = token.principal()))]
    fn execute_login(
        &self,
        exchange: &mut Exchange,
        token: KissoToken,
    ) -> Result<bool, AuthcError> {
        let is_ajax = is_ajax_request(exchange.request().headers());

        match self.realm.authenticate(&token) {
            Ok(principal) => {
                debug!("login succeeded for {}", principal.id);
                exchange
                    .request_mut()
                    .attributes_mut()
                    .set(PRINCIPAL_ATTR, principal);
                if is_ajax {
                    write_json_string(exchange, StatusCode::OK, MSG_LOGIN_SUCCEEDED)?;
                } else {
                    let location = self.support.success_redirect_url(exchange.request());
                    redirect(exchange, &location)?;
                }
                Ok(false)
            }
            Err(err) => {
                debug!("login failed: {err}");
                let message = err.to_string();
                if is_ajax {
                    write_json_string(exchange, StatusCode::UNAUTHORIZED, &message)?;
                    return Ok(false);
                }
                exchange
                    .request_mut()
                    .attributes_mut()
                    .set(LOGIN_FAILURE_ATTR, LoginFailure(message));
                Ok(true)
            }
        }
    }
}
