//! Cookie based SSO helper.
//!
//! Lookup order: request attribute (already verified this request), SSO cookie,
//! then the access-token header used by API clients. The raw value is verified
//! through a [`TokenVerifier`]; with `check_ip` the token must have been issued
//! to the caller's address.

use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{SsoHelper, SsoToken, TokenVerifier};
use crate::authc::{AuthcError, Exchange, RequestContext};
use crate::web::{client_host, cookie_value, login_redirect_url, redirect_with_cookie};

const DEFAULT_COOKIE_NAME: &str = "uid";
const DEFAULT_ACCESS_TOKEN_HEADER: &str = "accesstoken";
const DEFAULT_RETURN_URL_PARAM: &str = "ReturnURL";
const DEFAULT_LOGIN_URL: &str = "/login";

#[derive(Clone, Debug)]
pub struct SsoConfig {
    login_url: String,
    cookie_name: String,
    cookie_domain: Option<String>,
    cookie_path: String,
    cookie_secure: bool,
    access_token_header: String,
    return_url_param: String,
    check_ip: bool,
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_URL.to_string())
    }
}

impl SsoConfig {
    #[must_use]
    pub fn new(login_url: String) -> Self {
        Self {
            login_url,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_domain: None,
            cookie_path: "/".to_string(),
            cookie_secure: false,
            access_token_header: DEFAULT_ACCESS_TOKEN_HEADER.to_string(),
            return_url_param: DEFAULT_RETURN_URL_PARAM.to_string(),
            check_ip: false,
        }
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: String) -> Self {
        self.cookie_name = name;
        self
    }

    #[must_use]
    pub fn with_cookie_domain(mut self, domain: Option<String>) -> Self {
        self.cookie_domain = domain;
        self
    }

    #[must_use]
    pub fn with_cookie_path(mut self, path: String) -> Self {
        self.cookie_path = path;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_access_token_header(mut self, header: String) -> Self {
        self.access_token_header = header.to_ascii_lowercase();
        self
    }

    #[must_use]
    pub fn with_return_url_param(mut self, param: String) -> Self {
        self.return_url_param = param;
        self
    }

    #[must_use]
    pub fn with_check_ip(mut self, check_ip: bool) -> Self {
        self.check_ip = check_ip;
        self
    }

    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn return_url_param(&self) -> &str {
        &self.return_url_param
    }

    #[must_use]
    pub fn check_ip(&self) -> bool {
        self.check_ip
    }

    /// `Set-Cookie` value that expires the SSO cookie.
    #[must_use]
    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Path={}; HttpOnly; Max-Age=0",
            self.cookie_name, self.cookie_path
        );
        if let Some(domain) = &self.cookie_domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

pub struct CookieSsoHelper {
    config: SsoConfig,
    verifier: Arc<dyn TokenVerifier>,
}

impl CookieSsoHelper {
    #[must_use]
    pub fn new(config: SsoConfig, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { config, verifier }
    }

    #[must_use]
    pub fn config(&self) -> &SsoConfig {
        &self.config
    }

    fn raw_token(&self, request: &RequestContext) -> Option<SecretString> {
        cookie_value(request.headers(), &self.config.cookie_name)
            .or_else(|| {
                request
                    .headers()
                    .get(self.config.access_token_header.as_str())
                    .and_then(|value| value.to_str().ok())
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
            })
            .map(SecretString::from)
    }
}

impl std::fmt::Debug for CookieSsoHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSsoHelper")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SsoHelper for CookieSsoHelper {
    #[instrument(skip_all, fields(path = request.path()))]
    fn sso_token(&self, request: &RequestContext) -> Option<SsoToken> {
        if let Some(token) = self.attr_token(request) {
            return Some(token);
        }

        let raw = self.raw_token(request)?;
        let Some(token) = self.verifier.verify(&raw) else {
            debug!("SSO token rejected by verifier");
            return None;
        };

        if self.config.check_ip {
            let host = client_host(request);
            if token.ip() != host.as_deref() {
                debug!(
                    "SSO token ip mismatch: token={:?} client={:?}",
                    token.ip(),
                    host
                );
                return None;
            }
        }

        Some(token)
    }

    fn clear_redirect_login(&self, exchange: &mut Exchange) -> Result<(), AuthcError> {
        let return_to = exchange.request().request_url();
        let location = login_redirect_url(
            &self.config.login_url,
            &self.config.return_url_param,
            Some(&return_to),
        );
        debug!("logout, redirect to {location}");
        redirect_with_cookie(exchange, &location, Some(&self.config.clear_cookie()))
    }
}
