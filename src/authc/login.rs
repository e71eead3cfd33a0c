//! Login URL handling shared by the filter and the login executor.
//!
//! Covers matching the login endpoint, saving the original request, redirecting
//! to the login page, and picking the redirect after a successful login.

use axum::http::header::HOST;
use tracing::debug;
use url::Url;

use super::{path::PathPattern, AuthcError, Exchange, RequestContext};
use crate::web::{client_host, login_redirect_url, redirect};

/// Request attribute holding the URL saved before redirecting to login.
pub const SAVED_REQUEST_ATTR: &str = "shiroSavedRequest";

const DEFAULT_SUCCESS_URL: &str = "/";
const DEFAULT_RETURN_URL_PARAM: &str = "ReturnURL";

#[derive(Clone, Debug)]
pub struct LoginSupport {
    login_url: String,
    login_pattern: PathPattern,
    success_url: String,
    return_url_param: String,
}

impl LoginSupport {
    /// The login pattern defaults to the path component of `login_url`.
    #[must_use]
    pub fn new(login_url: String) -> Self {
        let login_pattern = PathPattern::new(&login_path(&login_url));
        Self {
            login_url,
            login_pattern,
            success_url: DEFAULT_SUCCESS_URL.to_string(),
            return_url_param: DEFAULT_RETURN_URL_PARAM.to_string(),
        }
    }

    /// Match login requests with an ant-style pattern instead of the login URL path.
    #[must_use]
    pub fn with_login_pattern(mut self, pattern: &str) -> Self {
        self.login_pattern = PathPattern::new(pattern);
        self
    }

    #[must_use]
    pub fn with_success_url(mut self, success_url: String) -> Self {
        self.success_url = success_url;
        self
    }

    #[must_use]
    pub fn with_return_url_param(mut self, param: String) -> Self {
        self.return_url_param = param;
        self
    }

    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Path component of the login URL.
    #[must_use]
    pub fn login_path(&self) -> String {
        login_path(&self.login_url)
    }

    #[must_use]
    pub fn success_url(&self) -> &str {
        &self.success_url
    }

    #[must_use]
    pub fn is_login_request(&self, request: &RequestContext) -> bool {
        self.is_login_path(request.path())
    }

    #[must_use]
    pub fn is_login_path(&self, path: &str) -> bool {
        self.login_pattern.matches(path)
    }

    /// Host the authentication token is bound to.
    #[must_use]
    pub fn host(&self, request: &RequestContext) -> Option<String> {
        client_host(request)
    }

    /// Remember the original URL for the rest of this request.
    pub fn save_request(&self, exchange: &mut Exchange) {
        let url = exchange.request().request_url();
        exchange
            .request_mut()
            .attributes_mut()
            .set(SAVED_REQUEST_ATTR, url);
    }

    /// Redirect to the login page, carrying the saved URL as `ReturnURL`.
    ///
    /// # Errors
    /// Returns an error if the redirect cannot be committed.
    pub fn redirect_to_login(&self, exchange: &mut Exchange) -> Result<(), AuthcError> {
        let saved = exchange
            .request()
            .attributes()
            .get::<String>(SAVED_REQUEST_ATTR)
            .cloned();
        let location = login_redirect_url(&self.login_url, &self.return_url_param, saved.as_deref());
        debug!("redirect to login: {location}");
        redirect(exchange, &location)
    }

    /// # Errors
    /// Returns an error if the redirect cannot be committed.
    pub fn save_request_and_redirect_to_login(
        &self,
        exchange: &mut Exchange,
    ) -> Result<(), AuthcError> {
        self.save_request(exchange);
        self.redirect_to_login(exchange)
    }

    /// Where to send a browser after a successful login: the `ReturnURL` of the
    /// login request when it stays on this host, otherwise the success URL.
    #[must_use]
    pub fn success_redirect_url(&self, request: &RequestContext) -> String {
        request
            .uri()
            .query()
            .and_then(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .find(|(key, _)| key == self.return_url_param.as_str())
                    .map(|(_, value)| value.into_owned())
            })
            .filter(|target| is_same_origin(request, target))
            .unwrap_or_else(|| self.success_url.clone())
    }
}

fn login_path(login_url: &str) -> String {
    match Url::parse(login_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => login_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

fn is_same_origin(request: &RequestContext, target: &str) -> bool {
    // Browsers fold `\` into `/` and drop tabs and newlines, turning `/\host` into `//host`.
    if target.starts_with("//")
        || target
            .chars()
            .any(|c| c == '\\' || c.is_control() || c.is_whitespace())
    {
        return false;
    }
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if host.is_none() && !target.starts_with('/') {
        return false;
    }
    let Ok(base) = Url::parse(&format!("http://{}/", host.unwrap_or("localhost"))) else {
        return false;
    };
    let Ok(resolved) = base.join(target) else {
        return false;
    };
    matches!(resolved.scheme(), "http" | "https") && authority(&resolved) == authority(&base)
}

fn authority(url: &Url) -> Option<String> {
    url.host_str().map(|host| match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{
        header::LOCATION, HeaderMap, HeaderValue, Method, StatusCode, Uri,
    };

    fn request(uri: &'static str) -> RequestContext {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("app.example.com"));
        RequestContext::new(Method::GET, Uri::from_static(uri), headers)
    }

    #[test]
    fn login_pattern_from_relative_url() {
        let support = LoginSupport::new("/login?lang=en".to_string());
        assert!(support.is_login_request(&request("/login")));
        assert!(!support.is_login_request(&request("/orders")));
    }

    #[test]
    fn login_pattern_from_absolute_url() {
        let support = LoginSupport::new("https://sso.example.com/sso/login".to_string());
        assert!(support.is_login_request(&request("/sso/login")));
    }

    #[test]
    fn login_path_strips_origin_and_query() {
        let support = LoginSupport::new("https://sso.example.com/sso/login?lang=en".to_string());
        assert_eq!(support.login_path(), "/sso/login");
        assert_eq!(LoginSupport::new("/login#top".to_string()).login_path(), "/login");
    }

    #[test]
    fn login_pattern_override() {
        let support = LoginSupport::new("/login".to_string()).with_login_pattern("/auth/**");
        assert!(support.is_login_request(&request("/auth/sso")));
        assert!(!support.is_login_request(&request("/login")));
    }

    #[test]
    fn save_request_and_redirect_to_login_carries_return_url() {
        let support = LoginSupport::new("/login".to_string());
        let mut exchange = Exchange::new(request("/orders?page=2"));
        assert!(support.save_request_and_redirect_to_login(&mut exchange).is_ok());

        assert_eq!(
            exchange
                .request()
                .attributes()
                .get::<String>(SAVED_REQUEST_ATTR)
                .map(String::as_str),
            Some("http://app.example.com/orders?page=2")
        );
        let response = exchange.response();
        assert_eq!(response.map(|r| r.status()), Some(StatusCode::FOUND));
        assert_eq!(
            response
                .and_then(|r| r.headers().get(LOCATION))
                .and_then(|v| v.to_str().ok()),
            Some("/login?ReturnURL=http%3A%2F%2Fapp.example.com%2Forders%3Fpage%3D2")
        );
    }

    #[test]
    fn success_redirect_prefers_same_origin_return_url() {
        let support = LoginSupport::new("/login".to_string()).with_success_url("/home".to_string());
        assert_eq!(
            support.success_redirect_url(&request(
                "/login?ReturnURL=http%3A%2F%2Fapp.example.com%2Forders"
            )),
            "http://app.example.com/orders"
        );
        assert_eq!(
            support.success_redirect_url(&request("/login?ReturnURL=%2Forders")),
            "/orders"
        );
        assert_eq!(support.success_redirect_url(&request("/login")), "/home");
    }

    #[test]
    fn success_redirect_rejects_foreign_return_url() {
        let support = LoginSupport::new("/login".to_string()).with_success_url("/home".to_string());
        assert_eq!(
            support.success_redirect_url(&request("/login?ReturnURL=https%3A%2F%2Fevil.test%2F")),
            "/home"
        );
        assert_eq!(
            support.success_redirect_url(&request("/login?ReturnURL=%2F%2Fevil.test")),
            "/home"
        );
        assert_eq!(
            support.success_redirect_url(&request("/login?ReturnURL=%2F%5Cevil.test")),
            "/home"
        );
        assert_eq!(
            support.success_redirect_url(&request("/login?ReturnURL=%2F%09%2Fevil.test")),
            "/home"
        );
        assert_eq!(
            support.success_redirect_url(&request("/login?ReturnURL=%2F%0A%2Fevil.test")),
            "/home"
        );
        assert_eq!(
            support.success_redirect_url(&request("/login?ReturnURL=javascript%3Aalert(1)")),
            "/home"
        );
        assert_eq!(
            support.success_redirect_url(&request(
                "/login?ReturnURL=https%3A%2F%2Fapp.example.com.evil.test%2F"
            )),
            "/home"
        );
    }

    #[test]
    fn success_redirect_accepts_same_host_absolute_url() {
        let support = LoginSupport::new("/login".to_string()).with_success_url("/home".to_string());
        assert_eq!(
            support.success_redirect_url(&request(
                "/login?ReturnURL=https%3A%2F%2Fapp.example.com%2Forders%3Fpage%3D2"
            )),
            "https://app.example.com/orders?page=2"
        );
        assert_eq!(
            support.success_redirect_url(&request("/login?ReturnURL=%2Fa%2F..%2Fb")),
            "/a/../b"
        );
    }
}
