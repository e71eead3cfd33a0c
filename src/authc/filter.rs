//! Kisso authenticating filter.
//!
//! Flow Overview: requests that fail [`AccessControl::is_access_allowed`] land in
//! [`KissoAuthenticatingFilter::on_access_denied`]. The request is classified
//! (login path or not, AJAX or browser), the SSO token is looked up on the login
//! path, and [`decide`] picks exactly one terminal action which is then applied
//! to the exchange.

use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

use super::{
    decision::{decide, AccessDecision, Classification, RequestKind},
    handler::{HandlerInterceptor, DEFAULT_HANDLER},
    login::LoginSupport,
    realm::{LoginExecutor, PRINCIPAL_ATTR},
    token::KissoToken,
    AccessControl, AuthcError, Exchange, Principal, RequestContext,
};
use crate::sso::{SsoHelper, SSO_TOKEN_ATTR};
use crate::web::{is_ajax_request, write_json_string};

pub struct KissoAuthenticatingFilter {
    support: LoginSupport,
    sso: Arc<dyn SsoHelper>,
    login_executor: Arc<dyn LoginExecutor>,
    handler_interceptor: Option<Arc<dyn HandlerInterceptor>>,
}

impl KissoAuthenticatingFilter {
    #[must_use]
    pub fn new(
        support: LoginSupport,
        sso: Arc<dyn SsoHelper>,
        login_executor: Arc<dyn LoginExecutor>,
    ) -> Self {
        Self {
            support,
            sso,
            login_executor,
            handler_interceptor: None,
        }
    }

    #[must_use]
    pub fn with_handler_interceptor(mut self, handler: Arc<dyn HandlerInterceptor>) -> Self {
        self.handler_interceptor = Some(handler);
        self
    }

    /// Configured handler, or the built-in [`super::DefaultHandler`].
    #[must_use]
    pub fn handler_interceptor(&self) -> &dyn HandlerInterceptor {
        match &self.handler_interceptor {
            Some(handler) => handler.as_ref(),
            None => &DEFAULT_HANDLER,
        }
    }

    /// Replace the handler. Meant for configuration time, before the filter is shared.
    pub fn set_handler_interceptor(&mut self, handler: Arc<dyn HandlerInterceptor>) {
        self.handler_interceptor = Some(handler);
    }

    #[must_use]
    pub fn has_handler_interceptor(&self) -> bool {
        self.handler_interceptor.is_some()
    }

    #[must_use]
    pub fn login_support(&self) -> &LoginSupport {
        &self.support
    }

    #[must_use]
    pub fn classify(&self, request: &RequestContext) -> Classification {
        Classification {
            is_login_request: self.support.is_login_request(request),
            kind: RequestKind::from_ajax(is_ajax_request(request.headers())),
        }
    }

    /// Build the authentication token for this request.
    ///
    /// Form credentials play no part in SSO logins: `username` and `password` are
    /// ignored and the token wraps the caller's host and the SSO token attached
    /// to the request.
    #[must_use]
    pub fn create_token(
        &self,
        _username: &str,
        _password: &str,
        request: &RequestContext,
    ) -> KissoToken {
        KissoToken::new(self.support.host(request), self.sso.attr_token(request))
    }

    /// Create the token and hand it to the login executor.
    ///
    /// # Errors
    /// Propagates errors from the login executor.
    pub fn execute_login(&self, exchange: &mut Exchange) -> Result<bool, AuthcError> {
        let token = self.create_token("", "", exchange.request());
        self.login_executor.execute_login(exchange, token)
    }
}

impl AccessControl for KissoAuthenticatingFilter {
    /// Non-login requests that already carry a principal or a verified SSO token
    /// pass. The verified token is cached on the request.
    fn is_access_allowed(&self, exchange: &mut Exchange) -> bool {
        let request = exchange.request();
        if self.support.is_login_request(request) {
            return false;
        }
        if request.attributes().get::<Principal>(PRINCIPAL_ATTR).is_some() {
            return true;
        }
        match self.sso.sso_token(request) {
            Some(token) => {
                exchange
                    .request_mut()
                    .attributes_mut()
                    .set(SSO_TOKEN_ATTR, token);
                true
            }
            None => false,
        }
    }

    #[instrument(skip_all, fields(path = exchange.request().path()))]
    fn on_access_denied(&self, exchange: &mut Exchange) -> Result<bool, AuthcError> {
        let classification = self.classify(exchange.request());
        let token = if classification.is_login_request {
            self.sso.sso_token(exchange.request())
        } else {
            None
        };

        let decision = decide(
            classification,
            token.is_some(),
            self.has_handler_interceptor(),
        );
        trace!(?classification, ?decision, "access denied");

        match decision {
            AccessDecision::Unauthorized(message) => {
                trace!("{message}");
                write_json_string(exchange, StatusCode::UNAUTHORIZED, message)?;
                Ok(false)
            }
            AccessDecision::RedirectToLogin => {
                self.support.save_request_and_redirect_to_login(exchange)?;
                Ok(false)
            }
            AccessDecision::Delegate(RequestKind::Ajax) => {
                self.handler_interceptor()
                    .pre_token_is_null_ajax(exchange)?;
                Ok(false)
            }
            AccessDecision::Delegate(RequestKind::Browser) => {
                // The hook only decides whether to log out; processing stops either way.
                if self.handler_interceptor().pre_token_is_null(exchange) {
                    debug!("logout. request url: {}", exchange.request().request_url());
                    self.sso.clear_redirect_login(exchange)?;
                }
                Ok(false)
            }
            AccessDecision::Authenticate => {
                if let Some(token) = token {
                    exchange
                        .request_mut()
                        .attributes_mut()
                        .set(SSO_TOKEN_ATTR, token);
                }
                trace!("Login submission detected.  Attempting to execute login.");
                self.execute_login(exchange)
            }
        }
    }
}
