//! Pluggable response strategy for login requests that carry no SSO token.

use axum::http::StatusCode;

use super::{decision::MSG_UNAUTHENTICATION, AuthcError, Exchange};
use crate::web::write_json_string;

pub trait HandlerInterceptor: Send + Sync {
    /// AJAX request without a token. Expected to commit the response.
    ///
    /// # Errors
    /// Returns an error if the response cannot be committed.
    fn pre_token_is_null_ajax(&self, exchange: &mut Exchange) -> Result<(), AuthcError>;

    /// Browser request without a token. Returning `true` clears SSO state and
    /// redirects to the login page.
    fn pre_token_is_null(&self, exchange: &mut Exchange) -> bool;
}

/// Built-in strategy: `401` JSON for AJAX, logout-and-redirect for browsers.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHandler;

pub static DEFAULT_HANDLER: DefaultHandler = DefaultHandler;

impl HandlerInterceptor for DefaultHandler {
    fn pre_token_is_null_ajax(&self, exchange: &mut Exchange) -> Result<(), AuthcError> {
        write_json_string(exchange, StatusCode::UNAUTHORIZED, MSG_UNAUTHENTICATION)
    }

    fn pre_token_is_null(&self, _exchange: &mut Exchange) -> bool {
        true
    }
}
