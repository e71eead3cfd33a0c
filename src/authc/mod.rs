//! SSO authenticating filter and its collaborators.
//!
//! ## Access control
//!
//! The host calls [`AccessControl::on_pre_handle`] once per request. Allowed
//! requests continue; denied requests go through
//! [`KissoAuthenticatingFilter::on_access_denied`], which commits at most one
//! response to the [`Exchange`].
//!
//! ## Request attributes
//!
//! | key | type | set by |
//! |---|---|---|
//! | [`crate::sso::SSO_TOKEN_ATTR`] | [`crate::sso::SsoToken`] | filter, before login |
//! | [`SAVED_REQUEST_ATTR`] | `String` | redirect to login |
//! | [`PRINCIPAL_ATTR`] | [`Principal`] | successful login |
//! | [`LOGIN_FAILURE_ATTR`] | [`LoginFailure`] | failed browser login |

mod decision;
mod error;
mod exchange;
mod filter;
mod handler;
mod layer;
mod login;
mod path;
mod realm;
mod token;

pub use decision::{
    decide, AccessDecision, Classification, RequestKind, MSG_REQUIRES_AUTHENTICATION,
    MSG_UNAUTHENTICATION,
};
pub use error::{AuthcError, AuthenticationError};
pub use exchange::{Attributes, Exchange, RequestContext};
pub use filter::KissoAuthenticatingFilter;
pub use handler::{DefaultHandler, HandlerInterceptor, DEFAULT_HANDLER};
pub use layer::require_sso;
pub use login::{LoginSupport, SAVED_REQUEST_ATTR};
pub use path::PathPattern;
pub use realm::{
    LoginExecutor, LoginFailure, Principal, Realm, RealmLoginExecutor, SsoRealm,
    LOGIN_FAILURE_ATTR, PRINCIPAL_ATTR,
};
pub use token::KissoToken;

/// Narrow interface the filter chain invokes for each request.
pub trait AccessControl: Send + Sync {
    fn is_access_allowed(&self, exchange: &mut Exchange) -> bool;

    /// Handle a request that failed [`AccessControl::is_access_allowed`].
    /// Returns `true` to continue processing, `false` when a response was committed.
    ///
    /// # Errors
    /// Returns an error if the response could not be produced.
    fn on_access_denied(&self, exchange: &mut Exchange) -> Result<bool, AuthcError>;

    /// # Errors
    /// Propagates errors from [`AccessControl::on_access_denied`].
    fn on_pre_handle(&self, exchange: &mut Exchange) -> Result<bool, AuthcError> {
        if self.is_access_allowed(exchange) {
            return Ok(true);
        }
        self.on_access_denied(exchange)
    }
}
