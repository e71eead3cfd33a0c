//! SSO collaborator: token lookup, request-attribute cache, and logout redirect.

mod cookie;
mod registry;
mod token;

pub use cookie::{CookieSsoHelper, SsoConfig};
pub use registry::TokenRegistry;
pub use token::SsoToken;
pub(crate) use token::unix_now;

use secrecy::SecretString;

use crate::authc::{AuthcError, Exchange, RequestContext};

/// Request attribute holding the verified [`SsoToken`] for one request.
pub const SSO_TOKEN_ATTR: &str = "kissoTokenAttr";

/// Verifies a raw token presented by the client.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, raw: &SecretString) -> Option<SsoToken>;
}

/// Operations the filter needs from the SSO service.
pub trait SsoHelper: Send + Sync {
    /// Return the verified token bound to this request, if any.
    fn sso_token(&self, request: &RequestContext) -> Option<SsoToken>;

    /// Read the token already attached to the request, without verifying again.
    fn attr_token(&self, request: &RequestContext) -> Option<SsoToken> {
        request.attributes().get::<SsoToken>(SSO_TOKEN_ATTR).cloned()
    }

    /// Clear SSO client state and redirect to the login page.
    ///
    /// # Errors
    /// Returns an error if the redirect response cannot be committed.
    fn clear_redirect_login(&self, exchange: &mut Exchange) -> Result<(), AuthcError>;
}
