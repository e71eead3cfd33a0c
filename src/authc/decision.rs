//! Access decision policy.
//!
//! Pure function from the request classification, token presence and handler
//! configuration to the single action the filter takes for a denied request.

/// Message for AJAX calls to protected paths.
pub const MSG_REQUIRES_AUTHENTICATION: &str =
    "Attempting to access a path which requires authentication.";
/// Message for AJAX calls to the login path without an SSO token.
pub const MSG_UNAUTHENTICATION: &str = "Unauthentication.";

/// How the caller issued the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Ajax,
    Browser,
}

impl RequestKind {
    #[must_use]
    pub fn from_ajax(is_ajax: bool) -> Self {
        if is_ajax {
            Self::Ajax
        } else {
            Self::Browser
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub is_login_request: bool,
    pub kind: RequestKind,
}

/// The one terminal action taken for a denied request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    /// Attach the token and run the login.
    Authenticate,
    /// `401` with a JSON `message`.
    Unauthorized(&'static str),
    /// Save the request and redirect to the login page.
    RedirectToLogin,
    /// Hand the response to the handler interceptor. For browser requests a
    /// `true` from the hook clears SSO state and redirects to login.
    Delegate(RequestKind),
}

impl AccessDecision {
    /// Whether the framework continues processing after this decision is applied.
    ///
    /// Only [`AccessDecision::Authenticate`] defers to the login result.
    #[must_use]
    pub fn continues(self) -> Option<bool> {
        match self {
            Self::Authenticate => None,
            Self::Unauthorized(_) | Self::RedirectToLogin | Self::Delegate(_) => Some(false),
        }
    }
}

#[must_use]
pub fn decide(
    classification: Classification,
    token_present: bool,
    handler_configured: bool,
) -> AccessDecision {
    let Classification {
        is_login_request,
        kind,
    } = classification;

    if !is_login_request {
        return match kind {
            RequestKind::Ajax => AccessDecision::Unauthorized(MSG_REQUIRES_AUTHENTICATION),
            RequestKind::Browser => AccessDecision::RedirectToLogin,
        };
    }

    if token_present {
        return AccessDecision::Authenticate;
    }

    match (kind, handler_configured) {
        (kind, true) => AccessDecision::Delegate(kind),
        (RequestKind::Ajax, false) => AccessDecision::Unauthorized(MSG_UNAUTHENTICATION),
        (RequestKind::Browser, false) => AccessDecision::RedirectToLogin,
    }
}
