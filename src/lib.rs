//! # Kisso Authc (SSO authenticating filter)
//!
//! `kisso-authc` bridges a filter-chain access model with an external Kisso-style
//! single-sign-on service. A request that fails the access check is handed to
//! [`authc::KissoAuthenticatingFilter`], which decides between redirecting to the
//! login page, answering `401` with a JSON body, delegating to a pluggable handler,
//! or executing the login with the verified SSO token.
//!
//! ## Flow
//!
//! - **Protected paths:** AJAX callers get `401` JSON, browsers are redirected to
//!   the login URL with the original URL in `ReturnURL`.
//! - **Login path:** with a verified SSO token the token is attached to the request
//!   context and the login is executed; without one the handler interceptor (or the
//!   built-in fallback) decides the response.
//!
//! Token cryptography is not done here. Tokens are resolved through the
//! [`sso::SsoHelper`] and [`sso::TokenVerifier`] traits.

pub mod authc;
pub mod cli;
pub mod server;
pub mod sso;
pub mod web;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
