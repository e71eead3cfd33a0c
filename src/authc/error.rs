use axum::{
    http::{header::InvalidHeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors raised while a filter is producing a response.
///
/// Missing or invalid SSO tokens are not errors; they are regular branches of
/// the access decision.
#[derive(Debug, Error)]
pub enum AuthcError {
    #[error("response already committed for this request")]
    ResponseCommitted,
    #[error("invalid header value")]
    InvalidHeader(#[from] InvalidHeaderValue),
    #[error("invalid redirect url: {0}")]
    InvalidRedirect(String),
}

impl IntoResponse for AuthcError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "message": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Failures reported by a [`super::Realm`] while authenticating a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    #[error("no SSO token bound to the request")]
    MissingToken,
    #[error("SSO token expired")]
    Expired,
    #[error("SSO token rejected: {0}")]
    Rejected(String),
}
