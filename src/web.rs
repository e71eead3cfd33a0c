//! Small HTTP helpers shared by the filter and the SSO helper.

use axum::{
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json},
};
use serde::Serialize;
use url::form_urlencoded;

use crate::authc::{AuthcError, Exchange, RequestContext};

const X_REQUESTED_WITH: &str = "x-requested-with";
const XML_HTTP_REQUEST: &str = "XMLHttpRequest";

/// JSON body written for every message-only response.
#[derive(Debug, Serialize)]
pub struct MessageBody<'a> {
    pub message: &'a str,
}

/// AJAX requests announce themselves with `X-Requested-With: XMLHttpRequest`.
#[must_use]
pub fn is_ajax_request(headers: &HeaderMap) -> bool {
    headers
        .get(X_REQUESTED_WITH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case(XML_HTTP_REQUEST))
}

/// Commit a `{"message": ...}` JSON response with the given status.
///
/// # Errors
/// Returns an error if the exchange already holds a response.
pub fn write_json_string(
    exchange: &mut Exchange,
    status: StatusCode,
    message: &str,
) -> Result<(), AuthcError> {
    exchange.commit((status, Json(MessageBody { message })).into_response())
}

/// Commit a `302 Found` redirect.
///
/// # Errors
/// Returns an error if the location is not a valid header value or the exchange
/// already holds a response.
pub fn redirect(exchange: &mut Exchange, location: &str) -> Result<(), AuthcError> {
    redirect_with_cookie(exchange, location, None)
}

/// Commit a `302 Found` redirect that also sets a cookie.
///
/// # Errors
/// Returns an error if a header value is invalid or the exchange already holds a
/// response.
pub fn redirect_with_cookie(
    exchange: &mut Exchange,
    location: &str,
    cookie: Option<&str>,
) -> Result<(), AuthcError> {
    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, HeaderValue::from_str(location)?);
    if let Some(cookie) = cookie {
        headers.insert(SET_COOKIE, HeaderValue::from_str(cookie)?);
    }
    exchange.commit((StatusCode::FOUND, headers).into_response())
}

/// Append `param=return_to` to the login URL, keeping any existing query.
#[must_use]
pub fn login_redirect_url(login_url: &str, param: &str, return_to: Option<&str>) -> String {
    let Some(return_to) = return_to.filter(|value| !value.is_empty()) else {
        return login_url.to_string();
    };
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(param, return_to)
        .finish();
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!("{login_url}{separator}{query}")
}

/// Resolve the caller's host: proxy headers first, then the peer address.
#[must_use]
pub fn client_host(request: &RequestContext) -> Option<String> {
    let headers = request.headers();
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(forwarded) = forwarded {
        return Some(forwarded.to_string());
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| request.remote_addr().map(|addr| addr.ip().to_string()))
}

/// Extract a cookie value by name from the `Cookie` header.
#[must_use]
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(axum::http::header::COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == name && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}
