//! Per-request context passed through the filter call chain.
//!
//! An [`Exchange`] owns the request view, the request-scoped attribute bag and
//! the single response slot. Attributes live only as long as the exchange, so a
//! token stashed by one step is visible to the next step of the same request and
//! to nothing else.

use axum::{
    http::{request::Parts, HeaderMap, Method, Uri},
    response::Response,
};
use std::{any::Any, collections::HashMap, fmt, net::SocketAddr};

use super::error::AuthcError;

/// Request-scoped attribute bag keyed by well-known string constants.
#[derive(Default)]
pub struct Attributes {
    values: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl Attributes {
    pub fn set<T: Any + Send + Sync>(&mut self, key: &'static str, value: T) {
        self.values.insert(key, Box::new(value));
    }

    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|value| value.downcast_ref())
    }

    /// Remove the attribute, returning it only when it has the expected type.
    pub fn take<T: Any>(&mut self, key: &str) -> Option<T> {
        let value = self.values.remove(key)?;
        value.downcast::<T>().ok().map(|boxed| *boxed)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Read-only view of the inbound request plus its attributes.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    attributes: Attributes,
}

impl RequestContext {
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
            remote_addr: None,
            attributes: Attributes::default(),
        }
    }

    /// Snapshot the parts of an axum request.
    #[must_use]
    pub fn from_parts(parts: &Parts, remote_addr: Option<SocketAddr>) -> Self {
        Self::new(parts.method.clone(), parts.uri.clone(), parts.headers.clone())
            .with_remote_addr(remote_addr)
    }

    #[must_use]
    pub fn with_remote_addr(mut self, remote_addr: Option<SocketAddr>) -> Self {
        self.remote_addr = remote_addr;
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Full request URL as seen by the client, used for `ReturnURL`.
    ///
    /// Absolute-form URIs are returned as-is; origin-form URIs are prefixed with
    /// the `Host` header when present.
    #[must_use]
    pub fn request_url(&self) -> String {
        if self.uri.scheme().is_some() {
            return self.uri.to_string();
        }
        let path = self
            .uri
            .path_and_query()
            .map_or_else(|| self.uri.path().to_string(), ToString::to_string);
        let host = self
            .headers
            .get(axum::http::header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        match host {
            Some(host) => {
                let scheme = self
                    .headers
                    .get("x-forwarded-proto")
                    .and_then(|value| value.to_str().ok())
                    .filter(|proto| proto.eq_ignore_ascii_case("https"))
                    .map_or("http", |_| "https");
                format!("{scheme}://{host}{path}")
            }
            None => path,
        }
    }
}

/// One request/response exchange. At most one response can be committed.
#[derive(Debug)]
pub struct Exchange {
    request: RequestContext,
    response: Option<Response>,
}

impl Exchange {
    #[must_use]
    pub fn new(request: RequestContext) -> Self {
        Self {
            request,
            response: None,
        }
    }

    #[must_use]
    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut RequestContext {
        &mut self.request
    }

    /// Commit the terminal response for this request.
    ///
    /// # Errors
    /// Returns [`AuthcError::ResponseCommitted`] if a response was already committed.
    pub fn commit(&mut self, response: Response) -> Result<(), AuthcError> {
        if self.response.is_some() {
            return Err(AuthcError::ResponseCommitted);
        }
        self.response = Some(response);
        Ok(())
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.response.is_some()
    }

    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// Split into the request context and the committed response, if any.
    #[must_use]
    pub fn into_parts(self) -> (RequestContext, Option<Response>) {
        (self.request, self.response)
    }
}
