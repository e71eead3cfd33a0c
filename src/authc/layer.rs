//! axum middleware running an [`AccessControl`] in front of the routes.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Extensions, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, warn};

use super::{
    realm::{LoginFailure, Principal, LOGIN_FAILURE_ATTR, PRINCIPAL_ATTR},
    AccessControl, Attributes, Exchange, RequestContext,
};
use crate::sso::{SsoToken, SSO_TOKEN_ATTR};

/// Use with `axum::middleware::from_fn_with_state`.
///
/// When processing continues, the verified token, principal and login failure
/// are moved from the exchange attributes into the request extensions.
pub async fn require_sso(
    State(filter): State<Arc<dyn AccessControl>>,
    request: Request,
    next: Next,
) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (mut parts, body) = request.into_parts();
    let mut exchange = Exchange::new(RequestContext::from_parts(&parts, remote_addr));

    match filter.on_pre_handle(&mut exchange) {
        Ok(true) => {
            let (mut context, response) = exchange.into_parts();
            if let Some(response) = response {
                warn!("filter continued after committing a response");
                return response;
            }
            forward_attributes(context.attributes_mut(), &mut parts.extensions);
            next.run(Request::from_parts(parts, body)).await
        }
        Ok(false) => exchange.take_response().unwrap_or_else(|| {
            warn!("filter stopped without committing a response");
            StatusCode::UNAUTHORIZED.into_response()
        }),
        Err(err) => {
            error!("SSO filter failed: {err}");
            err.into_response()
        }
    }
}

fn forward_attributes(attributes: &mut Attributes, extensions: &mut Extensions) {
    if let Some(token) = attributes.take::<SsoToken>(SSO_TOKEN_ATTR) {
        extensions.insert(token);
    }
    if let Some(principal) = attributes.take::<Principal>(PRINCIPAL_ATTR) {
        extensions.insert(principal);
    }
    if let Some(failure) = attributes.take::<LoginFailure>(LOGIN_FAILURE_ATTR) {
        extensions.insert(failure);
    }
}
