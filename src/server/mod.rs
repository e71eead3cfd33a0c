use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::get,
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;

use crate::authc::{require_sso, AccessControl};

pub mod handlers;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Local paths of the login flow.
///
/// `page` is where the filter sends unauthenticated browsers and is served
/// outside the filter. `callback` is matched by the filter's login pattern.
#[derive(Clone, Debug)]
pub struct LoginRoutes {
    pub page: Option<String>,
    pub callback: String,
}

const RESERVED_PATHS: [&str; 3] = ["/", "/api/whoami", "/health"];

/// Build the router: `/health` and the login page are public, everything else
/// sits behind the filter.
#[must_use]
pub fn router(filter: Arc<dyn AccessControl>, login: &LoginRoutes) -> Router {
    let mut protected = Router::new()
        .route("/", get(handlers::root))
        .route("/api/whoami", get(handlers::whoami));
    if !RESERVED_PATHS.contains(&login.callback.as_str()) {
        protected = protected.route(
            &login.callback,
            get(handlers::login_callback).post(handlers::login_callback),
        );
    }
    let protected =
        protected.route_layer(middleware::from_fn_with_state(filter, require_sso));

    let mut public = Router::new().route("/health", get(handlers::health));
    if let Some(page) = login
        .page
        .as_deref()
        .filter(|page| !RESERVED_PATHS.contains(page) && *page != login.callback)
    {
        public = public.route(page, get(handlers::login_page));
    }

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(port: u16, filter: Arc<dyn AccessControl>, login: &LoginRoutes) -> Result<()> {
    let app = router(filter, login);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Gracefully shutdown"),
            Err(err) => {
                error!("Failed to listen for shutdown signal: {err}");
                std::future::pending::<()>().await;
            }
        }
    })
    .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
