use axum::{
    body::{to_bytes, Body},
    http::{
        header::{COOKIE, HOST, LOCATION, SET_COOKIE},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use kisso_authc::{
    authc::{
        AccessControl, DefaultHandler, KissoAuthenticatingFilter, LoginSupport,
        RealmLoginExecutor, SsoRealm,
    },
    cli::actions::server::{build_filter, Args},
    server::{self, LoginRoutes},
    sso::{CookieSsoHelper, SsoConfig, SsoToken, TokenRegistry},
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

struct App {
    router: Router,
    raw_token: SecretString,
}

fn app(with_handler: bool) -> App {
    let registry = Arc::new(TokenRegistry::new());
    let raw_token = registry.issue(SsoToken::new("1001").with_issuer("sso.example.com"));

    let sso = CookieSsoHelper::new(SsoConfig::new("/login".to_string()), registry);
    let support = LoginSupport::new("/login".to_string()).with_login_pattern("/login/callback");
    let executor = RealmLoginExecutor::new(Arc::new(SsoRealm::new()), support.clone());
    let mut filter = KissoAuthenticatingFilter::new(support, Arc::new(sso), Arc::new(executor));
    if with_handler {
        filter = filter.with_handler_interceptor(Arc::new(DefaultHandler));
    }
    let filter: Arc<dyn AccessControl> = Arc::new(filter);

    App {
        router: server::router(
            filter,
            &LoginRoutes {
                page: Some("/login".to_string()),
                callback: "/login/callback".to_string(),
            },
        ),
        raw_token,
    }
}

fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .uri(uri)
        .header(HOST, "app.example.com")
}

fn ajax(uri: &str) -> axum::http::request::Builder {
    get(uri).header("X-Requested-With", "XMLHttpRequest")
}

async fn json(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = app(false);
    let response = app
        .router
        .oneshot(get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn protected_ajax_without_token_is_unauthorized() {
    let app = app(false);
    let response = app
        .router
        .oneshot(ajax("/api/whoami").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json(response).await["message"],
        "Attempting to access a path which requires authentication."
    );
}

#[tokio::test]
async fn protected_browser_without_token_redirects_to_login() {
    let app = app(false);
    let response = app
        .router
        .oneshot(get("/?tab=1").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "/login?ReturnURL=http%3A%2F%2Fapp.example.com%2F%3Ftab%3D1"
    );
}

#[tokio::test]
async fn protected_request_with_cookie_reaches_handler() {
    let app = app(false);
    let cookie = format!("uid={}", app.raw_token.expose_secret());
    let response = app
        .router
        .oneshot(
            get("/api/whoami")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["token"]["id"], "1001");
    assert_eq!(body["token"]["issuer"], "sso.example.com");
}

#[tokio::test]
async fn protected_request_with_header_token_reaches_handler() {
    let app = app(false);
    let response = app
        .router
        .oneshot(
            get("/")
                .header("accesstoken", app.raw_token.expose_secret())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["message"], "Hello, 1001");
}

#[tokio::test]
async fn unknown_token_is_treated_as_missing() {
    let app = app(false);
    let response = app
        .router
        .oneshot(
            ajax("/api/whoami")
                .header(COOKIE, "uid=forged")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn browser_login_with_token_redirects_to_return_url() {
    let app = app(false);
    let cookie = format!("uid={}", app.raw_token.expose_secret());
    let response = app
        .router
        .oneshot(
            get("/login/callback?ReturnURL=%2Fapi%2Fwhoami")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/api/whoami");
}

#[tokio::test]
async fn browser_login_ignores_foreign_return_url() {
    let app = app(false);
    let cookie = format!("uid={}", app.raw_token.expose_secret());
    let response = app
        .router
        .oneshot(
            get("/login/callback?ReturnURL=https%3A%2F%2Fevil.example.net%2F")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
}

#[tokio::test]
async fn ajax_login_with_token_succeeds() {
    let app = app(false);
    let response = app
        .router
        .oneshot(
            ajax("/login/callback")
                .header("accesstoken", app.raw_token.expose_secret())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ajax_login_without_token_or_handler_is_unauthenticated() {
    let app = app(false);
    let response = app
        .router
        .oneshot(ajax("/login/callback").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await["message"], "Unauthentication.");
}

#[tokio::test]
async fn browser_login_without_token_or_handler_redirects_to_login() {
    let app = app(false);
    let response = app
        .router
        .oneshot(get("/login/callback").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "/login?ReturnURL=http%3A%2F%2Fapp.example.com%2Flogin%2Fcallback"
    );
    assert!(response.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn browser_login_without_token_with_handler_clears_cookie() {
    let app = app(true);
    let response = app
        .router
        .oneshot(get("/login/callback").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("uid=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn ajax_login_without_token_with_handler_uses_handler_response() {
    let app = app(true);
    let response = app
        .router
        .oneshot(ajax("/login/callback").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await["message"], "Unauthentication.");
}

#[tokio::test]
async fn browser_login_rejects_backslash_return_url() {
    let app = app(false);
    let cookie = format!("uid={}", app.raw_token.expose_secret());
    for target in ["%2F%5Cevil.test", "%2F%09%2Fevil.test"] {
        let response = app
            .router
            .clone()
            .oneshot(
                get(&format!("/login/callback?ReturnURL={target}"))
                    .header(COOKIE, cookie.as_str())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
    }
}

#[tokio::test]
async fn login_page_is_served_outside_the_filter() {
    let app = app(false);
    let response = app
        .router
        .oneshot(get("/login").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json(response).await["message"],
        "Sign in through the SSO service."
    );
}

#[tokio::test]
async fn default_wiring_redirect_chain_ends_on_login_page() {
    let args = Args {
        port: 0,
        login_url: "/login".to_string(),
        login_callback: "/login/callback".to_string(),
        login_pattern: None,
        success_url: "/".to_string(),
        return_url_param: "ReturnURL".to_string(),
        cookie_name: "uid".to_string(),
        cookie_domain: None,
        cookie_secure: false,
        access_token_header: "accesstoken".to_string(),
        check_ip: false,
        token_file: None,
        token_max_age_seconds: None,
    };
    let (filter, login) = build_filter(&args).unwrap();
    let router = server::router(filter, &login);

    for start in ["/", "/api/whoami", "/login/callback"] {
        let mut uri = start.to_string();
        let mut hops = 0;
        let status = loop {
            let response = router
                .clone()
                .oneshot(get(&uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            if response.status() != StatusCode::FOUND {
                break response.status();
            }
            hops += 1;
            assert!(hops <= 3, "redirect loop from {start}, last hop {uri}");
            uri = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .unwrap()
                .to_string();
        };

        assert_eq!(status, StatusCode::OK);
        assert_eq!(hops, 1);
        assert!(uri.starts_with("/login?ReturnURL="));
    }
}
