use anyhow::{bail, Result};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use url::Url;

use crate::{
    authc::{AccessControl, KissoAuthenticatingFilter, LoginSupport, RealmLoginExecutor, SsoRealm},
    server::{self, LoginRoutes},
    sso::{CookieSsoHelper, SsoConfig, TokenRegistry},
};

#[derive(Debug, Clone)]
pub struct Args {
    pub port: u16,
    pub login_url: String,
    pub login_callback: String,
    pub login_pattern: Option<String>,
    pub success_url: String,
    pub return_url_param: String,
    pub cookie_name: String,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub access_token_header: String,
    pub check_ip: bool,
    pub token_file: Option<PathBuf>,
    pub token_max_age_seconds: Option<u64>,
}

/// Wire the filter from `args`; returns it with the local login routes.
///
/// A relative login URL is served on this host outside the filter, so the login
/// pattern must not match it or unauthenticated browsers would be redirected forever.
///
/// # Errors
/// Returns an error if the token file cannot be loaded or the login paths are invalid.
pub fn build_filter(args: &Args) -> Result<(Arc<dyn AccessControl>, LoginRoutes)> {
    let page = if args.login_url.starts_with('/') {
        Some(LoginSupport::new(args.login_url.clone()).login_path())
    } else if Url::parse(&args.login_url).is_ok() {
        None
    } else {
        bail!("login URL must be absolute or start with '/': {}", args.login_url);
    };
    if !args.login_callback.starts_with('/') {
        bail!("login callback must start with '/': {}", args.login_callback);
    }

    let registry = match &args.token_file {
        Some(path) => TokenRegistry::from_json_file(path)?,
        None => {
            warn!("no token file configured, every SSO token will be rejected");
            TokenRegistry::new()
        }
    };
    info!("SSO tokens loaded: {}", registry.len());

    let config = SsoConfig::new(args.login_url.clone())
        .with_cookie_name(args.cookie_name.clone())
        .with_cookie_domain(args.cookie_domain.clone())
        .with_cookie_secure(args.cookie_secure)
        .with_access_token_header(args.access_token_header.clone())
        .with_return_url_param(args.return_url_param.clone())
        .with_check_ip(args.check_ip);
    debug!("SSO config: {config:?}");
    let sso = CookieSsoHelper::new(config, Arc::new(registry));

    let pattern = args.login_pattern.as_deref().unwrap_or(&args.login_callback);
    let support = LoginSupport::new(args.login_url.clone())
        .with_login_pattern(pattern)
        .with_success_url(args.success_url.clone())
        .with_return_url_param(args.return_url_param.clone());

    if !support.is_login_path(&args.login_callback) {
        warn!(
            "login callback {} is not matched by the login pattern {pattern}",
            args.login_callback
        );
    }
    if let Some(page) = page.as_deref().filter(|page| support.is_login_path(page)) {
        bail!("login page {page} is matched by the login pattern {pattern}, it must be served outside the filter");
    }

    let realm = SsoRealm::new().with_max_age(args.token_max_age_seconds.map(Duration::from_secs));
    let executor = RealmLoginExecutor::new(Arc::new(realm), support.clone());
    let filter: Arc<dyn AccessControl> = Arc::new(KissoAuthenticatingFilter::new(
        support,
        Arc::new(sso),
        Arc::new(executor),
    ));

    Ok((
        filter,
        LoginRoutes {
            page,
            callback: args.login_callback.clone(),
        },
    ))
}

/// Execute the server action
///
/// # Errors
/// Returns an error if the filter cannot be built or the server fails
pub async fn execute(args: Args) -> Result<()> {
    let (filter, login) = build_filter(&args)?;

    server::new(args.port, filter, &login).await
}
