//! Map parsed CLI arguments to the action the binary executes.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::sso;
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let sso_opts = sso::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        login_url: sso_opts.login_url,
        login_callback: sso_opts.login_callback,
        login_pattern: sso_opts.login_pattern,
        success_url: sso_opts.success_url,
        return_url_param: sso_opts.return_url_param,
        cookie_name: sso_opts.cookie_name,
        cookie_domain: sso_opts.cookie_domain,
        cookie_secure: sso_opts.cookie_secure,
        access_token_header: sso_opts.access_token_header,
        check_ip: sso_opts.check_ip,
        token_file: sso_opts.token_file,
        token_max_age_seconds: sso_opts.token_max_age_seconds,
    }))
}
