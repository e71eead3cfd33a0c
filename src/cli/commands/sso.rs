use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_LOGIN_URL: &str = "login-url";
pub const ARG_LOGIN_CALLBACK: &str = "login-callback";
pub const ARG_LOGIN_PATTERN: &str = "login-pattern";
pub const ARG_SUCCESS_URL: &str = "success-url";
pub const ARG_RETURN_URL_PARAM: &str = "return-url-param";
pub const ARG_COOKIE_NAME: &str = "cookie-name";
pub const ARG_COOKIE_DOMAIN: &str = "cookie-domain";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_ACCESS_TOKEN_HEADER: &str = "access-token-header";
pub const ARG_CHECK_IP: &str = "check-ip";
pub const ARG_TOKEN_FILE: &str = "token-file";
pub const ARG_TOKEN_MAX_AGE: &str = "token-max-age";

#[derive(Debug, Clone)]
pub struct Options {
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

impl Options {
    /// Parse SSO arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };
        let read_optional = |id: &str| -> Option<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        Ok(Self {
            login_url: read_required(ARG_LOGIN_URL)?,
            login_callback: read_required(ARG_LOGIN_CALLBACK)?,
            login_pattern: read_optional(ARG_LOGIN_PATTERN),
            success_url: read_required(ARG_SUCCESS_URL)?,
            return_url_param: read_required(ARG_RETURN_URL_PARAM)?,
            cookie_name: read_required(ARG_COOKIE_NAME)?,
            cookie_domain: read_optional(ARG_COOKIE_DOMAIN),
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
            access_token_header: read_required(ARG_ACCESS_TOKEN_HEADER)?,
            check_ip: matches.get_flag(ARG_CHECK_IP),
            token_file: read_optional(ARG_TOKEN_FILE).map(PathBuf::from),
            token_max_age_seconds: matches
                .get_one::<u64>(ARG_TOKEN_MAX_AGE)
                .copied()
                .filter(|seconds| *seconds > 0),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOGIN_URL)
                .long(ARG_LOGIN_URL)
                .help("SSO login page, absolute or a path on this host served outside the filter")
                .default_value("/login")
                .env("KISSO_LOGIN_URL"),
        )
        .arg(
            Arg::new(ARG_LOGIN_CALLBACK)
                .long(ARG_LOGIN_CALLBACK)
                .help("Path on this host where the filter executes the login")
                .default_value("/login/callback")
                .env("KISSO_LOGIN_CALLBACK"),
        )
        .arg(
            Arg::new(ARG_LOGIN_PATTERN)
                .long(ARG_LOGIN_PATTERN)
                .help("Ant-style pattern matching login requests (default: --login-callback)")
                .env("KISSO_LOGIN_PATTERN"),
        )
        .arg(
            Arg::new(ARG_SUCCESS_URL)
                .long(ARG_SUCCESS_URL)
                .help("Redirect target after a successful browser login")
                .default_value("/")
                .env("KISSO_SUCCESS_URL"),
        )
        .arg(
            Arg::new(ARG_RETURN_URL_PARAM)
                .long(ARG_RETURN_URL_PARAM)
                .help("Query parameter carrying the originally requested URL")
                .default_value("ReturnURL")
                .env("KISSO_RETURN_URL_PARAM"),
        )
        .arg(
            Arg::new(ARG_COOKIE_NAME)
                .long(ARG_COOKIE_NAME)
                .help("Name of the SSO cookie")
                .default_value("uid")
                .env("KISSO_COOKIE_NAME"),
        )
        .arg(
            Arg::new(ARG_COOKIE_DOMAIN)
                .long(ARG_COOKIE_DOMAIN)
                .help("Domain attribute used when clearing the SSO cookie")
                .env("KISSO_COOKIE_DOMAIN"),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the cleared SSO cookie as Secure")
                .env("KISSO_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_HEADER)
                .long(ARG_ACCESS_TOKEN_HEADER)
                .help("Header read when the SSO cookie is absent")
                .default_value("accesstoken")
                .env("KISSO_ACCESS_TOKEN_HEADER"),
        )
        .arg(
            Arg::new(ARG_CHECK_IP)
                .long(ARG_CHECK_IP)
                .help("Reject tokens issued to a different client address")
                .env("KISSO_CHECK_IP")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_TOKEN_FILE)
                .long(ARG_TOKEN_FILE)
                .help("JSON file mapping raw tokens to issued SSO tokens")
                .env("KISSO_TOKEN_FILE"),
        )
        .arg(
            Arg::new(ARG_TOKEN_MAX_AGE)
                .long(ARG_TOKEN_MAX_AGE)
                .help("Reject tokens older than this many seconds (0 disables the check)")
                .default_value("0")
                .env("KISSO_TOKEN_MAX_AGE")
                .value_parser(clap::value_parser!(u64)),
        )
}
