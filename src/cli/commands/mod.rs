pub mod logging;
pub mod sso;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("kisso-authc")
        .about("SSO authenticating filter for HTTP services")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("KISSO_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = sso::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SSO_ENV: [&str; 12] = [
        "KISSO_LOGIN_URL",
        "KISSO_LOGIN_CALLBACK",
        "KISSO_LOGIN_PATTERN",
        "KISSO_SUCCESS_URL",
        "KISSO_RETURN_URL_PARAM",
        "KISSO_COOKIE_NAME",
        "KISSO_COOKIE_DOMAIN",
        "KISSO_COOKIE_SECURE",
        "KISSO_ACCESS_TOKEN_HEADER",
        "KISSO_CHECK_IP",
        "KISSO_TOKEN_FILE",
        "KISSO_TOKEN_MAX_AGE",
    ];

    fn cleared_env() -> Vec<(&'static str, Option<&'static str>)> {
        let mut vars: Vec<(&'static str, Option<&'static str>)> =
            SSO_ENV.iter().map(|key| (*key, None)).collect();
        vars.push(("KISSO_PORT", None));
        vars.push(("KISSO_LOG_LEVEL", None));
        vars
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "kisso-authc");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "SSO authenticating filter for HTTP services"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(cleared_env(), || {
            let matches = new().get_matches_from(vec!["kisso-authc"]);
            assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
            assert_eq!(
                matches.get_one::<String>(sso::ARG_LOGIN_URL).cloned(),
                Some("/login".to_string())
            );
            assert_eq!(
                matches.get_one::<String>(sso::ARG_LOGIN_CALLBACK).cloned(),
                Some("/login/callback".to_string())
            );
            assert_eq!(
                matches.get_one::<String>(sso::ARG_COOKIE_NAME).cloned(),
                Some("uid".to_string())
            );
            assert_eq!(
                matches.get_one::<String>(sso::ARG_RETURN_URL_PARAM).cloned(),
                Some("ReturnURL".to_string())
            );
            assert!(!matches.get_flag(sso::ARG_CHECK_IP));
            assert!(matches.get_one::<String>(sso::ARG_TOKEN_FILE).is_none());
        });
    }

    #[test]
    fn test_check_args() {
        temp_env::with_vars(cleared_env(), || {
            let matches = new().get_matches_from(vec![
                "kisso-authc",
                "--port",
                "9090",
                "--login-url",
                "https://sso.example.com/login",
                "--login-pattern",
                "/login/**",
                "--cookie-domain",
                "example.com",
                "--cookie-secure",
                "--check-ip",
                "--token-max-age",
                "3600",
            ]);

            assert_eq!(matches.get_one::<u16>("port").copied(), Some(9090));
            let options = sso::Options::parse(&matches).unwrap();
            assert_eq!(options.login_url, "https://sso.example.com/login");
            assert_eq!(options.login_pattern.as_deref(), Some("/login/**"));
            assert_eq!(options.cookie_domain.as_deref(), Some("example.com"));
            assert!(options.cookie_secure);
            assert!(options.check_ip);
            assert_eq!(options.token_max_age_seconds, Some(3600));
        });
    }

    #[test]
    fn test_check_env() {
        let mut vars = cleared_env();
        vars.retain(|(key, _)| {
            !matches!(
                *key,
                "KISSO_PORT" | "KISSO_LOGIN_URL" | "KISSO_TOKEN_FILE" | "KISSO_LOG_LEVEL"
            )
        });
        vars.extend([
            ("KISSO_PORT", Some("443")),
            ("KISSO_LOGIN_URL", Some("/sso/login")),
            ("KISSO_TOKEN_FILE", Some("/etc/kisso/tokens.json")),
            ("KISSO_LOG_LEVEL", Some("info")),
        ]);

        temp_env::with_vars(vars, || {
            let matches = new().get_matches_from(vec!["kisso-authc"]);
            assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
            assert_eq!(
                matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                Some(2)
            );

            let options = sso::Options::parse(&matches).unwrap();
            assert_eq!(options.login_url, "/sso/login");
            assert_eq!(
                options.token_file,
                Some(std::path::PathBuf::from("/etc/kisso/tokens.json"))
            );
            assert_eq!(options.token_max_age_seconds, None);
        });
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, level) in levels.iter().enumerate() {
            let mut vars = cleared_env();
            vars.retain(|(key, _)| *key != "KISSO_LOG_LEVEL");
            vars.push(("KISSO_LOG_LEVEL", Some(*level)));
            temp_env::with_vars(vars, || {
                let matches = new().get_matches_from(vec!["kisso-authc"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(index as u8)
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_usize {
            temp_env::with_vars(cleared_env(), || {
                let mut args = vec!["kisso-authc".to_string()];
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(index as u8)
                );
            });
        }
    }
}
