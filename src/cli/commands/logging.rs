use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts a level name or its index in `error, warn, info, debug, trace`.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        let level = level.trim().to_lowercase();
        LEVELS
            .iter()
            .position(|name| *name == level)
            .or_else(|| level.parse::<usize>().ok().filter(|index| *index < LEVELS.len()))
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("invalid log level, expected one of {} or 0-4", LEVELS.join(", ")))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log verbosity for filter decisions and requests; repeat -v or set a level name (default: error)")
            .long_help(
                "Log verbosity. Each -v raises the level: -v warn, -vv info (login redirects), \
                 -vvv debug (token lookups), -vvvv trace (every access decision). \
                 KISSO_LOG_LEVEL takes a level name or 0-4. RUST_LOG overrides both.",
            )
            .env("KISSO_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
