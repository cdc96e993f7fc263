//! Log verbosity. `-v` may be repeated; `UNIAI_LOG_LEVEL` takes a level name
//! or its count so scripts need not stack flags.

use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the `-v` count.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn parse_log_level(value: &str) -> Result<u8, String> {
    let value = value.trim();
    let index = match value.parse::<usize>() {
        Ok(count) => Some(count),
        Err(_) => LEVELS
            .iter()
            .position(|level| level.eq_ignore_ascii_case(value)),
    };

    index
        .filter(|index| *index < LEVELS.len())
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("unknown log level `{value}`, expected one of {}", LEVELS.join(", ")))
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::new(parse_log_level)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("More log output on stderr: -v warn, -vv info, -vvv debug, -vvvv trace")
            .env("UNIAI_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
