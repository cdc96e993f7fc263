//! Connection arguments shared by every subcommand.

use crate::config::{Overrides, DEFAULT_API_BASE_URL, DEFAULT_TAB};
use clap::{Arg, ArgMatches, Command};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_TAB: &str = "tab";
pub const ARG_SESSION_DIR: &str = "session-dir";
pub const ARG_TIMEOUT: &str = "timeout";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help(format!(
                    "Identity service base URL (default: {DEFAULT_API_BASE_URL})"
                ))
                .env("UNIAI_API_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_TAB)
                .long(ARG_TAB)
                .help(format!(
                    "Session slot name, one session per tab (default: {DEFAULT_TAB})"
                ))
                .env("UNIAI_TAB")
                .global(true),
        )
        .arg(
            Arg::new(ARG_SESSION_DIR)
                .long(ARG_SESSION_DIR)
                .help("Directory holding the persisted session slots")
                .env("UNIAI_SESSION_DIR")
                .global(true),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long(ARG_TIMEOUT)
                .help("Request timeout in seconds (default: 30)")
                .env("UNIAI_TIMEOUT")
                .global(true)
                .value_parser(clap::value_parser!(u64)),
        )
}

/// Reads the connection arguments; absent values keep the defaults.
#[must_use]
pub fn overrides(matches: &ArgMatches) -> Overrides {
    Overrides {
        api_base_url: matches.get_one::<String>(ARG_API_URL).cloned(),
        request_timeout_secs: matches.get_one::<u64>(ARG_TIMEOUT).copied(),
        session_dir: matches.get_one::<String>(ARG_SESSION_DIR).cloned(),
        tab: matches.get_one::<String>(ARG_TAB).cloned(),
    }
}
