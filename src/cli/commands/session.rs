//! Session inspection and profile subcommands.

use clap::{Arg, ArgAction, Command};

pub const CMD_STATUS: &str = "status";
pub const CMD_WHOAMI: &str = "whoami";
pub const CMD_PROFILE: &str = "profile";
pub const CMD_LOGOUT: &str = "logout";

pub const ARG_FIRST_NAME: &str = "first-name";
pub const ARG_LAST_NAME: &str = "last-name";
pub const ARG_EMAIL: &str = "email";
pub const ARG_TWO_FACTOR: &str = "two-factor";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .subcommand(Command::new(CMD_STATUS).about("Show whether this tab holds a usable session"))
        .subcommand(Command::new(CMD_WHOAMI).about("Print the identity of the current session"))
        .subcommand(
            Command::new(CMD_PROFILE)
                .about("Fetch the profile, or update it when any field is given")
                .arg(Arg::new(ARG_FIRST_NAME).long(ARG_FIRST_NAME).help("New first name"))
                .arg(Arg::new(ARG_LAST_NAME).long(ARG_LAST_NAME).help("New last name"))
                .arg(Arg::new(ARG_EMAIL).long(ARG_EMAIL).help("New e-mail address"))
                .arg(
                    Arg::new(ARG_TWO_FACTOR)
                        .long(ARG_TWO_FACTOR)
                        .help("Enable or disable the second factor")
                        .value_parser(clap::value_parser!(bool))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(Command::new(CMD_LOGOUT).about("Clear the session of this tab"))
}
