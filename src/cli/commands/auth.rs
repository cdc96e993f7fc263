//! Credential flow subcommands. Passwords may come from the environment so
//! they stay out of shell history; codes are prompted for when not given.

use clap::{Arg, Command};

pub const CMD_SIGNUP: &str = "signup";
pub const CMD_SIGNIN: &str = "signin";
pub const CMD_FORGOT_PASSWORD: &str = "forgot-password";
pub const CMD_OAUTH_CALLBACK: &str = "oauth-callback";
pub const CMD_GOOGLE_URL: &str = "google-url";

pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_CONFIRM_PASSWORD: &str = "confirm-password";
pub const ARG_FIRST_NAME: &str = "first-name";
pub const ARG_LAST_NAME: &str = "last-name";
pub const ARG_USERNAME: &str = "username";
pub const ARG_CODE: &str = "code";
pub const ARG_REDIRECT: &str = "redirect";
pub const ARG_REDIRECT_URI: &str = "redirect-uri";
pub const ARG_STATE: &str = "state";

fn email() -> Arg {
    Arg::new(ARG_EMAIL)
        .long(ARG_EMAIL)
        .help("Account e-mail address")
        .env("UNIAI_EMAIL")
        .required(true)
}

fn password(help: &'static str) -> Arg {
    Arg::new(ARG_PASSWORD)
        .long(ARG_PASSWORD)
        .help(help)
        .env("UNIAI_PASSWORD")
        .hide_env_values(true)
}

fn confirm_password() -> Arg {
    Arg::new(ARG_CONFIRM_PASSWORD)
        .long(ARG_CONFIRM_PASSWORD)
        .help("Repeat the password; prompted for when omitted")
        .env("UNIAI_CONFIRM_PASSWORD")
        .hide_env_values(true)
}

fn code() -> Arg {
    Arg::new(ARG_CODE)
        .long(ARG_CODE)
        .help("6-character verification code; prompted for when omitted")
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .subcommand(
            Command::new(CMD_SIGNUP)
                .about("Create an account")
                .arg(
                    Arg::new(ARG_FIRST_NAME)
                        .long(ARG_FIRST_NAME)
                        .help("First name")
                        .required(true),
                )
                .arg(
                    Arg::new(ARG_LAST_NAME)
                        .long(ARG_LAST_NAME)
                        .help("Last name")
                        .required(true),
                )
                .arg(
                    Arg::new(ARG_USERNAME)
                        .long(ARG_USERNAME)
                        .help("Username, 2 to 50 characters")
                        .required(true),
                )
                .arg(email())
                .arg(password("Password, at least 8 characters; prompted for when omitted"))
                .arg(confirm_password())
                .arg(code()),
        )
        .subcommand(
            Command::new(CMD_SIGNIN)
                .about("Sign in, answering e-mail or second-factor challenges")
                .arg(email())
                .arg(password("Password; prompted for when omitted"))
                .arg(code()),
        )
        .subcommand(
            Command::new(CMD_FORGOT_PASSWORD)
                .about("Reset the password with an e-mailed code")
                .arg(email())
                .arg(password("New password; prompted for when omitted"))
                .arg(confirm_password())
                .arg(code()),
        )
        .subcommand(
            Command::new(CMD_OAUTH_CALLBACK)
                .about("Complete a Google sign-in from the redirect URL")
                .arg(
                    Arg::new(ARG_REDIRECT)
                        .help("Redirect URL or query string carrying `token` or `error`")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new(CMD_GOOGLE_URL)
                .about("Print the Google sign-in URL")
                .arg(
                    Arg::new(ARG_REDIRECT_URI)
                        .long(ARG_REDIRECT_URI)
                        .help("Override the redirect URI embedded in the URL"),
                )
                .arg(
                    Arg::new(ARG_STATE)
                        .long(ARG_STATE)
                        .help("Opaque state passed through the provider"),
                ),
        )
}
