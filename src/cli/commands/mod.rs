pub mod auth;
pub mod client;
pub mod logging;
pub mod session;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    ColorChoice, Command,
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

    let command = Command::new("uniai")
        .about("UniAI account and session client")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true);

    let command = auth::with_args(command);
    let command = session::with_args(command);
    let command = client::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CLEAN_ENV: [(&str, Option<&str>); 8] = [
        ("UNIAI_API_URL", None),
        ("UNIAI_TAB", None),
        ("UNIAI_SESSION_DIR", None),
        ("UNIAI_TIMEOUT", None),
        ("UNIAI_LOG_LEVEL", None),
        ("UNIAI_EMAIL", None),
        ("UNIAI_PASSWORD", None),
        ("UNIAI_CONFIRM_PASSWORD", None),
    ];

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "uniai");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("UniAI account and session client".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        for name in [
            auth::CMD_SIGNUP,
            auth::CMD_SIGNIN,
            auth::CMD_FORGOT_PASSWORD,
            auth::CMD_OAUTH_CALLBACK,
            auth::CMD_GOOGLE_URL,
            session::CMD_STATUS,
            session::CMD_WHOAMI,
            session::CMD_PROFILE,
            session::CMD_LOGOUT,
        ] {
            assert!(command.find_subcommand(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_signin_args() {
        temp_env::with_vars(CLEAN_ENV, || {
            let matches = new().get_matches_from(vec![
                "uniai",
                "signin",
                "--email",
                "user@example.com",
                "--code",
                "AB12CD",
                "--api-url",
                "http://localhost:9090",
            ]);

            assert_eq!(
                matches
                    .get_one::<String>(client::ARG_API_URL)
                    .map(ToString::to_string),
                Some("http://localhost:9090".to_string())
            );
            let (name, sub) = matches.subcommand().unwrap();
            assert_eq!(name, auth::CMD_SIGNIN);
            assert_eq!(
                sub.get_one::<String>(auth::ARG_EMAIL).map(ToString::to_string),
                Some("user@example.com".to_string())
            );
            assert_eq!(
                sub.get_one::<String>(auth::ARG_CODE).map(ToString::to_string),
                Some("AB12CD".to_string())
            );
            assert_eq!(sub.get_one::<String>(auth::ARG_PASSWORD), None);
        });
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("UNIAI_API_URL", Some("https://api.uniai.dev")),
                ("UNIAI_TAB", Some("tab-7")),
                ("UNIAI_SESSION_DIR", Some("/tmp/uniai")),
                ("UNIAI_TIMEOUT", Some("5")),
                ("UNIAI_LOG_LEVEL", Some("info")),
                ("UNIAI_EMAIL", Some("env@example.com")),
                ("UNIAI_PASSWORD", Some("from-env-pass")),
            ],
            || {
                let matches = new().get_matches_from(vec!["uniai", "signin"]);
                let overrides = client::overrides(&matches);

                assert_eq!(
                    overrides.api_base_url,
                    Some("https://api.uniai.dev".to_string())
                );
                assert_eq!(overrides.tab, Some("tab-7".to_string()));
                assert_eq!(overrides.session_dir, Some("/tmp/uniai".to_string()));
                assert_eq!(overrides.request_timeout_secs, Some(5));
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );

                let (_, sub) = matches.subcommand().unwrap();
                assert_eq!(
                    sub.get_one::<String>(auth::ARG_PASSWORD)
                        .map(ToString::to_string),
                    Some("from-env-pass".to_string())
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("UNIAI_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(vec!["uniai", "status"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_usize {
            temp_env::with_vars([("UNIAI_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["uniai".to_string(), "status".to_string()];
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_missing_subcommand_is_an_error() {
        temp_env::with_vars(CLEAN_ENV, || {
            assert!(new().try_get_matches_from(vec!["uniai"]).is_err());
        });
    }

    #[test]
    fn test_profile_two_factor_flag() {
        temp_env::with_vars(CLEAN_ENV, || {
            let matches =
                new().get_matches_from(vec!["uniai", "profile", "--two-factor", "true"]);
            let (name, sub) = matches.subcommand().unwrap();
            assert_eq!(name, session::CMD_PROFILE);
            assert_eq!(
                sub.get_one::<bool>(session::ARG_TWO_FACTOR).copied(),
                Some(true)
            );
        });
    }
}
