//! Maps validated CLI matches to the action to run.

use crate::{
    api::types::{GoogleAuthUrlRequest, UpdateProfileRequest},
    cli::{
        actions::{
            auth::{ForgotPasswordArgs, GoogleUrlArgs, OAuthCallbackArgs, SignInArgs, SignUpArgs},
            session::ProfileArgs,
            Action,
        },
        commands::{auth, client, session},
        globals::GlobalArgs,
    },
};
use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;

fn string(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.get_one::<String>(id).cloned()
}

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    string(matches, id).with_context(|| format!("missing required argument: --{id}"))
}

fn secret(matches: &ArgMatches, id: &str) -> Option<SecretString> {
    string(matches, id).map(SecretString::from)
}

/// # Errors
/// Returns an error if a required argument is missing or the subcommand is unknown.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let globals = GlobalArgs::new(client::overrides(matches));

    let Some((name, sub)) = matches.subcommand() else {
        bail!("missing subcommand");
    };

    let action = match name {
        auth::CMD_SIGNUP => Action::SignUp(SignUpArgs {
            globals,
            first_name: required(sub, auth::ARG_FIRST_NAME)?,
            last_name: required(sub, auth::ARG_LAST_NAME)?,
            username: required(sub, auth::ARG_USERNAME)?,
            email: required(sub, auth::ARG_EMAIL)?,
            password: secret(sub, auth::ARG_PASSWORD),
            confirm_password: secret(sub, auth::ARG_CONFIRM_PASSWORD),
            code: secret(sub, auth::ARG_CODE),
        }),
        auth::CMD_SIGNIN => Action::SignIn(SignInArgs {
            globals,
            email: required(sub, auth::ARG_EMAIL)?,
            password: secret(sub, auth::ARG_PASSWORD),
            code: secret(sub, auth::ARG_CODE),
        }),
        auth::CMD_FORGOT_PASSWORD => Action::ForgotPassword(ForgotPasswordArgs {
            globals,
            email: required(sub, auth::ARG_EMAIL)?,
            new_password: secret(sub, auth::ARG_PASSWORD),
            confirm_password: secret(sub, auth::ARG_CONFIRM_PASSWORD),
            code: secret(sub, auth::ARG_CODE),
        }),
        auth::CMD_OAUTH_CALLBACK => Action::OAuthCallback(OAuthCallbackArgs {
            globals,
            redirect: required(sub, auth::ARG_REDIRECT)?,
        }),
        auth::CMD_GOOGLE_URL => Action::GoogleUrl(GoogleUrlArgs {
            globals,
            request: GoogleAuthUrlRequest {
                redirect_uri: string(sub, auth::ARG_REDIRECT_URI),
                state: string(sub, auth::ARG_STATE),
            },
        }),
        session::CMD_STATUS => Action::Status(globals),
        session::CMD_WHOAMI => Action::WhoAmI(globals),
        session::CMD_PROFILE => Action::Profile(ProfileArgs {
            globals,
            changes: UpdateProfileRequest {
                first_name: string(sub, session::ARG_FIRST_NAME),
                last_name: string(sub, session::ARG_LAST_NAME),
                email: string(sub, session::ARG_EMAIL),
                two_factor_enabled: sub.get_one::<bool>(session::ARG_TWO_FACTOR).copied(),
            },
        }),
        session::CMD_LOGOUT => Action::Logout(globals),
        other => bail!("unknown subcommand: {other}"),
    };

    Ok(action)
}
