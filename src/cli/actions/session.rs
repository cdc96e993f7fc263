use crate::{
    api::{profile, types::UpdateProfileRequest},
    cli::globals::{Client, GlobalArgs},
    errors::AuthError,
    flow,
    identity::Identity,
    routes::View,
    token,
};
use anyhow::{anyhow, Result};
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug)]
pub struct ProfileArgs {
    pub globals: GlobalArgs,
    pub changes: UpdateProfileRequest,
}

/// Prints whether this tab holds a session and whether protected views admit it.
///
/// # Errors
///
/// Returns an error if the client cannot be built.
pub fn status(globals: &GlobalArgs) -> Result<()> {
    let client = globals.connect(View::ENTRY)?;
    let snapshot = client.session.snapshot();

    let Some(identity) = snapshot.identity() else {
        println!("Signed out (tab {})", client.config.tab);
        return Ok(());
    };

    println!("Signed in as {} <{}>", identity.display_name(), identity.email);
    if let Some(expires) = snapshot.token().and_then(token::expiration) {
        match expires.duration_since(SystemTime::now()) {
            Ok(left) => println!("Session expires in {}s", left.as_secs()),
            Err(_) => println!("Session has expired"),
        }
    }
    println!(
        "Protected views: {}",
        if client.guard.can_enter(View::Chat) {
            "allowed"
        } else {
            "denied"
        }
    );
    Ok(())
}

/// The identity of a usable session. A stale token has already been cleared
/// by the guard at this point.
fn signed_in(client: &Client) -> Result<Identity> {
    client.guard.require_session().map_err(|err: AuthError| {
        if err.is_token_error() {
            anyhow!("not signed in: {err}")
        } else {
            anyhow!(err)
        }
    })
}

/// # Errors
///
/// Returns an error if no usable session is held.
pub fn whoami(globals: &GlobalArgs) -> Result<()> {
    let client = globals.connect(View::Settings)?;
    let identity = signed_in(&client)?;
    println!("{}", serde_json::to_string_pretty(&identity)?);
    Ok(())
}

/// Fetches the profile, or applies the requested changes when any are given.
///
/// # Errors
///
/// Returns an error if no usable session is held or the service rejects the call.
pub async fn profile(args: ProfileArgs) -> Result<()> {
    let client = args.globals.connect(View::Settings)?;
    signed_in(&client)?;

    let identity = if args.changes.is_empty() {
        profile::fetch_profile(&client.gateway).await?
    } else {
        debug!("updating profile");
        profile::update_profile(&client.gateway, &args.changes).await?
    };
    println!("{}", serde_json::to_string_pretty(&identity)?);
    Ok(())
}

/// # Errors
///
/// Returns an error if the client cannot be built.
pub fn logout(globals: &GlobalArgs) -> Result<()> {
    let client = globals.connect(View::Settings)?;
    flow::logout(&client.session, &client.navigator);
    println!("Signed out");
    Ok(())
}
