use crate::cli::actions::{auth, session, Action};
use anyhow::Result;

/// Single dispatch point for every CLI action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::SignUp(args) => auth::signup(args).await,
        Action::SignIn(args) => auth::signin(args).await,
        Action::ForgotPassword(args) => auth::forgot_password(args).await,
        Action::OAuthCallback(args) => auth::oauth_callback(args).await,
        Action::GoogleUrl(args) => auth::google_url(args).await,
        Action::Status(globals) => session::status(&globals),
        Action::WhoAmI(globals) => session::whoami(&globals),
        Action::Profile(args) => session::profile(args).await,
        Action::Logout(globals) => session::logout(&globals),
    }
}
