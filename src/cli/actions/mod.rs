pub mod auth;
pub mod prompt;
pub mod session;

// The match lives in `run` so this module stays a list of actions.
mod run;

use crate::cli::globals::GlobalArgs;

#[derive(Debug)]
pub enum Action {
    SignUp(auth::SignUpArgs),
    SignIn(auth::SignInArgs),
    ForgotPassword(auth::ForgotPasswordArgs),
    OAuthCallback(auth::OAuthCallbackArgs),
    GoogleUrl(auth::GoogleUrlArgs),
    Status(GlobalArgs),
    WhoAmI(GlobalArgs),
    Profile(session::ProfileArgs),
    Logout(GlobalArgs),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
