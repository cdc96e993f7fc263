use crate::{
    errors::AuthError,
    identity::Identity,
    routes::{Navigator, View},
    session::SessionStore,
    token,
};
use std::sync::Arc;
use tracing::info;

/// Decides whether a navigation may proceed. Evaluated on every attempt,
/// never cached, since a background 401 can clear the session at any time.
#[derive(Clone, Debug)]
pub struct RouteGuard {
    session: Arc<SessionStore>,
    navigator: Arc<Navigator>,
}

impl RouteGuard {
    #[must_use]
    pub fn new(session: Arc<SessionStore>, navigator: Arc<Navigator>) -> Self {
        Self { session, navigator }
    }

    /// Public views are always admitted. Protected views need a session whose
    /// token has not expired; an expired token clears the session.
    #[must_use]
    pub fn can_enter(&self, view: View) -> bool {
        !view.is_protected() || self.require_session().is_ok()
    }

    /// Identity of a session a protected view would admit.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotSignedIn`] without a session. A token that no longer
    /// decodes or has expired clears the session and yields
    /// [`AuthError::Malformed`] or [`AuthError::Expired`].
    pub fn require_session(&self) -> Result<Identity, AuthError> {
        let Some(token) = self.session.token() else {
            return Err(AuthError::NotSignedIn);
        };

        let err = match token::decode(&token) {
            Err(_) => AuthError::Malformed,
            Ok(_) if token::is_expired(&token, token::now_unix_seconds()) => AuthError::Expired,
            Ok(_) => {
                return self.session.identity().ok_or(AuthError::NotSignedIn);
            }
        };

        info!("clearing session: {err}");
        self.session.clear();
        Err(err)
    }

    /// Navigates to `view`, or to the entry view when the guard refuses.
    /// Returns the view actually shown.
    pub fn enter(&self, view: View) -> View {
        let target = if self.can_enter(view) {
            view
        } else {
            View::ENTRY
        };
        self.navigator.navigate(target);
        target
    }
}
