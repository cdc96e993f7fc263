//! OAuth completion. The identity service runs the provider exchange and
//! redirects back with either `token` or `error` in the query string. A token
//! is written into the session; anything else fails and returns to the entry
//! view after a fixed delay so the user can read the message.

use super::{establish_session, FlowState};
use crate::{
    api::types::TokenResponse,
    identity::Identity,
    routes::{Navigator, View},
    session::SessionStore,
};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use url::Url;

const MISSING_TOKEN: &str = "No authentication token received";

/// What the redirect carried. `error` wins over `token` when both are present.
#[derive(Clone, PartialEq, Eq)]
pub enum CallbackParams {
    Token(String),
    Error(String),
    Missing,
}

impl std::fmt::Debug for CallbackParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token([REDACTED])"),
            Self::Error(message) => write!(f, "Error({message})"),
            Self::Missing => f.write_str("Missing"),
        }
    }
}

/// Reads the callback parameters from a full URL, a path with a query
/// string, or a bare query string.
#[must_use]
pub fn parse_callback(redirect: &str) -> CallbackParams {
    let redirect = redirect.trim();
    let parsed = Url::parse(redirect).or_else(|_| {
        let base = Url::parse("http://localhost/")?;
        if redirect.starts_with('/') || redirect.starts_with('?') {
            base.join(redirect)
        } else {
            base.join(&format!("?{redirect}"))
        }
    });

    let Ok(url) = parsed else {
        return CallbackParams::Missing;
    };

    let mut token = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "token" => token = Some(value.to_string()),
            "error" => error = Some(value.to_string()),
            _ => {}
        }
    }

    match (error, token) {
        (Some(error), _) => CallbackParams::Error(error),
        (None, Some(token)) => CallbackParams::Token(token),
        (None, None) => CallbackParams::Missing,
    }
}

/// Result of one callback.
#[derive(Debug)]
pub enum Completion {
    Authenticated(Identity),
    /// The failure message and the task that moves the user back to the entry view.
    Failed {
        message: String,
        return_to_entry: JoinHandle<()>,
    },
}

#[derive(Debug)]
pub struct OAuthCallback {
    session: Arc<SessionStore>,
    navigator: Arc<Navigator>,
    failure_delay: Duration,
    state: FlowState,
}

impl OAuthCallback {
    #[must_use]
    pub fn new(
        session: Arc<SessionStore>,
        navigator: Arc<Navigator>,
        failure_delay: Duration,
    ) -> Self {
        Self {
            session,
            navigator,
            failure_delay,
            state: FlowState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// Consumes the redirect. Must run inside a Tokio runtime since a failure
    /// schedules the delayed return to the entry view.
    #[instrument(skip_all)]
    pub async fn complete(&mut self, redirect: &str) -> Completion {
        let message = match parse_callback(redirect) {
            CallbackParams::Token(token) => {
                let response = TokenResponse {
                    token: Some(token),
                    user: None,
                };
                match establish_session(&self.session, &self.navigator, response) {
                    Ok(identity) => {
                        info!("signed in with Google");
                        self.state = FlowState::Authenticated(identity.clone());
                        return Completion::Authenticated(identity);
                    }
                    Err(err) => err.to_string(),
                }
            }
            CallbackParams::Error(message) => message,
            CallbackParams::Missing => MISSING_TOKEN.to_string(),
        };

        warn!("OAuth sign-in failed: {message}");
        self.state = FlowState::Failed(message.clone());

        let navigator = self.navigator.clone();
        let delay = self.failure_delay;
        let return_to_entry = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(View::ENTRY);
        });

        Completion::Failed {
            message,
            return_to_entry,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        flow::tests::live_token,
        session::slots::MemorySlots,
    };
    use tokio::time::Instant;

    const DELAY: Duration = Duration::from_secs(3);

    fn callback() -> (Arc<SessionStore>, Arc<Navigator>, OAuthCallback) {
        let session = Arc::new(SessionStore::new(Arc::new(MemorySlots::new())));
        let navigator = Arc::new(Navigator::new(View::GoogleCallback));
        let callback = OAuthCallback::new(session.clone(), navigator.clone(), DELAY);
        (session, navigator, callback)
    }

    #[test]
    fn parses_every_redirect_shape() {
        assert_eq!(
            parse_callback("http://localhost:5173/google/callback?token=a.b.c"),
            CallbackParams::Token("a.b.c".to_string())
        );
        assert_eq!(
            parse_callback("/google/callback?error=access_denied"),
            CallbackParams::Error("access_denied".to_string())
        );
        assert_eq!(
            parse_callback("token=a.b.c&error=boom"),
            CallbackParams::Error("boom".to_string())
        );
        assert_eq!(parse_callback("?token="), CallbackParams::Missing);
        assert_eq!(parse_callback("/google/callback"), CallbackParams::Missing);
        assert_eq!(parse_callback(""), CallbackParams::Missing);
    }

    #[test]
    fn debug_hides_token() {
        let rendered = format!("{:?}", CallbackParams::Token("secret".to_string()));
        assert!(!rendered.contains("secret"));
    }

    #[tokio::test]
    async fn token_authenticates_and_lands() {
        let (session, navigator, mut callback) = callback();
        let redirect = format!("/google/callback?token={}", live_token("g@example.com"));

        let completion = callback.complete(&redirect).await;

        assert!(matches!(completion, Completion::Authenticated(ref id) if id.email == "g@example.com"));
        assert!(matches!(callback.state(), FlowState::Authenticated(_)));
        assert!(session.is_authenticated());
        assert_eq!(navigator.current(), View::Chat);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_params_fail_then_return_after_delay() {
        let (session, navigator, mut callback) = callback();
        let started = Instant::now();

        let Completion::Failed {
            message,
            return_to_entry,
        } = callback.complete("/google/callback").await
        else {
            panic!("expected failure");
        };

        assert_eq!(message, MISSING_TOKEN);
        assert_eq!(callback.state(), &FlowState::Failed(MISSING_TOKEN.to_string()));
        assert_eq!(navigator.current(), View::GoogleCallback);

        return_to_entry.await.unwrap();
        assert!(started.elapsed() >= DELAY);
        assert_eq!(navigator.current(), View::Auth);
        assert!(!session.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_token_fails() {
        let (session, navigator, mut callback) = callback();

        let Completion::Failed {
            message,
            return_to_entry,
        } = callback.complete("?token=not-a-token").await
        else {
            panic!("expected failure");
        };

        assert_eq!(message, "session token is malformed");
        return_to_entry.await.unwrap();
        assert_eq!(navigator.current(), View::Auth);
        assert!(!session.is_authenticated());
    }
}
