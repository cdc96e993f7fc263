//! View table and navigation state. Views belonging to the unauthenticated
//! entry flow are tagged so forced redirects never loop back onto them.

mod guard;

pub use guard::RouteGuard;

use parking_lot::Mutex;
use std::{collections::VecDeque, fmt};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum View {
    Home,
    Auth,
    SignIn,
    SignUp,
    Verify,
    VerifyTwoFactor,
    ForgotPassword,
    ForgotPasswordConfirm,
    GoogleCallback,
    Chat,
    Settings,
    About,
}

impl View {
    pub const ALL: [Self; 12] = [
        Self::Home,
        Self::Auth,
        Self::SignIn,
        Self::SignUp,
        Self::Verify,
        Self::VerifyTwoFactor,
        Self::ForgotPassword,
        Self::ForgotPasswordConfirm,
        Self::GoogleCallback,
        Self::Chat,
        Self::Settings,
        Self::About,
    ];

    /// Where unauthenticated users are sent.
    pub const ENTRY: Self = Self::Auth;

    /// Where a completed credential flow lands.
    pub const LANDING: Self = Self::Chat;

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Auth => "/auth",
            Self::SignIn => "/signin",
            Self::SignUp => "/signup",
            Self::Verify => "/verify",
            Self::VerifyTwoFactor => "/2fa/verify",
            Self::ForgotPassword => "/forgot-password",
            Self::ForgotPasswordConfirm => "/forgot-password/confirm",
            Self::GoogleCallback => "/google/callback",
            Self::Chat => "/chat",
            Self::Settings => "/settings",
            Self::About => "/about",
        }
    }

    /// Resolves a path; unknown paths fall back to [`View::Home`].
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Self::ALL
            .into_iter()
            .find(|view| view.path() == path)
            .unwrap_or(Self::Home)
    }

    #[must_use]
    pub const fn is_protected(self) -> bool {
        matches!(self, Self::Chat)
    }

    /// Views that make unauthenticated calls as part of signing in.
    #[must_use]
    pub const fn is_entry_flow(self) -> bool {
        matches!(
            self,
            Self::Auth
                | Self::SignIn
                | Self::SignUp
                | Self::Verify
                | Self::VerifyTwoFactor
                | Self::ForgotPassword
                | Self::ForgotPasswordConfirm
                | Self::GoogleCallback
        )
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Number of recent views kept for inspection.
const HISTORY_LIMIT: usize = 16;

/// Tracks the current view. Redirects issued by the gateway or the guard go
/// through here so callers can observe where the user ended up.
#[derive(Debug)]
pub struct Navigator {
    state: Mutex<NavigatorState>,
}

#[derive(Debug)]
struct NavigatorState {
    current: View,
    history: VecDeque<View>,
}

impl NavigatorState {
    fn visit(&mut self, view: View) {
        self.current = view;
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(view);
    }
}

impl Navigator {
    #[must_use]
    pub fn new(start: View) -> Self {
        Self {
            state: Mutex::new(NavigatorState {
                current: start,
                history: VecDeque::from([start]),
            }),
        }
    }

    #[must_use]
    pub fn current(&self) -> View {
        self.state.lock().current
    }

    pub fn navigate(&self, view: View) {
        let mut state = self.state.lock();
        if state.current != view {
            debug!("navigating {} -> {}", state.current, view);
        }
        state.visit(view);
    }

    /// Sends the user to the entry view unless they are already inside the
    /// entry flow. Returns whether a redirect happened.
    pub fn redirect_to_entry(&self) -> bool {
        let mut state = self.state.lock();
        if state.current.is_entry_flow() {
            return false;
        }
        debug!("redirecting {} -> {}", state.current, View::ENTRY);
        state.visit(View::ENTRY);
        true
    }

    /// The most recent views, oldest first, including the current one.
    #[must_use]
    pub fn history(&self) -> Vec<View> {
        self.state.lock().history.iter().copied().collect()
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(View::Home)
    }
}
