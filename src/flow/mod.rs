//! Auth flow controller. Each credential flow is a small state machine driven
//! by the gateway outcome of its current step. All flows end in
//! [`FlowState::Authenticated`] or [`FlowState::Abandoned`]; failures on a
//! first step go back to `Idle`, failures on a code step stay where they are.
//!
//! Every flow owns an attempt counter. [`AttemptHandle::abandon`] bumps it and
//! any response belonging to an older attempt is dropped without touching the
//! session.

pub mod oauth;
pub mod password;
pub mod signin;
pub mod signup;
pub mod validate;

use crate::{
    api::types::TokenResponse,
    errors::AuthError,
    gateway::{Gateway, Outcome},
    identity::Identity,
    routes::{Navigator, View},
    session::SessionStore,
};
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tracing::{debug, info};

/// What a pending code is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Purpose {
    EmailVerification,
    SecondFactor,
    PasswordReset,
}

/// E-mail and purpose carried from one step of a flow to the next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationContext {
    pub email: String,
    pub purpose: Purpose,
}

impl VerificationContext {
    #[must_use]
    pub fn new(email: impl Into<String>, purpose: Purpose) -> Self {
        Self {
            email: email.into(),
            purpose,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FlowState {
    #[default]
    Idle,
    Submitting,
    AwaitingEmailCode(VerificationContext),
    AwaitingSecondFactor(VerificationContext),
    AwaitingResetCode(VerificationContext),
    Authenticated(Identity),
    Failed(String),
    Abandoned,
}

impl FlowState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::AwaitingEmailCode(_) => "awaiting email code",
            Self::AwaitingSecondFactor(_) => "awaiting second factor",
            Self::AwaitingResetCode(_) => "awaiting reset code",
            Self::Authenticated(_) => "authenticated",
            Self::Failed(_) => "failed",
            Self::Abandoned => "abandoned",
        }
    }

    /// Pending verification context, if the flow waits for a code.
    #[must_use]
    pub const fn context(&self) -> Option<&VerificationContext> {
        match self {
            Self::AwaitingEmailCode(ctx)
            | Self::AwaitingSecondFactor(ctx)
            | Self::AwaitingResetCode(ctx) => Some(ctx),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Authenticated(_) | Self::Abandoned)
    }

    /// States from which a new first step may start.
    const fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Failed(_) | Self::Abandoned)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.context() {
            Some(ctx) => write!(f, "{} ({})", self.name(), ctx.email),
            None => f.write_str(self.name()),
        }
    }
}

/// Cloneable handle that invalidates the attempt a flow is working on, for
/// example when the user navigates away while a request is in flight.
#[derive(Clone, Debug, Default)]
pub struct AttemptHandle(Arc<AtomicU64>);

impl AttemptHandle {
    pub fn abandon(&self) {
        let previous = self.0.fetch_add(1, Ordering::SeqCst);
        debug!("attempt {previous} abandoned");
    }

    fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// State and attempt bookkeeping shared by the credential flows.
#[derive(Debug)]
pub(crate) struct FlowCore {
    gateway: Gateway,
    state: FlowState,
    attempts: AttemptHandle,
    ticket: u64,
}

impl FlowCore {
    fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            state: FlowState::Idle,
            attempts: AttemptHandle::default(),
            ticket: 0,
        }
    }

    fn is_stale(&self) -> bool {
        self.attempts.current() != self.ticket
    }

    /// Current state; an attempt abandoned through a handle reads as `Abandoned`.
    fn state(&self) -> FlowState {
        if self.is_stale() && !self.state.is_terminal() && !self.state.can_start() {
            FlowState::Abandoned
        } else {
            self.state.clone()
        }
    }

    fn abandon(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.attempts.abandon();
        self.ticket = self.attempts.current();
        self.state = FlowState::Abandoned;
    }

    /// Begins a first step. Fails when another step is pending.
    fn start(&mut self, action: &'static str) -> Result<(), AuthError> {
        let state = self.state();
        if !state.can_start() {
            return Err(AuthError::InvalidStep {
                action,
                state: state.name(),
            });
        }
        self.ticket = self.attempts.current();
        Ok(())
    }

    /// Checks that the flow waits for a code of one of `purposes` and returns
    /// its context.
    fn pending(
        &mut self,
        action: &'static str,
        purposes: &[Purpose],
    ) -> Result<VerificationContext, AuthError> {
        if self.is_stale() && self.state.context().is_some() {
            self.state = FlowState::Abandoned;
            return Err(AuthError::Abandoned);
        }
        match self.state.context() {
            Some(ctx) if purposes.contains(&ctx.purpose) => Ok(ctx.clone()),
            _ => Err(AuthError::InvalidStep {
                action,
                state: self.state.name(),
            }),
        }
    }

    /// Marks the flow as submitting and returns the state to fall back to.
    fn begin_step(&mut self) -> FlowState {
        std::mem::replace(&mut self.state, FlowState::Submitting)
    }

    /// Called after each awaited request. A superseded attempt resolves to
    /// `Abandoned` and its outcome is discarded.
    fn still_current<T>(&mut self, outcome: &Outcome<T>) -> Result<(), AuthError> {
        if self.is_stale() {
            info!("dropping response for abandoned attempt: {outcome:?}");
            self.state = FlowState::Abandoned;
            return Err(AuthError::Abandoned);
        }
        Ok(())
    }

    /// Writes the token into the session and lands on the post-login view.
    fn complete(&mut self, response: TokenResponse) -> Result<Identity, AuthError> {
        let identity = establish_session(
            self.gateway.session(),
            self.gateway.navigator(),
            response,
        )?;
        self.state = FlowState::Authenticated(identity.clone());
        Ok(identity)
    }

    /// Resolves a code step. Any failure keeps the flow waiting for a code.
    fn finish_code_step(
        &mut self,
        resume: FlowState,
        outcome: Outcome<TokenResponse>,
    ) -> Result<Identity, AuthError> {
        self.still_current(&outcome)?;
        let result = outcome
            .into_result()
            .and_then(|response| self.complete(response));
        if let Err(err) = &result {
            debug!("code step failed: {err}");
            self.state = resume;
        }
        result
    }

    /// Resets a failed first step to `Idle` and hands back its error.
    fn reject<T>(&mut self, outcome: Outcome<T>) -> AuthError {
        self.state = FlowState::Idle;
        match outcome.into_result() {
            Ok(_) => AuthError::ServerError {
                status: 200,
                message: "Unexpected response.".to_string(),
            },
            Err(err) => err,
        }
    }
}

/// Sets the session from a token response and navigates to the landing view.
///
/// # Errors
///
/// [`AuthError::ServerError`] when the response carries no token,
/// [`AuthError::Malformed`] when the token does not decode.
pub(crate) fn establish_session(
    session: &SessionStore,
    navigator: &Navigator,
    response: TokenResponse,
) -> Result<Identity, AuthError> {
    let token = response
        .token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| AuthError::ServerError {
            status: 200,
            message: "Response did not include a session token.".to_string(),
        })?;

    let identity = session.set(&token, response.user)?;
    navigator.navigate(View::LANDING);
    Ok(identity)
}

/// Clears the session and returns to the entry view.
pub fn logout(session: &SessionStore, navigator: &Navigator) {
    session.clear();
    navigator.navigate(View::ENTRY);
    info!("signed out");
}
