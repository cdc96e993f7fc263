//! Forgot-password: request a reset code for an address, then set a new
//! password with it. A successful reset signs the user in.

use super::{validate, AttemptHandle, FlowCore, FlowState, Purpose, VerificationContext};
use crate::{
    api::{
        self,
        types::{EmailRequest, ResetPasswordRequest},
    },
    errors::AuthError,
    gateway::{Gateway, Outcome},
    identity::Identity,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

pub struct ResetForm {
    pub code: SecretString,
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

#[derive(Debug)]
pub struct PasswordResetFlow {
    core: FlowCore,
}

impl PasswordResetFlow {
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self {
            core: FlowCore::new(gateway),
        }
    }

    #[must_use]
    pub fn state(&self) -> FlowState {
        self.core.state()
    }

    #[must_use]
    pub fn attempt_handle(&self) -> AttemptHandle {
        self.core.attempts.clone()
    }

    pub fn abandon(&mut self) {
        self.core.abandon();
    }

    /// Asks the service to mail a reset code. Returns the server message.
    ///
    /// # Errors
    ///
    /// Validation errors leave the state untouched; gateway errors (an unknown
    /// address comes back as [`AuthError::ResourceError`]) return the flow to `Idle`.
    #[instrument(skip(self))]
    pub async fn submit(&mut self, email: &str) -> Result<String, AuthError> {
        let email = validate::email(email)?;
        self.core.start("request password reset")?;

        self.core.begin_step();
        let request = EmailRequest {
            email: email.clone(),
        };
        let outcome = api::request_password_reset(&self.core.gateway, &request).await;
        self.core.still_current(&outcome)?;

        match outcome {
            Outcome::Ok(response) => {
                info!("reset code requested");
                self.core.state = FlowState::AwaitingResetCode(VerificationContext::new(
                    email,
                    Purpose::PasswordReset,
                ));
                Ok(response.message)
            }
            other => Err(self.core.reject(other)),
        }
    }

    /// Sets the new password. The local guards run before anything else, so
    /// mismatched passwords never leave the client whatever the state is.
    ///
    /// # Errors
    ///
    /// Any failure keeps the flow where it was.
    #[instrument(skip_all)]
    pub async fn submit_reset(&mut self, form: &ResetForm) -> Result<Identity, AuthError> {
        validate::new_password(&form.new_password, &form.confirm_password)?;
        let code = validate::code(&form.code)?;
        let ctx = self
            .core
            .pending("reset password", &[Purpose::PasswordReset])?;

        let resume = self.core.begin_step();
        let request = ResetPasswordRequest {
            email: ctx.email,
            code,
            new_password: form.new_password.expose_secret().to_string(),
        };
        let outcome = api::confirm_password_reset(&self.core.gateway, &request).await;
        self.core.finish_code_step(resume, outcome)
    }
}
