//! Sign-in: credentials first, then an e-mail code (202) or a second factor
//! (401 on the sign-in call) when the service asks for one.

use super::{validate, AttemptHandle, FlowCore, FlowState, Purpose, VerificationContext};
use crate::{
    api::{self, types::SignInRequest, types::VerifyRequest},
    errors::AuthError,
    gateway::{Gateway, Outcome},
    identity::Identity,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

pub struct SignInForm {
    pub email: String,
    pub password: SecretString,
}

#[derive(Debug)]
pub struct SignInFlow {
    core: FlowCore,
}

impl SignInFlow {
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

    /// Drops the pending step; a late response will not sign the user in.
    pub fn abandon(&mut self) {
        self.core.abandon();
    }

    /// Submits the credentials and returns the state the flow moved to.
    ///
    /// # Errors
    ///
    /// Validation errors leave the state untouched; gateway errors return the
    /// flow to `Idle`.
    #[instrument(skip_all)]
    pub async fn submit(&mut self, form: &SignInForm) -> Result<FlowState, AuthError> {
        let email = validate::email(&form.email)?;
        validate::password_present(&form.password)?;
        self.core.start("sign in")?;

        self.core.begin_step();
        let request = SignInRequest {
            email: email.clone(),
            password: form.password.expose_secret().to_string(),
        };
        let outcome = api::sign_in(&self.core.gateway, &request).await;
        self.core.still_current(&outcome)?;

        match outcome {
            Outcome::Ok(response) => {
                if let Err(err) = self.core.complete(response) {
                    self.core.state = FlowState::Idle;
                    return Err(err);
                }
            }
            Outcome::VerificationRequired { .. } => {
                info!("email verification required");
                self.core.state = FlowState::AwaitingEmailCode(VerificationContext::new(
                    email,
                    Purpose::EmailVerification,
                ));
            }
            Outcome::TwoFactorRequired { .. } => {
                info!("second factor required");
                self.core.state = FlowState::AwaitingSecondFactor(VerificationContext::new(
                    email,
                    Purpose::SecondFactor,
                ));
            }
            other => return Err(self.core.reject(other)),
        }

        Ok(self.core.state.clone())
    }

    /// Submits the e-mail code or the second factor, whichever is pending.
    ///
    /// # Errors
    ///
    /// Any failure keeps the flow waiting for a code.
    #[instrument(skip_all)]
    pub async fn submit_code(&mut self, code: &SecretString) -> Result<Identity, AuthError> {
        let code = validate::code(code)?;
        let ctx = self.core.pending(
            "submit code",
            &[Purpose::EmailVerification, Purpose::SecondFactor],
        )?;

        let resume = self.core.begin_step();
        let request = VerifyRequest {
            email: ctx.email,
            code,
        };
        let outcome = if ctx.purpose == Purpose::SecondFactor {
            api::verify_second_factor(&self.core.gateway, &request).await
        } else {
            api::verify_email(&self.core.gateway, &request).await
        };
        self.core.finish_code_step(resume, outcome)
    }
}
