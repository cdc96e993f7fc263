//! Sign-up: account details first; when the service wants the address
//! confirmed (202, or a success without a token) the flow waits for the
//! e-mailed code.

use super::{validate, AttemptHandle, FlowCore, FlowState, Purpose, VerificationContext};
use crate::{
    api::{
        self,
        types::{SignUpRequest, VerifyRequest},
    },
    errors::AuthError,
    gateway::{Gateway, Outcome},
    identity::Identity,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

pub struct SignUpForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl SignUpForm {
    fn validate(&self) -> Result<SignUpRequest, AuthError> {
        let first_name = validate::required("First name", &self.first_name)?;
        let last_name = validate::required("Last name", &self.last_name)?;
        let username = validate::username(&self.username)?;
        let email = validate::email(&self.email)?;
        validate::new_password(&self.password, &self.confirm_password)?;

        Ok(SignUpRequest {
            first_name,
            last_name,
            username,
            email,
            password: self.password.expose_secret().to_string(),
        })
    }
}

#[derive(Debug)]
pub struct SignUpFlow {
    core: FlowCore,
}

impl SignUpFlow {
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

    /// Creates the account and returns the state the flow moved to.
    ///
    /// # Errors
    ///
    /// Validation errors leave the state untouched; gateway errors return the
    /// flow to `Idle`.
    #[instrument(skip_all)]
    pub async fn submit(&mut self, form: &SignUpForm) -> Result<FlowState, AuthError> {
        let request = form.validate()?;
        self.core.start("sign up")?;

        self.core.begin_step();
        let outcome = api::sign_up(&self.core.gateway, &request).await;
        self.core.still_current(&outcome)?;

        let awaiting_code = FlowState::AwaitingEmailCode(VerificationContext::new(
            request.email.clone(),
            Purpose::EmailVerification,
        ));

        match outcome {
            Outcome::Ok(response) if response.token.is_some() => {
                if let Err(err) = self.core.complete(response) {
                    self.core.state = FlowState::Idle;
                    return Err(err);
                }
            }
            Outcome::Ok(_) | Outcome::VerificationRequired { .. } => {
                info!("account created, email verification required");
                self.core.state = awaiting_code;
            }
            other => return Err(self.core.reject(other)),
        }

        Ok(self.core.state.clone())
    }

    /// Confirms the e-mail address with the mailed code.
    ///
    /// # Errors
    ///
    /// Any failure keeps the flow waiting for the code.
    #[instrument(skip_all)]
    pub async fn submit_code(&mut self, code: &SecretString) -> Result<Identity, AuthError> {
        let code = validate::code(code)?;
        let ctx = self
            .core
            .pending("verify email", &[Purpose::EmailVerification])?;

        let resume = self.core.begin_step();
        let request = VerifyRequest {
            email: ctx.email,
            code,
        };
        let outcome = api::verify_email(&self.core.gateway, &request).await;
        self.core.finish_code_step(resume, outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        api::endpoints,
        flow::tests::{can_bind_localhost, gateway, live_token},
        routes::View,
    };
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EMAIL: &str = "new@example.com";

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn form(confirm: &str) -> SignUpForm {
        SignUpForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: "ada".to_string(),
            email: EMAIL.to_string(),
            password: secret("analytical"),
            confirm_password: secret(confirm),
        }
    }

    #[tokio::test]
    async fn created_without_token_waits_for_code() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::SignUp);

        Mock::given(method("POST"))
            .and(path(endpoints::SIGN_UP))
            .and(body_json(json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "username": "ada",
                "email": EMAIL,
                "password": "analytical"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "Check your inbox"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(endpoints::VERIFY_EMAIL))
            .and(body_json(json!({"email": EMAIL, "verificationCode": "Q1W2E3"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"token": live_token(EMAIL)})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut flow = SignUpFlow::new(gateway.clone());
        let state = flow.submit(&form("analytical")).await.unwrap();
        assert_eq!(
            state,
            FlowState::AwaitingEmailCode(VerificationContext::new(
                EMAIL,
                Purpose::EmailVerification
            ))
        );

        let identity = flow.submit_code(&secret("Q1W2E3")).await.unwrap();
        assert_eq!(identity.email, EMAIL);
        assert!(gateway.session().is_authenticated());
        assert_eq!(gateway.navigator().current(), View::Chat);
    }

    #[tokio::test]
    async fn accepted_status_waits_for_code() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::SignUp);

        Mock::given(method("POST"))
            .and(path(endpoints::SIGN_UP))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let mut flow = SignUpFlow::new(gateway);
        let state = flow.submit(&form("analytical")).await.unwrap();
        assert!(matches!(state, FlowState::AwaitingEmailCode(_)));
    }

    #[tokio::test]
    async fn token_on_sign_up_authenticates() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::SignUp);

        Mock::given(method("POST"))
            .and(path(endpoints::SIGN_UP))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"token": live_token(EMAIL)})),
            )
            .mount(&server)
            .await;

        let mut flow = SignUpFlow::new(gateway.clone());
        let state = flow.submit(&form("analytical")).await.unwrap();
        assert!(matches!(state, FlowState::Authenticated(_)));
        assert!(gateway.session().is_authenticated());
    }

    #[tokio::test]
    async fn existing_account_returns_to_idle() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::SignUp);

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).set_body_string("Email already exists"))
            .mount(&server)
            .await;

        let mut flow = SignUpFlow::new(gateway);
        let err = flow.submit(&form("analytical")).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::InvalidCredentials("Email already exists".to_string())
        );
        assert_eq!(flow.state(), FlowState::Idle);
    }

    #[tokio::test]
    async fn mismatched_passwords_stay_local() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::SignUp);

        let mut flow = SignUpFlow::new(gateway);
        let err = flow.submit(&form("different")).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::Validation("Passwords do not match.".to_string())
        );
        assert_eq!(flow.state(), FlowState::Idle);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn abandon_discards_context() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri(), View::SignUp);

        Mock::given(method("POST"))
            .and(path(endpoints::SIGN_UP))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let mut flow = SignUpFlow::new(gateway);
        flow.submit(&form("analytical")).await.unwrap();
        flow.abandon();

        assert_eq!(flow.state(), FlowState::Abandoned);
        assert!(matches!(
            flow.submit_code(&secret("Q1W2E3")).await,
            Err(AuthError::InvalidStep { .. })
        ));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}
