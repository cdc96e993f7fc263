//! Client wrappers for the identity service endpoints. Each wrapper tags its
//! request with the right call site so the gateway can tell a sign-in 401
//! from an expired session. Request bodies carry secrets and are never logged.

pub mod profile;
pub mod types;

use crate::gateway::{CallSite, Gateway, Outcome};
use types::{
    EmailRequest, GoogleAuthUrlRequest, MessageResponse, ResetPasswordRequest, SignInRequest,
    SignUpRequest, TokenResponse, UrlResponse, VerifyRequest,
};

pub mod endpoints {
    pub const SIGN_UP: &str = "/api/auth/signup";
    pub const SIGN_IN: &str = "/api/auth/signin";
    pub const VERIFY_EMAIL: &str = "/api/auth/verify";
    pub const VERIFY_SECOND_FACTOR: &str = "/api/auth/2fa/verify";
    pub const FORGOT_PASSWORD: &str = "/api/auth/forget-password";
    pub const FORGOT_PASSWORD_CONFIRM: &str = "/api/auth/forget-password/confirm";
    pub const GOOGLE_AUTH_URL: &str = "/api/auth/google/url";
    pub const PROFILE: &str = "/api/users/me";
}

/// Creates an account. A 202 (or a success without a token) means the
/// e-mail address has to be verified first.
pub async fn sign_up(gateway: &Gateway, request: &SignUpRequest) -> Outcome<TokenResponse> {
    let site = CallSite::SignUp {
        email: request.email.clone(),
    };
    gateway.post(endpoints::SIGN_UP, site, request).await
}

/// Signs in. 202 asks for e-mail verification, 401 for a second factor.
pub async fn sign_in(gateway: &Gateway, request: &SignInRequest) -> Outcome<TokenResponse> {
    let site = CallSite::SignIn {
        email: request.email.clone(),
    };
    gateway.post(endpoints::SIGN_IN, site, request).await
}

pub async fn verify_email(gateway: &Gateway, request: &VerifyRequest) -> Outcome<TokenResponse> {
    gateway
        .post(endpoints::VERIFY_EMAIL, CallSite::VerifyEmail, request)
        .await
}

pub async fn verify_second_factor(
    gateway: &Gateway,
    request: &VerifyRequest,
) -> Outcome<TokenResponse> {
    gateway
        .post(
            endpoints::VERIFY_SECOND_FACTOR,
            CallSite::VerifySecondFactor,
            request,
        )
        .await
}

/// Asks the service to mail a reset code.
pub async fn request_password_reset(
    gateway: &Gateway,
    request: &EmailRequest,
) -> Outcome<MessageResponse> {
    gateway
        .post(
            endpoints::FORGOT_PASSWORD,
            CallSite::RequestPasswordReset,
            request,
        )
        .await
}

/// Sets a new password with the mailed code; answers with a fresh session token.
pub async fn confirm_password_reset(
    gateway: &Gateway,
    request: &ResetPasswordRequest,
) -> Outcome<TokenResponse> {
    gateway
        .post(
            endpoints::FORGOT_PASSWORD_CONFIRM,
            CallSite::ConfirmPasswordReset,
            request,
        )
        .await
}

/// Provider URL that starts the Google sign-in. The service redirects back to
/// the OAuth callback view with a token or an error.
pub async fn google_auth_url(
    gateway: &Gateway,
    request: &GoogleAuthUrlRequest,
) -> Outcome<UrlResponse> {
    gateway
        .post(endpoints::GOOGLE_AUTH_URL, CallSite::GoogleAuthUrl, request)
        .await
}
