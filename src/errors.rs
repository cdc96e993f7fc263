//! Error taxonomy for credential flows and gateway calls. Variants carry only
//! sanitized, user-facing messages; token and password material never ends up
//! in an error value.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The session token could not be decoded.
    #[error("session token is malformed")]
    Malformed,
    #[error("session token has expired")]
    Expired,
    /// No session is held for this tab.
    #[error("not signed in")]
    NotSignedIn,
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("email verification required for {email}")]
    VerificationRequired { email: String },
    #[error("second factor required for {email}")]
    TwoFactorRequired { email: String },
    /// The credential was rejected by a protected call; the session has been cleared.
    #[error("session is no longer valid, please sign in again")]
    SessionInvalid,
    #[error("access forbidden: {0}")]
    Forbidden(String),
    #[error("resource not found: {0}")]
    ResourceError(String),
    #[error("server error ({status}): {message}")]
    ServerError { status: u16, message: String },
    #[error("unable to reach the server: {0}")]
    NetworkUnavailable(String),
    /// A local guard rejected the input before any request was made.
    #[error("{0}")]
    Validation(String),
    #[error("{action} is not possible while {state}")]
    InvalidStep {
        action: &'static str,
        state: &'static str,
    },
    /// The attempt was abandoned before its response arrived.
    #[error("the attempt was abandoned")]
    Abandoned,
}

impl AuthError {
    /// True for outcomes that must be resolved locally instead of being shown
    /// to the user.
    #[must_use]
    pub const fn is_token_error(&self) -> bool {
        matches!(self, Self::Malformed | Self::Expired)
    }
}

#[cfg(test)]
mod tests {
    use super::AuthError;

    #[test]
    fn display_uses_server_message_for_invalid_credentials() {
        let err = AuthError::InvalidCredentials("Bad credentials".to_string());
        assert_eq!(err.to_string(), "Bad credentials");
    }

    #[test]
    fn server_error_includes_status() {
        let err = AuthError::ServerError {
            status: 503,
            message: "Request failed.".to_string(),
        };
        assert_eq!(err.to_string(), "server error (503): Request failed.");
    }

    #[test]
    fn classification_helpers() {
        assert!(AuthError::Malformed.is_token_error());
        assert!(AuthError::Expired.is_token_error());
        assert!(!AuthError::SessionInvalid.is_token_error());
        assert!(!AuthError::NotSignedIn.is_token_error());
    }
}
