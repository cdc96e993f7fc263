//! Local guards evaluated before a step is submitted. A failed guard never
//! reaches the gateway.

use crate::errors::AuthError;
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const CODE_LENGTH: usize = 6;
const USERNAME_CHARS: std::ops::RangeInclusive<usize> = 2..=50;

static EMAIL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

static CODE_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(&format!("^[A-Za-z0-9]{{{CODE_LENGTH}}}$")).ok());

fn invalid(message: &str) -> AuthError {
    AuthError::Validation(message.to_string())
}

/// Returns the trimmed e-mail address.
///
/// # Errors
///
/// [`AuthError::Validation`] when the address is empty or not shaped like one.
pub fn email(value: &str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid("Email is required."));
    }
    match EMAIL_RE.as_ref() {
        Some(re) if re.is_match(value) => Ok(value.to_string()),
        _ => Err(invalid("Enter a valid email address.")),
    }
}

/// Returns the trimmed code.
///
/// # Errors
///
/// [`AuthError::Validation`] unless the code is six letters or digits.
pub fn code(value: &SecretString) -> Result<String, AuthError> {
    let value = value.expose_secret().trim();
    match CODE_RE.as_ref() {
        Some(re) if re.is_match(value) => Ok(value.to_string()),
        _ => Err(invalid("The code must be 6 letters or digits.")),
    }
}

/// # Errors
///
/// [`AuthError::Validation`] when the password is too short.
pub fn password(value: &SecretString) -> Result<(), AuthError> {
    if value.expose_secret().chars().count() < MIN_PASSWORD_CHARS {
        return Err(invalid("Password must be at least 8 characters."));
    }
    Ok(())
}

/// Sign-in only checks that a password was entered; length rules belong to
/// account creation.
///
/// # Errors
///
/// [`AuthError::Validation`] when the password is empty.
pub fn password_present(value: &SecretString) -> Result<(), AuthError> {
    if value.expose_secret().is_empty() {
        return Err(invalid("Password is required."));
    }
    Ok(())
}

/// # Errors
///
/// [`AuthError::Validation`] when the password is too short or the
/// confirmation differs.
pub fn new_password(value: &SecretString, confirmation: &SecretString) -> Result<(), AuthError> {
    if value.expose_secret() != confirmation.expose_secret() {
        return Err(invalid("Passwords do not match."));
    }
    password(value)
}

/// # Errors
///
/// [`AuthError::Validation`] when the trimmed value is empty.
pub fn required(field: &str, value: &str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::Validation(format!("{field} is required.")));
    }
    Ok(value.to_string())
}

/// # Errors
///
/// [`AuthError::Validation`] unless the trimmed username is 2 to 50 characters.
pub fn username(value: &str) -> Result<String, AuthError> {
    let value = required("Username", value)?;
    if !USERNAME_CHARS.contains(&value.chars().count()) {
        return Err(invalid("Username must be between 2 and 50 characters."));
    }
    Ok(value)
}
