//! Session token codec. The identity service issues compact, three-segment
//! signed tokens; the client decodes the middle segment for display and expiry
//! decisions only. Signatures are never checked here, trust comes from the
//! transport. Token material must not be logged.

use crate::identity::{id_value_to_string, roles_from_value, Identity};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::{Map, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token is malformed")]
    Malformed,
}

/// Decoded claims of a session token.
///
/// The full claim object is kept so nothing the service sends is lost; known
/// claims are read through the typed accessors below.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Claims(Map<String, Value>);

impl Claims {
    #[must_use]
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Expiry in seconds since the epoch, if present and numeric.
    #[must_use]
    pub fn exp(&self) -> Option<i64> {
        self.number("exp")
    }

    #[must_use]
    pub fn sub(&self) -> Option<&str> {
        self.text("sub")
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.text("email")
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.text("username")
    }

    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.text("firstName")
    }

    #[must_use]
    pub fn last_name(&self) -> Option<&str> {
        self.text("lastName")
    }

    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        self.text("provider")
    }

    /// User id from `id`, then `userId`, then `sub`.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        ["id", "userId"]
            .iter()
            .find_map(|name| self.0.get(*name).and_then(id_value_to_string))
            .or_else(|| self.sub().map(ToString::to_string))
    }

    /// Roles from a `roles` array or a single `role` string.
    #[must_use]
    pub fn roles(&self) -> Option<Vec<String>> {
        self.0
            .get("roles")
            .or_else(|| self.0.get("role"))
            .and_then(roles_from_value)
    }

    #[must_use]
    pub fn two_factor_enabled(&self) -> Option<bool> {
        self.0
            .get("twoFactorEnabled")
            .or_else(|| self.0.get("isTwoFacAuth"))
            .and_then(Value::as_bool)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    fn number(&self, name: &str) -> Option<i64> {
        let value = self.0.get(name)?;
        #[allow(clippy::cast_possible_truncation)]
        let number = value
            .as_i64()
            .or_else(|| value.as_f64().map(|seconds| seconds as i64));
        number
    }
}

/// Decodes the claims of a compact token without verifying its signature.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] unless the token has exactly three
/// dot-separated segments and the middle one is base64url-encoded JSON object.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let mut parts = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(DecodeError::Malformed);
    };

    let bytes = Base64UrlUnpadded::decode_vec(payload.trim_end_matches('='))
        .map_err(|_| DecodeError::Malformed)?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(claims)) => Ok(Claims(claims)),
        _ => Err(DecodeError::Malformed),
    }
}

/// Encodes claims into an unsigned compact token, used for fixtures and local tooling.
#[must_use]
pub fn encode_unsigned(claims: &Claims) -> String {
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"none","typ":"JWT"}"#);
    let body = Value::Object(claims.0.clone()).to_string();
    let payload = Base64UrlUnpadded::encode_string(body.as_bytes());
    format!("{header}.{payload}.")
}

/// Reports whether the token must be treated as expired at `now_unix_seconds`.
///
/// Undecodable tokens and tokens without an expiry claim count as expired.
#[must_use]
pub fn is_expired(token: &str, now_unix_seconds: i64) -> bool {
    decode(token)
        .ok()
        .and_then(|claims| claims.exp())
        .map_or(true, |exp| now_unix_seconds >= exp)
}

/// Expiry instant of the token, if it carries one.
#[must_use]
pub fn expiration(token: &str) -> Option<SystemTime> {
    let exp = decode(token).ok()?.exp()?;
    let seconds = u64::try_from(exp).ok()?;
    UNIX_EPOCH.checked_add(Duration::from_secs(seconds))
}

/// Maps known claims onto an [`Identity`]; absent fields default to empty.
#[must_use]
pub fn identity_from_claims(claims: &Claims) -> Identity {
    Identity {
        id: claims.user_id().unwrap_or_default(),
        first_name: claims.first_name().unwrap_or_default().to_string(),
        last_name: claims.last_name().unwrap_or_default().to_string(),
        email: claims
            .email()
            .or_else(|| claims.sub())
            .unwrap_or_default()
            .to_string(),
        username: claims
            .username()
            .or_else(|| claims.sub())
            .map(ToString::to_string),
        roles: claims.roles(),
        two_factor_enabled: claims.two_factor_enabled(),
        provider: claims.provider().map(ToString::to_string),
    }
}

/// Current wall-clock time in seconds since the epoch.
#[must_use]
pub fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}
