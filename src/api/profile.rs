//! Profile calls. A successful update refreshes the identity copy held by the
//! session so the rest of the client sees the new values without a reload.

use crate::{
    api::{endpoints, types::UpdateProfileRequest},
    errors::AuthError,
    gateway::{CallSite, Gateway},
    identity::Identity,
};
use tracing::{debug, instrument};

/// Fetches the signed-in user's profile.
///
/// # Errors
///
/// Returns the gateway outcome as an [`AuthError`]; a 401 also clears the session.
#[instrument(skip(gateway))]
pub async fn fetch_profile(gateway: &Gateway) -> Result<Identity, AuthError> {
    gateway
        .get(endpoints::PROFILE, CallSite::Protected)
        .await
        .into_result()
}

/// Updates the profile and writes the returned identity into the session.
///
/// # Errors
///
/// Returns [`AuthError::Validation`] for an empty change set, otherwise the
/// gateway outcome as an [`AuthError`].
#[instrument(skip_all)]
pub async fn update_profile(
    gateway: &Gateway,
    changes: &UpdateProfileRequest,
) -> Result<Identity, AuthError> {
    if changes.is_empty() {
        return Err(AuthError::Validation("Nothing to update.".to_string()));
    }

    let identity: Identity = gateway
        .put(endpoints::PROFILE, CallSite::Protected, changes)
        .await
        .into_result()?;

    if gateway.session().update_identity(identity.clone()) {
        debug!("session identity refreshed after profile update");
    }

    Ok(identity)
}
