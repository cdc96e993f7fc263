//! Process-wide session state. There is exactly one write path (`set`) and one
//! clear path (`clear`); every other component only reads. Expiry is not
//! checked here, the route guard and the gateway enforce it.

pub mod slots;

use crate::{
    errors::AuthError,
    identity::Identity,
    token::{self, identity_from_claims},
};
use parking_lot::RwLock;
use slots::{Slot, SlotStorage};
use std::{fmt, sync::Arc};
use tracing::{debug, info, warn};

/// Token plus the identity derived from it. Both are present or both absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    identity: Option<Identity>,
}

impl Session {
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token.is_none()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("identity", &self.identity)
            .finish()
    }
}

pub struct SessionStore {
    slots: Arc<dyn SlotStorage>,
    current: RwLock<Session>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("current", &*self.current.read())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates an empty store; nothing is read from the slots until [`restore`](Self::restore).
    #[must_use]
    pub fn new(slots: Arc<dyn SlotStorage>) -> Self {
        Self {
            slots,
            current: RwLock::new(Session::default()),
        }
    }

    /// Creates a store and restores whatever the slots hold.
    #[must_use]
    pub fn open(slots: Arc<dyn SlotStorage>) -> Self {
        let store = Self::new(slots);
        store.restore();
        store
    }

    /// Loads the persisted session. A token that does not decode wipes both
    /// slots; a missing or corrupt identity is re-derived from the token and
    /// written back.
    pub fn restore(&self) -> Session {
        let mut current = self.current.write();

        let token = match self.slots.read(Slot::Token) {
            Ok(token) => token.filter(|token| !token.trim().is_empty()),
            Err(err) => {
                warn!("failed to read session token slot: {err}");
                None
            }
        };

        let Some(token) = token else {
            self.wipe_slots();
            *current = Session::default();
            return current.clone();
        };

        let claims = match token::decode(&token) {
            Ok(claims) => claims,
            Err(err) => {
                info!("discarding persisted session: {err}");
                self.wipe_slots();
                *current = Session::default();
                return current.clone();
            }
        };

        let stored = self
            .slots
            .read(Slot::Identity)
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str::<Identity>(&raw).ok());

        let identity = if let Some(identity) = stored {
            identity
        } else {
            debug!("identity slot empty or corrupt, deriving from token claims");
            let identity = identity_from_claims(&claims);
            self.persist_identity(&identity);
            identity
        };

        *current = Session {
            token: Some(token),
            identity: Some(identity),
        };
        current.clone()
    }

    /// The only way a token enters the session. Without an explicit identity
    /// one is derived from the token claims.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Malformed`] if the token cannot be decoded; the
    /// current session is left untouched in that case.
    pub fn set(&self, token: &str, identity: Option<Identity>) -> Result<Identity, AuthError> {
        let token = token.trim();
        let claims = token::decode(token).map_err(|_| AuthError::Malformed)?;
        let identity = identity.unwrap_or_else(|| identity_from_claims(&claims));

        let mut current = self.current.write();

        if let Err(err) = self.slots.write(Slot::Token, token) {
            warn!("session token not persisted: {err}");
        }
        self.persist_identity(&identity);

        *current = Session {
            token: Some(token.to_string()),
            identity: Some(identity.clone()),
        };

        info!("session established for {}", identity.display_name());
        Ok(identity)
    }

    /// Replaces the identity copy after a profile update. The token is kept.
    /// Returns `false` when there is no session to update.
    pub fn update_identity(&self, identity: Identity) -> bool {
        let mut current = self.current.write();
        if current.token.is_none() {
            return false;
        }
        self.persist_identity(&identity);
        current.identity = Some(identity);
        true
    }

    /// Removes the session from memory and from the slots. Calling it again is a no-op.
    pub fn clear(&self) {
        let mut current = self.current.write();
        let had_session = current.token.is_some();
        self.wipe_slots();
        *current = Session::default();
        if had_session {
            info!("session cleared");
        }
    }

    /// True iff a non-empty token is held. Expiry is not considered.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.current.read().token.clone()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.current.read().identity.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.current.read().clone()
    }

    fn persist_identity(&self, identity: &Identity) {
        match serde_json::to_string(identity) {
            Ok(raw) => {
                if let Err(err) = self.slots.write(Slot::Identity, &raw) {
                    warn!("session identity not persisted: {err}");
                }
            }
            Err(err) => warn!("failed to serialize identity: {err}"),
        }
    }

    fn wipe_slots(&self) {
        for slot in [Slot::Token, Slot::Identity] {
            if let Err(err) = self.slots.remove(slot) {
                warn!("failed to remove session slot: {err}");
            }
        }
    }
}
