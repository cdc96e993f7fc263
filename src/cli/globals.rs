use crate::{
    config::{AppConfig, Overrides},
    gateway::Gateway,
    routes::{Navigator, RouteGuard, View},
    session::{slots::FileSlots, SessionStore},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub config: AppConfig,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(overrides: Overrides) -> Self {
        Self {
            config: AppConfig::load(overrides),
        }
    }

    /// Restores this tab's session and wires the gateway, starting on `view`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(&self, view: View) -> Result<Client> {
        let slots = FileSlots::new(&self.config.session_dir, &self.config.tab);
        debug!("session slots in {}", slots.dir().display());

        let session = Arc::new(SessionStore::open(Arc::new(slots)));
        let navigator = Arc::new(Navigator::new(view));
        let gateway = Gateway::new(&self.config, session.clone(), navigator.clone())
            .context("failed to build HTTP client")?;
        let guard = RouteGuard::new(session.clone(), navigator.clone());

        Ok(Client {
            config: self.config.clone(),
            session,
            navigator,
            gateway,
            guard,
        })
    }
}

/// Everything an action needs to talk to the identity service.
#[derive(Debug)]
pub struct Client {
    pub config: AppConfig,
    pub session: Arc<SessionStore>,
    pub navigator: Arc<Navigator>,
    pub gateway: Gateway,
    pub guard: RouteGuard,
}
