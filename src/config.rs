//! Client configuration: identity service location, request timeout, where the
//! per-tab session slots live and the OAuth failure delay. Defaults can be
//! overridden from the command line or environment; blank overrides are
//! ignored. Configuration values are public, do not store secrets here.

use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:9090";
pub const DEFAULT_TAB: &str = "default";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_OAUTH_FAILURE_DELAY_SECS: u64 = 3;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub session_dir: PathBuf,
    pub tab: String,
    pub oauth_failure_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_dir: default_session_dir(),
            tab: DEFAULT_TAB.to_string(),
            oauth_failure_delay: Duration::from_secs(DEFAULT_OAUTH_FAILURE_DELAY_SECS),
        }
    }
}

/// Values supplied at startup; `None` keeps the default.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub session_dir: Option<String>,
    pub tab: Option<String>,
}

impl AppConfig {
    /// Builds the config from defaults and the given overrides.
    #[must_use]
    pub fn load(overrides: Overrides) -> Self {
        let mut config = Self::default();
        apply_overrides(&mut config, overrides);
        config
    }
}

fn apply_overrides(config: &mut AppConfig, overrides: Overrides) {
    if let Some(value) = overrides.api_base_url.as_deref().and_then(normalize_value) {
        config.api_base_url = value.trim_end_matches('/').to_string();
    }
    if let Some(secs) = overrides.request_timeout_secs.filter(|secs| *secs > 0) {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(value) = overrides.session_dir.as_deref().and_then(normalize_value) {
        config.session_dir = PathBuf::from(value);
    }
    if let Some(value) = overrides.tab.as_deref().and_then(normalize_value) {
        config.tab = value;
    }
}

fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `$XDG_STATE_HOME/uniai/sessions`, else `$HOME/.local/state/uniai/sessions`,
/// else a directory under the system temp dir.
fn default_session_dir() -> PathBuf {
    let base = env::var("XDG_STATE_HOME")
        .ok()
        .and_then(|value| normalize_value(&value))
        .map(PathBuf::from)
        .or_else(|| {
            env::var("HOME")
                .ok()
                .and_then(|value| normalize_value(&value))
                .map(|home| PathBuf::from(home).join(".local").join("state"))
        })
        .unwrap_or_else(env::temp_dir);

    base.join("uniai").join("sessions")
}
