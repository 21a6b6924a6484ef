//! Server configuration from the process environment.
//!
//! Keys:
//! - `PORT`: listen port, default 3000
//! - `SESSION_PRUNE_INTERVAL_SECS`: registry prune period, default 30
//! - `SESSION_*`: coordinator tuning shared with the client (see
//!   `sessions::config`); the registry uses `SESSION_STALE_AFTER_MS`

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use sessions::{ConfigError, CoordinatorConfig};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_PRUNE_INTERVAL_SECS: u64 = 30;

const PORT_KEY: &str = "PORT";
const PRUNE_INTERVAL_KEY: &str = "SESSION_PRUNE_INTERVAL_SECS";

#[derive(Debug, thiserror::Error)]
pub enum ServerConfigError {
    #[error("invalid PORT: {0:?}")]
    InvalidPort(String),
    #[error("invalid SESSION_PRUNE_INTERVAL_SECS: {0:?}")]
    InvalidPruneInterval(String),
    #[error(transparent)]
    Session(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub prune_interval: Duration,
    pub session: CoordinatorConfig,
}

impl ServerConfig {
    /// Build from an arbitrary key lookup. Missing keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(PORT_KEY) {
            None => DEFAULT_PORT,
            Some(raw) => raw.trim().parse().map_err(|_| ServerConfigError::InvalidPort(raw))?,
        };
        let prune_secs = match lookup(PRUNE_INTERVAL_KEY) {
            None => DEFAULT_PRUNE_INTERVAL_SECS,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(ServerConfigError::InvalidPruneInterval(raw)),
            },
        };
        let session = CoordinatorConfig::from_lookup(&lookup)?;
        Ok(Self { port, prune_interval: Duration::from_secs(prune_secs), session })
    }

    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}
