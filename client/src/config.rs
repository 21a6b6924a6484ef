//! Build-time client configuration.
//!
//! SYSTEM CONTEXT
//! ==============
//! The WASM bundle has no process environment, so settings are baked in when
//! the bundle is compiled with `option_env!`. Coordinator tuning goes through
//! the same `CoordinatorConfig::from_lookup` parser the server uses, so the
//! two sides cannot disagree on key names or defaults.
//!
//! TRADE-OFFS
//! ==========
//! An invalid build-time value falls back to the defaults with a console
//! warning rather than failing hydration.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use sessions::config::{
    BACKGROUND_POLICY_KEY, CLEAR_ON_UNLOAD_KEY, SLEEP_THRESHOLD_MS_KEY, STALE_AFTER_MS_KEY,
    TICK_MS_KEY, parse_bool,
};
use sessions::{ConfigError, CoordinatorConfig};

pub const API_BASE_URL_KEY: &str = "API_BASE_URL";
pub const REGISTRY_ENABLED_KEY: &str = "SESSION_REGISTRY_ENABLED";
pub const DEFAULT_API_BASE_URL: &str = "/api";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the recruitment backend, without trailing slash.
    pub api_base_url: String,
    /// Mirror lease heartbeats to the server session registry.
    pub registry_enabled: bool,
    pub coordinator: CoordinatorConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            registry_enabled: false,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Build from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns the first coordinator key that fails to parse, or an invalid
    /// `SESSION_REGISTRY_ENABLED` value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let coordinator = CoordinatorConfig::from_lookup(&lookup)?;
        let api_base_url = lookup(API_BASE_URL_KEY)
            .map(|raw| normalize_base_url(&raw))
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let registry_enabled = match lookup(REGISTRY_ENABLED_KEY) {
            None => false,
            Some(raw) => parse_bool(&raw)
                .ok_or(ConfigError::InvalidValue { key: REGISTRY_ENABLED_KEY, value: raw })?,
        };
        Ok(Self { api_base_url, registry_enabled, coordinator })
    }

    /// Configuration baked into this build.
    pub fn from_build_env() -> Self {
        match Self::from_lookup(build_env) {
            Ok(config) => config,
            Err(e) => {
                #[cfg(feature = "hydrate")]
                log::warn!("invalid build-time session config, using defaults: {e}");
                #[cfg(not(feature = "hydrate"))]
                let _ = e;
                Self::default()
            }
        }
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

fn build_env(key: &str) -> Option<String> {
    let raw = match key {
        TICK_MS_KEY => option_env!("SESSION_TICK_MS"),
        STALE_AFTER_MS_KEY => option_env!("SESSION_STALE_AFTER_MS"),
        SLEEP_THRESHOLD_MS_KEY => option_env!("SESSION_SLEEP_THRESHOLD_MS"),
        BACKGROUND_POLICY_KEY => option_env!("SESSION_BACKGROUND_POLICY"),
        CLEAR_ON_UNLOAD_KEY => option_env!("SESSION_CLEAR_ON_UNLOAD"),
        API_BASE_URL_KEY => option_env!("API_BASE_URL"),
        REGISTRY_ENABLED_KEY => option_env!("SESSION_REGISTRY_ENABLED"),
        _ => None,
    };
    raw.map(str::to_owned)
}
