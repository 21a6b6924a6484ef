//! Coordinator tuning parsed from key/value configuration.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

pub const DEFAULT_TICK_MS: u32 = 1_000;
pub const DEFAULT_STALE_AFTER_MS: u32 = 3_000;
pub const DEFAULT_SLEEP_THRESHOLD_MS: u32 = 5_000;

pub const TICK_MS_KEY: &str = "SESSION_TICK_MS";
pub const STALE_AFTER_MS_KEY: &str = "SESSION_STALE_AFTER_MS";
pub const SLEEP_THRESHOLD_MS_KEY: &str = "SESSION_SLEEP_THRESHOLD_MS";
pub const BACKGROUND_POLICY_KEY: &str = "SESSION_BACKGROUND_POLICY";
pub const CLEAR_ON_UNLOAD_KEY: &str = "SESSION_CLEAR_ON_UNLOAD";

/// What a tab does when it is hidden or loses focus while hidden.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BackgroundPolicy {
    /// Release the lease, clear auth and redirect to login.
    #[default]
    Logout,
    /// Release the lease only; re-arbitrate when shown again.
    ReleaseLease,
    /// Keep the lease and session untouched.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
    #[error("unknown SESSION_BACKGROUND_POLICY: {0:?} (expected 'logout', 'release' or 'ignore')")]
    UnknownPolicy(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Period of both the arbitration and the sleep-check intervals.
    pub tick_ms: u32,
    /// A peer heartbeat older than this is treated as a dead tab.
    pub stale_after_ms: u32,
    /// A wall-clock gap above this between ticks is treated as system sleep.
    pub sleep_threshold_ms: u32,
    pub background_policy: BackgroundPolicy,
    /// Clear the token when any tab unloads.
    pub clear_auth_on_unload: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            stale_after_ms: DEFAULT_STALE_AFTER_MS,
            sleep_threshold_ms: DEFAULT_SLEEP_THRESHOLD_MS,
            background_policy: BackgroundPolicy::Logout,
            clear_auth_on_unload: true,
        }
    }
}

impl CoordinatorConfig {
    /// Build from an arbitrary key lookup. Missing keys take their defaults.
    ///
    /// Keys:
    /// - `SESSION_TICK_MS`: default 1000
    /// - `SESSION_STALE_AFTER_MS`: default 3000
    /// - `SESSION_SLEEP_THRESHOLD_MS`: default 5000
    /// - `SESSION_BACKGROUND_POLICY`: `logout` (default), `release` or `ignore`
    /// - `SESSION_CLEAR_ON_UNLOAD`: boolean, default true
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tick_ms = parse_millis(TICK_MS_KEY, lookup(TICK_MS_KEY), DEFAULT_TICK_MS)?;
        let stale_after_ms = parse_millis(STALE_AFTER_MS_KEY, lookup(STALE_AFTER_MS_KEY), DEFAULT_STALE_AFTER_MS)?;
        let sleep_threshold_ms =
            parse_millis(SLEEP_THRESHOLD_MS_KEY, lookup(SLEEP_THRESHOLD_MS_KEY), DEFAULT_SLEEP_THRESHOLD_MS)?;
        let background_policy = parse_policy(lookup(BACKGROUND_POLICY_KEY).as_deref())?;
        let clear_auth_on_unload = match lookup(CLEAR_ON_UNLOAD_KEY) {
            None => true,
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue { key: CLEAR_ON_UNLOAD_KEY, value: raw })?,
        };

        Ok(Self { tick_ms, stale_after_ms, sleep_threshold_ms, background_policy, clear_auth_on_unload })
    }

    /// Build from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var_os(key).and_then(|v| v.to_str().map(str::to_owned)))
    }
}

fn parse_millis(key: &'static str, raw: Option<String>, default: u32) -> Result<u32, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidValue { key, value: raw.clone() })?;
    if value == 0 {
        return Err(ConfigError::Zero { key });
    }
    Ok(value)
}

fn parse_policy(raw: Option<&str>) -> Result<BackgroundPolicy, ConfigError> {
    match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
        None | Some("logout") => Ok(BackgroundPolicy::Logout),
        Some("release") => Ok(BackgroundPolicy::ReleaseLease),
        Some("ignore") => Ok(BackgroundPolicy::Ignore),
        Some(other) => Err(ConfigError::UnknownPolicy(other.to_owned())),
    }
}

/// Parse the boolean spellings accepted across the workspace.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
