//! Heartbeat lease arbitration between tabs.
//!
//! DESIGN
//! ======
//! A lease is the pair (`activeTabId`, `tabHeartbeat`). The holder renews the
//! heartbeat every tick; any other tab that sees a heartbeat younger than the
//! staleness threshold defers, otherwise it reclaims. [`decide`] is the only
//! place that rule lives, so the browser coordinator and the server registry
//! cannot drift apart.
//!
//! TRADE-OFFS
//! ==========
//! In the browser the read and the write are separate storage calls, so two
//! tabs claiming in the same millisecond can both believe they won. The
//! storage event that follows makes one of them log out; the server registry
//! removes the race entirely by deciding under a lock.

#[cfg(test)]
#[path = "lease_test.rs"]
mod lease_test;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TAB_ID_MAX_LEN: usize = 64;
const TAB_ID_SUFFIX_LEN: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TabIdError {
    #[error("tab id is empty")]
    Empty,
    #[error("tab id exceeds {max} characters")]
    TooLong { max: usize },
    #[error("tab id contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Identifier of one browser tab, stable across coordinators started in it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    /// New id of the form `tab_<now_ms>_<suffix>`, where the suffix is 9 random
    /// lowercase alphanumerics (the leading hex digits of a v4 UUID).
    #[must_use]
    pub fn generate(now_ms: i64) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        let suffix: String = random.chars().take(TAB_ID_SUFFIX_LEN).collect();
        Self(format!("tab_{now_ms}_{suffix}"))
    }

    /// Validate an id received from an untrusted source.
    pub fn parse(raw: &str) -> Result<Self, TabIdError> {
        if raw.is_empty() {
            return Err(TabIdError::Empty);
        }
        if raw.len() > TAB_ID_MAX_LEN {
            return Err(TabIdError::TooLong { max: TAB_ID_MAX_LEN });
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(TabIdError::InvalidChar(bad));
        }
        Ok(Self(raw.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of the lease as read from storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lease {
    pub holder: String,
    /// `None` when the heartbeat is missing or unparseable.
    pub heartbeat_ms: Option<i64>,
}

impl Lease {
    /// Build from raw storage values. No holder means no lease.
    #[must_use]
    pub fn from_raw(holder: Option<String>, heartbeat: Option<String>) -> Option<Self> {
        let holder = holder.filter(|h| !h.is_empty())?;
        let heartbeat_ms = heartbeat.as_deref().and_then(parse_heartbeat);
        Some(Self { holder, heartbeat_ms })
    }

    /// True while the holder's last heartbeat is younger than `stale_after_ms`.
    ///
    /// A heartbeat from the future (clock skew between tabs) counts as fresh.
    #[must_use]
    pub fn is_fresh(&self, now_ms: i64, stale_after_ms: u32) -> bool {
        self.heartbeat_ms
            .is_some_and(|beat| now_ms.saturating_sub(beat) < i64::from(stale_after_ms))
    }

    #[must_use]
    pub fn is_held_by(&self, tab: &str) -> bool {
        self.holder == tab
    }
}

fn parse_heartbeat(raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(ms) => Some(ms),
        Err(e) => {
            log::debug!("unparseable heartbeat {raw:?}, treating lease as stale: {e}");
            None
        }
    }
}

/// Outcome of one arbitration round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaseDecision {
    /// No holder: take the lease.
    Claim,
    /// Already the holder: refresh the heartbeat.
    Renew,
    /// Another holder whose heartbeat went stale: take over.
    Reclaim,
    /// Another holder is alive: this tab must yield.
    Defer,
}

impl LeaseDecision {
    /// Whether the caller ends up holding the lease.
    #[must_use]
    pub fn grants(self) -> bool {
        !matches!(self, Self::Defer)
    }
}

/// Decide what `me` should do given the current lease.
#[must_use]
pub fn decide(current: Option<&Lease>, me: &str, now_ms: i64, stale_after_ms: u32) -> LeaseDecision {
    match current {
        None => LeaseDecision::Claim,
        Some(lease) if lease.is_held_by(me) => LeaseDecision::Renew,
        Some(lease) if lease.is_fresh(now_ms, stale_after_ms) => LeaseDecision::Defer,
        Some(_) => LeaseDecision::Reclaim,
    }
}
