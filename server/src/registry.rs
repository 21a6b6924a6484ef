//! Server-side session registry.
//!
//! DESIGN
//! ======
//! Browser storage offers no compare-and-swap, so two tabs can both believe
//! they claimed the lease. The registry is the tie-breaker: every lease
//! holder reports its heartbeat here and the check-and-set runs under one
//! mutex, using the same `sessions::lease::decide` rule as the browser.
//!
//! Entries are keyed by SHA-256 of the bearer token; raw tokens are never
//! stored. Each change of holder takes the next value of a registry-wide
//! counter, so versions only ever grow, even across release and re-claim.
//!
//! TRADE-OFFS
//! ==========
//! State is in-memory and per process. A restart forgets every lease, which
//! just lets the next heartbeat re-claim. Multi-instance deployments would
//! need a shared store instead.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sessions::{HeartbeatVerdict, Lease, LeaseDecision, TabId, decide};
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tracing::{debug, info};

struct Entry {
    holder: TabId,
    heartbeat_ms: i64,
    version: u64,
}

impl Entry {
    fn lease(&self) -> Lease {
        Lease { holder: self.holder.as_str().to_owned(), heartbeat_ms: Some(self.heartbeat_ms) }
    }
}

#[derive(Default)]
struct RegistryInner {
    leases: HashMap<String, Entry>,
    last_version: u64,
}

#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
    stale_after_ms: u32,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(stale_after_ms: u32) -> Self {
        Self { inner: Arc::new(Mutex::new(RegistryInner::default())), stale_after_ms }
    }

    /// Record a heartbeat from `tab` for the session behind `token`.
    pub fn heartbeat(&self, token: &str, tab: &TabId) -> HeartbeatVerdict {
        self.heartbeat_at(token, tab, now_ms())
    }

    /// Internal: heartbeat with explicit timestamp (for testing).
    fn heartbeat_at(&self, token: &str, tab: &TabId, now_ms: i64) -> HeartbeatVerdict {
        let key = token_key(token);
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let current = inner.leases.get(&key).map(Entry::lease);
        match decide(current.as_ref(), tab.as_str(), now_ms, self.stale_after_ms) {
            LeaseDecision::Defer => {
                let holder = current.map(|lease| lease.holder).unwrap_or_default();
                debug!(%tab, %holder, "heartbeat deferred to live holder");
                HeartbeatVerdict::Superseded { holder }
            }
            LeaseDecision::Renew => match inner.leases.get_mut(&key) {
                Some(entry) => {
                    entry.heartbeat_ms = entry.heartbeat_ms.max(now_ms);
                    HeartbeatVerdict::Granted { version: entry.version }
                }
                None => HeartbeatVerdict::Granted { version: inner.last_version },
            },
            decision @ (LeaseDecision::Claim | LeaseDecision::Reclaim) => {
                inner.last_version += 1;
                let version = inner.last_version;
                inner.leases.insert(key, Entry { holder: tab.clone(), heartbeat_ms: now_ms, version });
                info!(%tab, version, ?decision, "session lease granted");
                HeartbeatVerdict::Granted { version }
            }
        }
    }

    /// Drop the lease if `tab` holds it. Returns whether anything was removed.
    pub fn release(&self, token: &str, tab: &TabId) -> bool {
        let key = token_key(token);
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.leases.get(&key).is_some_and(|entry| entry.holder == *tab) {
            inner.leases.remove(&key);
            info!(%tab, "session lease released");
            return true;
        }
        false
    }

    /// Drop leases whose heartbeat has gone stale. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        self.prune_at(now_ms())
    }

    fn prune_at(&self, now_ms: i64) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = inner.leases.len();
        let stale_after_ms = self.stale_after_ms;
        inner.leases.retain(|_, entry| entry.lease().is_fresh(now_ms, stale_after_ms));
        before - inner.leases.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).leases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Periodically prune stale leases for the lifetime of the process.
pub fn spawn_prune_task(registry: SessionRegistry, interval: Duration) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "session registry pruning configured");
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let pruned = registry.prune();
            if pruned == 0 {
                continue;
            }
            if registry.is_empty() {
                debug!(pruned, "pruned stale session leases; registry is empty");
            } else {
                debug!(pruned, remaining = registry.len(), "pruned stale session leases");
            }
        }
    })
}

/// Registry key for a bearer token: lowercase hex SHA-256.
#[must_use]
pub fn token_key(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let bytes = hasher.finalize();
    bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}
