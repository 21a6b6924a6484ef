//! Per-tab session coordinator.
//!
//! ARCHITECTURE
//! ============
//! One `SessionCoordinator` runs in every open tab. It owns all per-tab state
//! (tab id, phase, last-active timestamp, cached role) and reacts to inputs
//! the browser adapter forwards: interval ticks, storage events, visibility
//! and focus changes, page lifecycle events and registry verdicts. Its only
//! outward effects are storage writes and a navigation to the login route.
//!
//! ```text
//! Uninitialized -> Unauthenticated                      (no token at start)
//! Uninitialized -> ActiveHolder <-> Waiting -> LoggedOut
//! ActiveHolder | Waiting -> Uninitialized               (detach on unmount)
//! ```
//!
//! The tab id is kept in the tab-scoped store, so a page that unmounts and
//! mounts again in the same tab resumes the same lease instead of deferring
//! to its own previous heartbeat.
//!
//! `LoggedOut` is terminal; reaching it twice is a no-op, which is what keeps
//! overlapping logout triggers in the same tick down to one redirect.
//!
//! ERROR HANDLING
//! ==============
//! Nothing is surfaced to the caller. Storage failures are logged at `warn`
//! and read as "absent", which in the worst case logs the user out.

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod coordinator_test;

use std::fmt;

use crate::auth::{AuthStore, UserRole};
use crate::config::{BackgroundPolicy, CoordinatorConfig};
use crate::keys;
use crate::lease::{Lease, LeaseDecision, TabId, decide};
use crate::store::{KeyValueStore, StorageChange};
use crate::wire::HeartbeatVerdict;

/// Client-side router collaborator.
pub trait Navigator {
    fn navigate(&self, path: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str),
{
    fn navigate(&self, path: &str) {
        self(path);
    }
}

/// Document visibility as reported by `document.visibilityState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    /// Map a raw `visibilityState`; only `"hidden"` counts as hidden.
    #[must_use]
    pub fn from_state(raw: &str) -> Self {
        if raw == "hidden" { Self::Hidden } else { Self::Visible }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TabPhase {
    Uninitialized,
    /// No token at start; nothing to coordinate.
    Unauthenticated,
    ActiveHolder,
    /// Authenticated but not holding the lease (released while backgrounded).
    Waiting,
    LoggedOut,
}

/// Why a tab ended its session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoutReason {
    /// Another tab holds a fresh lease.
    PeerTabActive,
    /// Another tab wrote itself into `activeTabId`.
    LeaseTakenOver,
    /// The token disappeared (explicit logout elsewhere).
    TokenRemoved,
    /// The tab was hidden under [`BackgroundPolicy::Logout`].
    Backgrounded,
    /// The wall clock jumped past the sleep threshold between ticks.
    SleepDetected,
    /// The page lifecycle reported a resume from freeze.
    Resumed,
    /// The server registry says another tab holds the session.
    Superseded,
    /// The tab unloaded.
    Unloaded,
    /// The user clicked logout in this tab.
    SignedOut,
}

impl LogoutReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PeerTabActive => "peer_tab_active",
            Self::LeaseTakenOver => "lease_taken_over",
            Self::TokenRemoved => "token_removed",
            Self::Backgrounded => "backgrounded",
            Self::SleepDetected => "sleep_detected",
            Self::Resumed => "resumed",
            Self::Superseded => "superseded",
            Self::Unloaded => "unloaded",
            Self::SignedOut => "signed_out",
        }
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct SessionCoordinator<P, T, N> {
    auth: AuthStore<P>,
    tab_store: T,
    navigator: N,
    config: CoordinatorConfig,
    tab_id: Option<TabId>,
    phase: TabPhase,
    last_active_ms: i64,
    /// Role seen while authenticated; survives another tab wiping the metadata.
    known_role: Option<UserRole>,
    logout_reason: Option<LogoutReason>,
    registry_version: Option<u64>,
}

impl<P, T, N> SessionCoordinator<P, T, N>
where
    P: KeyValueStore,
    T: KeyValueStore,
    N: Navigator,
{
    /// `persistent` is shared by all tabs; `tab_store` is private to this one.
    pub fn new(persistent: P, tab_store: T, navigator: N, config: CoordinatorConfig) -> Self {
        Self {
            auth: AuthStore::new(persistent),
            tab_store,
            navigator,
            config,
            tab_id: None,
            phase: TabPhase::Uninitialized,
            last_active_ms: 0,
            known_role: None,
            logout_reason: None,
            registry_version: None,
        }
    }

    // =========================================================================
    // INTROSPECTION
    // =========================================================================

    pub fn phase(&self) -> TabPhase {
        self.phase
    }

    pub fn tab_id(&self) -> Option<&TabId> {
        self.tab_id.as_ref()
    }

    pub fn logout_reason(&self) -> Option<LogoutReason> {
        self.logout_reason
    }

    pub fn registry_version(&self) -> Option<u64> {
        self.registry_version
    }

    pub fn last_active_ms(&self) -> i64 {
        self.last_active_ms
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthStore<P> {
        &self.auth
    }

    /// True while the tab takes part in arbitration.
    pub fn is_coordinating(&self) -> bool {
        matches!(self.phase, TabPhase::ActiveHolder | TabPhase::Waiting)
    }

    /// True when storage names this tab as the lease holder.
    pub fn holds_lease(&self) -> bool {
        let Some(me) = &self.tab_id else {
            return false;
        };
        self.read(keys::ACTIVE_TAB_ID).as_deref() == Some(me.as_str())
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Mount-time initialization. Later calls are ignored.
    pub fn start(&mut self, now_ms: i64) {
        if self.phase != TabPhase::Uninitialized {
            return;
        }
        if let Err(e) = self.tab_store.set(keys::SESSION_ACTIVE, "true") {
            log::warn!("failed to mark tab session active: {e}");
        }
        self.last_active_ms = now_ms;

        if !self.auth.is_authenticated() {
            self.remove_lease_keys();
            self.set_phase(TabPhase::Unauthenticated);
            return;
        }

        self.known_role = self.auth.user_type();
        let tab_id = self.restore_tab_id().unwrap_or_else(|| TabId::generate(now_ms));
        if let Err(e) = self.tab_store.set(keys::TAB_ID, tab_id.as_str()) {
            log::warn!("failed to remember tab id: {e}");
        }
        log::info!("session coordinator started as {tab_id}");
        self.tab_id = Some(tab_id);
        self.set_phase(TabPhase::Waiting);
        self.run_arbitration(now_ms);
    }

    /// Heartbeat tick. Returns the lease decision when one was taken.
    ///
    /// A tab parked in [`TabPhase::Waiting`] only checks the token; it
    /// competes for the lease again once it becomes visible.
    pub fn arbitrate(&mut self, now_ms: i64) -> Option<LeaseDecision> {
        if !self.is_coordinating() {
            return None;
        }
        if !self.auth.is_authenticated() {
            self.force_logout(LogoutReason::TokenRemoved);
            return None;
        }
        if self.phase == TabPhase::Waiting {
            return None;
        }
        self.run_arbitration(now_ms)
    }

    /// Sleep-check tick. Returns true if it forced a logout.
    pub fn check_sleep(&mut self, now_ms: i64, visibility: Visibility) -> bool {
        if !self.is_coordinating() {
            return false;
        }
        let elapsed = now_ms.saturating_sub(self.last_active_ms);
        self.last_active_ms = now_ms;
        if elapsed > i64::from(self.config.sleep_threshold_ms)
            && visibility == Visibility::Visible
            && self.auth.is_authenticated()
        {
            log::warn!("clock advanced {elapsed}ms between ticks, assuming system sleep");
            return self.force_logout(LogoutReason::SleepDetected);
        }
        false
    }

    /// Mouse, keyboard or touch interaction.
    pub fn record_activity(&mut self, now_ms: i64) {
        if self.phase != TabPhase::LoggedOut {
            self.last_active_ms = now_ms;
        }
    }

    /// The page hosting the coordinator unmounts while the tab stays open.
    ///
    /// Gives up the lease but keeps the session; a later [`start`](Self::start)
    /// in the same tab picks the lease up again under the same tab id.
    pub fn detach(&mut self) {
        if !self.is_coordinating() {
            return;
        }
        self.release_lease();
        self.set_phase(TabPhase::Uninitialized);
    }

    /// `beforeunload` / `pagehide`.
    pub fn teardown(&mut self) {
        if self.phase == TabPhase::Uninitialized {
            return;
        }
        if self.holds_lease() {
            self.remove_lease_keys();
        }
        if self.config.clear_auth_on_unload {
            self.auth.clear_auth_data();
        }
        if self.is_coordinating() {
            self.logout_reason = Some(LogoutReason::Unloaded);
            self.set_phase(TabPhase::LoggedOut);
        }
    }

    // =========================================================================
    // BROWSER SIGNALS
    // =========================================================================

    /// A `storage` event raised by another tab.
    pub fn on_storage_change(&mut self, change: &StorageChange) {
        if !self.is_coordinating() {
            return;
        }
        match change.key.as_deref() {
            Some(keys::ACTIVE_TAB_ID) => {
                let Some(new_holder) = change.new_value.as_deref() else {
                    return;
                };
                let taken_over = self
                    .tab_id
                    .as_ref()
                    .is_some_and(|me| me.as_str() != new_holder);
                if taken_over && self.phase == TabPhase::ActiveHolder {
                    log::info!("lease taken over by {new_holder}");
                    self.force_logout(LogoutReason::LeaseTakenOver);
                }
            }
            Some(keys::ACCESS_TOKEN) => {
                if change.old_value.is_some() && change.new_value.is_none() {
                    self.force_logout(LogoutReason::TokenRemoved);
                }
            }
            None => {
                if !self.auth.is_authenticated() {
                    self.force_logout(LogoutReason::TokenRemoved);
                }
            }
            Some(_) => {}
        }
    }

    pub fn on_visibility_change(&mut self, visibility: Visibility, now_ms: i64) {
        if !self.is_coordinating() {
            return;
        }
        match visibility {
            Visibility::Hidden => self.handle_backgrounded(),
            Visibility::Visible => {
                if !self.auth.is_authenticated() {
                    self.force_logout(LogoutReason::TokenRemoved);
                    return;
                }
                self.run_arbitration(now_ms);
                self.record_activity(now_ms);
            }
        }
    }

    /// Window blur. Some browsers fire it before `visibilitychange`.
    pub fn on_blur(&mut self, visibility: Visibility) {
        if visibility == Visibility::Hidden && self.is_coordinating() {
            self.handle_backgrounded();
        }
    }

    pub fn on_focus(&mut self, now_ms: i64) {
        self.record_activity(now_ms);
    }

    /// Page lifecycle `resume`: the page was frozen and is running again.
    pub fn on_resume(&mut self, now_ms: i64) -> bool {
        if !self.is_coordinating() || !self.auth.is_authenticated() {
            return false;
        }
        log::warn!("page resumed from freeze at {now_ms}");
        self.force_logout(LogoutReason::Resumed)
    }

    /// Answer from the server session registry for this tab's heartbeat.
    pub fn on_registry_verdict(&mut self, verdict: &HeartbeatVerdict) {
        if self.phase != TabPhase::ActiveHolder {
            return;
        }
        match verdict {
            HeartbeatVerdict::Granted { version } => {
                if self.registry_version.is_some_and(|prev| *version < prev) {
                    log::warn!("registry version went backwards to {version}");
                }
                self.registry_version = Some(*version);
            }
            HeartbeatVerdict::Superseded { holder } => {
                let is_self = self.tab_id.as_ref().is_some_and(|me| me.as_str() == holder);
                if !is_self {
                    log::info!("registry reports session held by {holder}");
                    self.force_logout(LogoutReason::Superseded);
                }
            }
        }
    }

    // =========================================================================
    // LOGOUT
    // =========================================================================

    /// Clear auth and lease state and redirect to the role's login route.
    ///
    /// Returns false when the tab had already logged out.
    pub fn force_logout(&mut self, reason: LogoutReason) -> bool {
        if self.phase == TabPhase::LoggedOut {
            return false;
        }
        let role = self.auth.user_type().or(self.known_role);
        log::info!("forcing logout: {reason}");

        self.auth.clear_auth_data();
        self.remove_lease_keys();
        self.logout_reason = Some(reason);
        self.set_phase(TabPhase::LoggedOut);

        match role {
            Some(role) => self.navigator.navigate(role.login_route()),
            None => log::debug!("role unknown, staying on current route"),
        }
        true
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn run_arbitration(&mut self, now_ms: i64) -> Option<LeaseDecision> {
        let me = self.tab_id.clone()?;
        if let Some(role) = self.auth.user_type() {
            self.known_role = Some(role);
        }

        let lease = Lease::from_raw(self.read(keys::ACTIVE_TAB_ID), self.read(keys::TAB_HEARTBEAT));
        let decision = decide(lease.as_ref(), me.as_str(), now_ms, self.config.stale_after_ms);
        match decision {
            LeaseDecision::Defer => {
                self.force_logout(LogoutReason::PeerTabActive);
            }
            LeaseDecision::Renew => {
                self.write(keys::TAB_HEARTBEAT, &now_ms.to_string());
                self.set_phase(TabPhase::ActiveHolder);
            }
            LeaseDecision::Claim | LeaseDecision::Reclaim => {
                if let Some(previous) = &lease {
                    log::info!("reclaiming stale lease from {}", previous.holder);
                }
                self.write(keys::ACTIVE_TAB_ID, me.as_str());
                self.write(keys::TAB_HEARTBEAT, &now_ms.to_string());
                self.set_phase(TabPhase::ActiveHolder);
            }
        }
        Some(decision)
    }

    fn handle_backgrounded(&mut self) {
        match self.config.background_policy {
            BackgroundPolicy::Logout => {
                self.release_lease();
                self.force_logout(LogoutReason::Backgrounded);
            }
            BackgroundPolicy::ReleaseLease => {
                self.release_lease();
                self.set_phase(TabPhase::Waiting);
            }
            BackgroundPolicy::Ignore => {}
        }
    }

    /// Tab id left in the tab-scoped store by an earlier coordinator.
    fn restore_tab_id(&self) -> Option<TabId> {
        let raw = match self.tab_store.get(keys::TAB_ID) {
            Ok(raw) => raw?,
            Err(e) => {
                log::warn!("failed to read tab id: {e}");
                return None;
            }
        };
        match TabId::parse(&raw) {
            Ok(tab_id) => Some(tab_id),
            Err(e) => {
                log::debug!("discarding stored tab id {raw:?}: {e}");
                None
            }
        }
    }

    fn release_lease(&self) {
        if self.holds_lease() {
            self.remove_lease_keys();
        }
    }

    fn remove_lease_keys(&self) {
        for key in keys::LEASE_KEYS {
            if let Err(e) = self.auth.store().remove(key) {
                log::warn!("failed to remove {key}: {e}");
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.auth.store().get(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("failed to read {key}: {e}");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.auth.store().set(key, value) {
            log::warn!("failed to write {key}: {e}");
        }
    }

    fn set_phase(&mut self, next: TabPhase) {
        if self.phase != next {
            log::debug!("tab phase {:?} -> {:?}", self.phase, next);
            self.phase = next;
        }
    }
}
