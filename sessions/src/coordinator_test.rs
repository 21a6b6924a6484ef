use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::auth::LoginSession;
use crate::store::MemoryStore;

const T0: i64 = 1_700_000_000_000;

#[derive(Clone, Default)]
struct RecordingNavigator {
    paths: Rc<RefCell<Vec<String>>>,
}

impl RecordingNavigator {
    fn paths(&self) -> Vec<String> {
        self.paths.borrow().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.paths.borrow_mut().push(path.to_owned());
    }
}

type TestCoordinator = SessionCoordinator<MemoryStore, MemoryStore, RecordingNavigator>;

struct Tab {
    coordinator: TestCoordinator,
    tab_store: MemoryStore,
    navigator: RecordingNavigator,
}

fn open_tab(local: &MemoryStore, config: CoordinatorConfig) -> Tab {
    reopen_tab(local, &MemoryStore::new(), config)
}

/// A new coordinator in an existing tab, e.g. after the dashboard remounts.
fn reopen_tab(local: &MemoryStore, tab_store: &MemoryStore, config: CoordinatorConfig) -> Tab {
    let tab_store = tab_store.clone();
    let navigator = RecordingNavigator::default();
    let coordinator =
        SessionCoordinator::new(local.clone(), tab_store.clone(), navigator.clone(), config);
    Tab { coordinator, tab_store, navigator }
}

fn login(local: &MemoryStore, role: UserRole) {
    let session = LoginSession {
        role,
        access_token: "tok-123".to_owned(),
        display_name: "Amina".to_owned(),
        profile_picture: None,
    };
    AuthStore::new(local.clone()).store_login(&session).unwrap();
    let _ = local.take_changes();
}

fn with_policy(policy: BackgroundPolicy) -> CoordinatorConfig {
    CoordinatorConfig { background_policy: policy, ..CoordinatorConfig::default() }
}

fn deliver(local: &MemoryStore, coordinator: &mut TestCoordinator) {
    for change in local.take_changes() {
        coordinator.on_storage_change(&change);
    }
}

fn lease_of(local: &MemoryStore) -> (Option<String>, Option<String>) {
    (local.get(keys::ACTIVE_TAB_ID).unwrap(), local.get(keys::TAB_HEARTBEAT).unwrap())
}

fn started(local: &MemoryStore, config: CoordinatorConfig) -> Tab {
    let mut tab = open_tab(local, config);
    tab.coordinator.start(T0);
    let _ = local.take_changes();
    tab
}

// =============================================================================
// START
// =============================================================================

#[test]
fn start_without_token_is_unauthenticated_and_drops_leftover_lease() {
    let local = MemoryStore::new();
    local.set(keys::ACTIVE_TAB_ID, "tab_old").unwrap();
    local.set(keys::TAB_HEARTBEAT, "1").unwrap();

    let mut tab = open_tab(&local, CoordinatorConfig::default());
    tab.coordinator.start(T0);

    assert_eq!(tab.coordinator.phase(), TabPhase::Unauthenticated);
    assert_eq!(lease_of(&local), (None, None));
    assert_eq!(tab.tab_store.get(keys::SESSION_ACTIVE).unwrap().as_deref(), Some("true"));
    assert!(tab.navigator.paths().is_empty());
    assert!(tab.coordinator.tab_id().is_none());
}

#[test]
fn start_with_token_claims_free_lease() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);

    let tab = started(&local, CoordinatorConfig::default());

    let me = tab.coordinator.tab_id().unwrap().as_str().to_owned();
    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);
    assert_eq!(lease_of(&local), (Some(me), Some(T0.to_string())));
    assert!(tab.coordinator.holds_lease());
}

#[test]
fn start_twice_is_ignored() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, CoordinatorConfig::default());
    let first = tab.coordinator.tab_id().cloned();

    tab.coordinator.start(T0 + 500);

    assert_eq!(tab.coordinator.tab_id().cloned(), first);
    assert_eq!(local.get(keys::TAB_HEARTBEAT).unwrap(), Some(T0.to_string()));
}

#[test]
fn start_remembers_tab_id_in_tab_store() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let tab = started(&local, CoordinatorConfig::default());

    let me = tab.coordinator.tab_id().unwrap().as_str().to_owned();
    assert_eq!(tab.tab_store.get(keys::TAB_ID).unwrap(), Some(me));
}

#[test]
fn remount_in_same_tab_keeps_session() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let first = started(&local, CoordinatorConfig::default());
    let first_id = first.coordinator.tab_id().cloned();
    let tab_store = first.tab_store.clone();
    drop(first);

    let mut second = reopen_tab(&local, &tab_store, CoordinatorConfig::default());
    second.coordinator.start(T0 + 200);

    assert_eq!(second.coordinator.phase(), TabPhase::ActiveHolder);
    assert_eq!(second.coordinator.tab_id().cloned(), first_id);
    assert!(second.navigator.paths().is_empty());
    assert!(AuthStore::new(local.clone()).is_authenticated());
    assert_eq!(local.get(keys::TAB_HEARTBEAT).unwrap(), Some((T0 + 200).to_string()));
}

#[test]
fn invalid_stored_tab_id_is_replaced() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let tab_store = MemoryStore::new();
    tab_store.set(keys::TAB_ID, "not a tab id").unwrap();

    let mut tab = reopen_tab(&local, &tab_store, CoordinatorConfig::default());
    tab.coordinator.start(T0);

    let me = tab.coordinator.tab_id().unwrap().as_str().to_owned();
    assert!(me.starts_with("tab_"));
    assert_eq!(tab_store.get(keys::TAB_ID).unwrap(), Some(me));
    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);
}

#[test]
fn unavailable_storage_reads_as_logged_out() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    local.set_unavailable(true);

    let mut tab = open_tab(&local, CoordinatorConfig::default());
    tab.coordinator.start(T0);

    assert_eq!(tab.coordinator.phase(), TabPhase::Unauthenticated);
}

// =============================================================================
// ARBITRATION
// =============================================================================

#[test]
fn holder_renews_heartbeat_each_tick() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, CoordinatorConfig::default());

    let decision = tab.coordinator.arbitrate(T0 + 1_000);

    assert_eq!(decision, Some(LeaseDecision::Renew));
    assert_eq!(local.get(keys::TAB_HEARTBEAT).unwrap(), Some((T0 + 1_000).to_string()));
}

#[test]
fn stale_lease_is_reclaimed() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    local.set(keys::ACTIVE_TAB_ID, "tab_A").unwrap();
    local.set(keys::TAB_HEARTBEAT, &(T0 - 5_000).to_string()).unwrap();

    let tab = started(&local, CoordinatorConfig::default());

    let me = tab.coordinator.tab_id().unwrap().as_str().to_owned();
    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);
    assert_eq!(lease_of(&local), (Some(me), Some(T0.to_string())));
    assert!(tab.navigator.paths().is_empty());
}

#[test]
fn garbage_heartbeat_is_reclaimed() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    local.set(keys::ACTIVE_TAB_ID, "tab_A").unwrap();
    local.set(keys::TAB_HEARTBEAT, "not-a-number").unwrap();

    let tab = started(&local, CoordinatorConfig::default());

    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);
}

#[test]
fn fresh_peer_lease_forces_logout() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    local.set(keys::ACTIVE_TAB_ID, "tab_A").unwrap();
    local.set(keys::TAB_HEARTBEAT, &(T0 - 1_000).to_string()).unwrap();

    let tab = started(&local, CoordinatorConfig::default());

    assert_eq!(tab.coordinator.phase(), TabPhase::LoggedOut);
    assert_eq!(tab.coordinator.logout_reason(), Some(LogoutReason::PeerTabActive));
    assert_eq!(tab.navigator.paths(), vec!["/candidat/login".to_owned()]);
    assert_eq!(local.get(keys::ACCESS_TOKEN).unwrap(), None);
    assert_eq!(lease_of(&local), (None, None));
}

#[test]
fn second_tab_defers_to_live_first_tab() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut first = started(&local, CoordinatorConfig::default());
    first.coordinator.arbitrate(T0 + 1_000);

    let mut second = open_tab(&local, CoordinatorConfig::default());
    second.coordinator.start(T0 + 1_500);

    assert_eq!(second.coordinator.logout_reason(), Some(LogoutReason::PeerTabActive));
    assert_eq!(second.navigator.paths(), vec!["/admin/login".to_owned()]);

    // The first tab learns the token is gone through the storage event.
    deliver(&local, &mut first.coordinator);
    assert_eq!(first.coordinator.logout_reason(), Some(LogoutReason::TokenRemoved));
    assert_eq!(first.navigator.paths(), vec!["/admin/login".to_owned()]);
}

// =============================================================================
// CROSS-TAB PROPAGATION
// =============================================================================

#[test]
fn token_removal_event_logs_out_with_cached_role() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, CoordinatorConfig::default());

    AuthStore::new(local.clone()).clear_auth_data();
    deliver(&local, &mut tab.coordinator);

    assert_eq!(tab.coordinator.phase(), TabPhase::LoggedOut);
    assert_eq!(tab.coordinator.logout_reason(), Some(LogoutReason::TokenRemoved));
    assert_eq!(tab.navigator.paths(), vec!["/candidat/login".to_owned()]);
    assert!(!tab.coordinator.auth().is_authenticated());
}

#[test]
fn polling_catches_token_removal_without_event() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut tab = started(&local, CoordinatorConfig::default());

    local.remove(keys::ACCESS_TOKEN).unwrap();
    let decision = tab.coordinator.arbitrate(T0 + 1_000);

    assert_eq!(decision, None);
    assert_eq!(tab.coordinator.logout_reason(), Some(LogoutReason::TokenRemoved));
    assert_eq!(tab.navigator.paths(), vec!["/admin/login".to_owned()]);
}

#[test]
fn lease_written_by_other_tab_logs_out() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, CoordinatorConfig::default());

    tab.coordinator
        .on_storage_change(&StorageChange::new(keys::ACTIVE_TAB_ID, None, Some("tab_other".to_owned())));

    assert_eq!(tab.coordinator.logout_reason(), Some(LogoutReason::LeaseTakenOver));
}

#[test]
fn lease_event_naming_self_or_removal_is_ignored() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, CoordinatorConfig::default());
    let me = tab.coordinator.tab_id().unwrap().as_str().to_owned();

    tab.coordinator
        .on_storage_change(&StorageChange::new(keys::ACTIVE_TAB_ID, None, Some(me.clone())));
    tab.coordinator
        .on_storage_change(&StorageChange::new(keys::ACTIVE_TAB_ID, Some(me), None));
    tab.coordinator
        .on_storage_change(&StorageChange::new(keys::CANDIDATE_NAME, None, Some("x".to_owned())));

    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);
}

#[test]
fn cleared_storage_event_logs_out() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, CoordinatorConfig::default());

    local.clear();
    tab.coordinator.on_storage_change(&StorageChange::cleared());

    assert_eq!(tab.coordinator.logout_reason(), Some(LogoutReason::TokenRemoved));
    assert_eq!(tab.navigator.paths(), vec!["/candidat/login".to_owned()]);
}

// =============================================================================
// SLEEP DETECTION
// =============================================================================

#[test]
fn clock_jump_while_visible_logs_out() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, CoordinatorConfig::default());

    assert!(!tab.coordinator.check_sleep(T0 + 1_000, Visibility::Visible));
    assert!(tab.coordinator.check_sleep(T0 + 7_500, Visibility::Visible));

    assert_eq!(tab.coordinator.logout_reason(), Some(LogoutReason::SleepDetected));
    assert_eq!(tab.navigator.paths(), vec!["/candidat/login".to_owned()]);
}

#[test]
fn gap_at_threshold_is_not_sleep() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, CoordinatorConfig::default());

    assert!(!tab.coordinator.check_sleep(T0 + 5_000, Visibility::Visible));
    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);
}

#[test]
fn clock_jump_while_hidden_is_ignored() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, CoordinatorConfig::default());

    assert!(!tab.coordinator.check_sleep(T0 + 60_000, Visibility::Hidden));
    assert_eq!(tab.coordinator.last_active_ms(), T0 + 60_000);
    assert!(!tab.coordinator.check_sleep(T0 + 61_000, Visibility::Visible));
}

#[test]
fn steady_ticks_never_trigger_logout() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut tab = started(&local, CoordinatorConfig::default());

    for second in 1..=30 {
        let now = T0 + second * 1_000;
        tab.coordinator.arbitrate(now);
        assert!(!tab.coordinator.check_sleep(now, Visibility::Visible));
    }

    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);
    assert!(tab.navigator.paths().is_empty());
}

#[test]
fn continuous_interaction_never_reads_as_sleep() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut tab = started(&local, CoordinatorConfig::default());

    let mut k = 0;
    for second in 1..=30 {
        let tick = T0 + second * 1_000;
        while T0 + (k + 1) * 700 <= tick {
            k += 1;
            if k % 3 == 0 {
                tab.coordinator.on_focus(T0 + k * 700);
            } else {
                tab.coordinator.record_activity(T0 + k * 700);
            }
        }
        tab.coordinator.arbitrate(tick);
        assert!(!tab.coordinator.check_sleep(tick, Visibility::Visible), "logged out at tick {second}");
    }

    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);
    assert!(tab.navigator.paths().is_empty());
}

#[test]
fn interaction_between_late_ticks_is_not_sleep() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, CoordinatorConfig::default());

    // Timer throttled to one tick every 8 s while the user keeps typing.
    for k in 1..=11 {
        tab.coordinator.record_activity(T0 + k * 700);
    }
    assert!(!tab.coordinator.check_sleep(T0 + 8_000, Visibility::Visible));
    tab.coordinator.record_activity(T0 + 12_500);
    assert!(!tab.coordinator.check_sleep(T0 + 16_000, Visibility::Visible));

    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);
    assert!(tab.navigator.paths().is_empty());
}

#[test]
fn activity_and_focus_refresh_last_active() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut tab = started(&local, CoordinatorConfig::default());

    tab.coordinator.record_activity(T0 + 4_000);
    assert_eq!(tab.coordinator.last_active_ms(), T0 + 4_000);
    tab.coordinator.on_focus(T0 + 8_000);
    assert_eq!(tab.coordinator.last_active_ms(), T0 + 8_000);
    assert!(!tab.coordinator.check_sleep(T0 + 9_000, Visibility::Visible));
}

// =============================================================================
// BACKGROUND POLICIES
// =============================================================================

#[test]
fn hidden_under_logout_policy_ends_session() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut tab = started(&local, CoordinatorConfig::default());

    tab.coordinator.on_visibility_change(Visibility::Hidden, T0 + 1_000);

    assert_eq!(tab.coordinator.logout_reason(), Some(LogoutReason::Backgrounded));
    assert_eq!(lease_of(&local), (None, None));
    assert_eq!(tab.navigator.paths(), vec!["/admin/login".to_owned()]);
}

#[test]
fn hidden_under_release_policy_parks_and_reclaims_on_return() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, with_policy(BackgroundPolicy::ReleaseLease));

    tab.coordinator.on_visibility_change(Visibility::Hidden, T0 + 1_000);
    assert_eq!(tab.coordinator.phase(), TabPhase::Waiting);
    assert_eq!(lease_of(&local), (None, None));
    assert!(tab.coordinator.auth().is_authenticated());

    assert_eq!(tab.coordinator.arbitrate(T0 + 2_000), None);
    assert_eq!(lease_of(&local), (None, None));

    tab.coordinator.on_visibility_change(Visibility::Visible, T0 + 3_000);
    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);
    assert!(tab.coordinator.holds_lease());
    assert_eq!(tab.coordinator.last_active_ms(), T0 + 3_000);
    assert!(tab.navigator.paths().is_empty());
}

#[test]
fn parked_tab_ignores_peer_claiming_the_lease() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, with_policy(BackgroundPolicy::ReleaseLease));
    tab.coordinator.on_visibility_change(Visibility::Hidden, T0 + 1_000);

    tab.coordinator
        .on_storage_change(&StorageChange::new(keys::ACTIVE_TAB_ID, None, Some("tab_B".to_owned())));

    assert_eq!(tab.coordinator.phase(), TabPhase::Waiting);
}

#[test]
fn hidden_under_ignore_policy_keeps_lease() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, with_policy(BackgroundPolicy::Ignore));

    tab.coordinator.on_visibility_change(Visibility::Hidden, T0 + 1_000);

    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);
    assert!(tab.coordinator.holds_lease());
}

#[test]
fn blur_only_counts_when_document_hidden() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, CoordinatorConfig::default());

    tab.coordinator.on_blur(Visibility::Visible);
    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);

    tab.coordinator.on_blur(Visibility::Hidden);
    assert_eq!(tab.coordinator.logout_reason(), Some(LogoutReason::Backgrounded));
}

#[test]
fn becoming_visible_without_token_logs_out() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, with_policy(BackgroundPolicy::Ignore));

    local.remove(keys::ACCESS_TOKEN).unwrap();
    tab.coordinator.on_visibility_change(Visibility::Visible, T0 + 1_000);

    assert_eq!(tab.coordinator.logout_reason(), Some(LogoutReason::TokenRemoved));
}

#[test]
fn resume_from_freeze_logs_out() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut tab = started(&local, with_policy(BackgroundPolicy::Ignore));

    assert!(tab.coordinator.on_resume(T0 + 90_000));
    assert_eq!(tab.coordinator.logout_reason(), Some(LogoutReason::Resumed));
}

// =============================================================================
// REGISTRY
// =============================================================================

#[test]
fn granted_verdict_records_version() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut tab = started(&local, CoordinatorConfig::default());

    tab.coordinator.on_registry_verdict(&HeartbeatVerdict::Granted { version: 4 });

    assert_eq!(tab.coordinator.registry_version(), Some(4));
    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);
}

#[test]
fn superseded_verdict_logs_out() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut tab = started(&local, CoordinatorConfig::default());

    tab.coordinator
        .on_registry_verdict(&HeartbeatVerdict::Superseded { holder: "tab_elsewhere".to_owned() });

    assert_eq!(tab.coordinator.logout_reason(), Some(LogoutReason::Superseded));
    assert_eq!(tab.navigator.paths(), vec!["/admin/login".to_owned()]);
}

#[test]
fn superseded_by_self_is_ignored() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut tab = started(&local, CoordinatorConfig::default());
    let me = tab.coordinator.tab_id().unwrap().as_str().to_owned();

    tab.coordinator.on_registry_verdict(&HeartbeatVerdict::Superseded { holder: me });

    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);
}

// =============================================================================
// TEARDOWN & LOGOUT
// =============================================================================

#[test]
fn teardown_releases_lease_and_clears_auth() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, CoordinatorConfig::default());

    tab.coordinator.teardown();

    assert_eq!(lease_of(&local), (None, None));
    assert_eq!(local.get(keys::ACCESS_TOKEN).unwrap(), None);
    assert_eq!(local.get(keys::CANDIDATE_NAME).unwrap(), None);
    assert_eq!(tab.coordinator.phase(), TabPhase::LoggedOut);
    assert_eq!(tab.coordinator.logout_reason(), Some(LogoutReason::Unloaded));
    assert!(tab.navigator.paths().is_empty());
}

#[test]
fn teardown_leaves_peer_lease_alone() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, with_policy(BackgroundPolicy::ReleaseLease));
    tab.coordinator.on_visibility_change(Visibility::Hidden, T0 + 1_000);
    local.set(keys::ACTIVE_TAB_ID, "tab_B").unwrap();

    tab.coordinator.teardown();

    assert_eq!(local.get(keys::ACTIVE_TAB_ID).unwrap().as_deref(), Some("tab_B"));
    assert_eq!(local.get(keys::ACCESS_TOKEN).unwrap(), None);
}

#[test]
fn teardown_can_keep_auth() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let config = CoordinatorConfig { clear_auth_on_unload: false, ..CoordinatorConfig::default() };
    let mut tab = started(&local, config);

    tab.coordinator.teardown();

    assert_eq!(lease_of(&local), (None, None));
    assert!(AuthStore::new(local.clone()).is_authenticated());
}

#[test]
fn detach_releases_lease_and_keeps_session() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut tab = started(&local, CoordinatorConfig::default());

    tab.coordinator.detach();

    assert_eq!(lease_of(&local), (None, None));
    assert!(AuthStore::new(local.clone()).is_authenticated());
    assert_eq!(tab.coordinator.phase(), TabPhase::Uninitialized);
    assert_eq!(tab.coordinator.logout_reason(), None);
    assert!(tab.navigator.paths().is_empty());
}

#[test]
fn detach_leaves_peer_lease_alone() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut tab = started(&local, with_policy(BackgroundPolicy::ReleaseLease));
    tab.coordinator.on_visibility_change(Visibility::Hidden, T0 + 1_000);
    local.set(keys::ACTIVE_TAB_ID, "tab_B").unwrap();

    tab.coordinator.detach();

    assert_eq!(local.get(keys::ACTIVE_TAB_ID).unwrap().as_deref(), Some("tab_B"));
}

#[test]
fn detached_page_lets_another_tab_in_immediately() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut first = started(&local, CoordinatorConfig::default());
    first.coordinator.detach();

    let mut other = open_tab(&local, CoordinatorConfig::default());
    other.coordinator.start(T0 + 100);

    assert_eq!(other.coordinator.phase(), TabPhase::ActiveHolder);
    assert!(other.navigator.paths().is_empty());
}

#[test]
fn sign_out_then_sign_in_again_in_same_tab() {
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut first = started(&local, CoordinatorConfig::default());

    assert!(first.coordinator.force_logout(LogoutReason::SignedOut));
    assert_eq!(lease_of(&local), (None, None));
    assert_eq!(first.navigator.paths(), vec!["/admin/login".to_owned()]);

    login(&local, UserRole::Admin);
    let mut second = reopen_tab(&local, &first.tab_store, CoordinatorConfig::default());
    second.coordinator.start(T0 + 500);

    assert_eq!(second.coordinator.phase(), TabPhase::ActiveHolder);
    assert!(second.navigator.paths().is_empty());
}

#[test]
fn overlapping_triggers_redirect_once() {
    let local = MemoryStore::new();
    login(&local, UserRole::Candidate);
    let mut tab = started(&local, CoordinatorConfig::default());

    AuthStore::new(local.clone()).clear_auth_data();
    deliver(&local, &mut tab.coordinator);
    tab.coordinator.on_visibility_change(Visibility::Hidden, T0 + 100);
    tab.coordinator.check_sleep(T0 + 60_000, Visibility::Visible);
    tab.coordinator.arbitrate(T0 + 60_000);

    assert_eq!(tab.navigator.paths().len(), 1);
    assert!(!tab.coordinator.force_logout(LogoutReason::Superseded));
    assert_eq!(tab.coordinator.logout_reason(), Some(LogoutReason::TokenRemoved));
}

#[test]
fn logout_without_known_role_does_not_navigate() {
    let local = MemoryStore::new();
    local.set(keys::ACCESS_TOKEN, "tok-orphan").unwrap();
    let mut tab = started(&local, CoordinatorConfig::default());
    assert_eq!(tab.coordinator.phase(), TabPhase::ActiveHolder);

    assert!(tab.coordinator.force_logout(LogoutReason::TokenRemoved));

    assert!(tab.navigator.paths().is_empty());
    assert_eq!(tab.coordinator.phase(), TabPhase::LoggedOut);
}

#[test]
fn closure_works_as_navigator() {
    let seen = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    let local = MemoryStore::new();
    login(&local, UserRole::Admin);
    let mut coordinator = SessionCoordinator::new(
        local.clone(),
        MemoryStore::new(),
        move |path: &str| *sink.borrow_mut() = Some(path.to_owned()),
        CoordinatorConfig::default(),
    );
    coordinator.start(T0);

    coordinator.force_logout(LogoutReason::Resumed);

    assert_eq!(seen.borrow().as_deref(), Some("/admin/login"));
}

#[test]
fn visibility_from_state() {
    assert_eq!(Visibility::from_state("hidden"), Visibility::Hidden);
    assert_eq!(Visibility::from_state("visible"), Visibility::Visible);
    assert_eq!(Visibility::from_state("prerender"), Visibility::Visible);
}
