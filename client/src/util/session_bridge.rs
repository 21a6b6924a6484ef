//! Browser adapter for `sessions::SessionCoordinator`.
//!
//! SYSTEM CONTEXT
//! ==============
//! The coordinator is a plain state machine. This module feeds it the
//! browser's clock and events and carries out its one outward effect,
//! client-side navigation:
//!
//! ```text
//! Interval(tick)  ── arbitrate ──┐
//! Interval(tick)  ── check_sleep ┤
//! window storage/blur/focus ─────┤
//! document visibilitychange ─────┼──> SessionCoordinator ──> navigate(login route)
//! document resume / activity ────┤            │
//! window beforeunload/pagehide ──┘            └──> registry heartbeat (optional)
//! ```
//!
//! DESIGN
//! ======
//! One bridge exists per mounted protected page. It lives in a thread-local
//! slot so the `on_cleanup` hook can reach it without capturing `!Send` state.
//! Unmounting detaches the coordinator, which hands back the lease while the
//! session stays signed in, then drops the bridge, which cancels both
//! intervals and removes every listener.
//!
//! Navigation is deferred to a zero-delay timeout. The route change it causes
//! unmounts the page and drops the bridge, which must not happen while the
//! coordinator is still borrowed by the handler that requested it.

#[cfg(feature = "hydrate")]
use leptos::prelude::on_cleanup;
use leptos_router::NavigateOptions;

use crate::config::ClientConfig;

/// Start coordinating this tab for as long as the calling component is mounted.
pub fn install_session_coordinator<F>(config: &ClientConfig, navigate: F)
where
    F: Fn(&str, NavigateOptions) + Clone + 'static,
{
    #[cfg(feature = "hydrate")]
    {
        let generation = browser::install(config, navigate);
        on_cleanup(move || browser::uninstall(generation));
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (config, navigate);
    }
}

/// Logout button: end the session of this tab and every other tab.
///
/// Goes through the mounted coordinator so the lease is released together
/// with the auth keys and the redirect follows the usual logout path.
pub fn end_session() {
    #[cfg(feature = "hydrate")]
    browser::end_session();
}

#[cfg(feature = "hydrate")]
mod browser {
    use std::cell::{Cell, RefCell};
    use std::rc::{Rc, Weak};

    use gloo_timers::callback::{Interval, Timeout};
    use leptos_router::NavigateOptions;
    use sessions::{AuthStore, LeaseDecision, LogoutReason, Navigator, SessionCoordinator, TabPhase, Visibility};
    use wasm_bindgen::JsCast;
    use wasm_bindgen::closure::Closure;

    use crate::config::ClientConfig;
    use crate::net::api;
    use crate::util::storage::BrowserStore;

    type BrowserCoordinator = SessionCoordinator<BrowserStore, BrowserStore, DeferredNavigator>;
    type Shared = Rc<RefCell<BrowserCoordinator>>;

    const ACTIVITY_EVENTS: [&str; 4] = ["mousemove", "keydown", "click", "touchstart"];

    thread_local! {
        static ACTIVE: RefCell<Option<Bridge>> = const { RefCell::new(None) };
        static GENERATION: Cell<u64> = const { Cell::new(0) };
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    struct DeferredNavigator {
        navigate: Rc<dyn Fn(&str)>,
    }

    impl Navigator for DeferredNavigator {
        fn navigate(&self, path: &str) {
            let navigate = Rc::clone(&self.navigate);
            let path = path.to_owned();
            Timeout::new(0, move || navigate(&path)).forget();
        }
    }

    // =========================================================================
    // LISTENERS
    // =========================================================================

    struct Listener {
        target: web_sys::EventTarget,
        event: &'static str,
        callback: Closure<dyn FnMut(web_sys::Event)>,
    }

    impl Listener {
        fn attach(
            target: &web_sys::EventTarget,
            event: &'static str,
            handler: impl FnMut(web_sys::Event) + 'static,
        ) -> Option<Self> {
            let callback = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
            if let Err(e) = target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref()) {
                log::warn!("failed to listen for {event}: {e:?}");
                return None;
            }
            Some(Self { target: target.clone(), event, callback })
        }
    }

    impl Drop for Listener {
        fn drop(&mut self) {
            let _ = self
                .target
                .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
        }
    }

    // =========================================================================
    // BRIDGE
    // =========================================================================

    struct Bridge {
        generation: u64,
        coordinator: Shared,
        registry_enabled: bool,
        _heartbeat: Interval,
        _sleep_check: Interval,
        _listeners: Vec<Listener>,
    }

    #[allow(clippy::cast_possible_truncation)]
    fn now_ms() -> i64 {
        js_sys::Date::now() as i64
    }

    fn current_visibility() -> Visibility {
        let hidden = web_sys::window()
            .and_then(|w| w.document())
            .is_some_and(|d| d.visibility_state() == web_sys::VisibilityState::Hidden);
        if hidden { Visibility::Hidden } else { Visibility::Visible }
    }

    /// Run `f` against the coordinator unless it is already borrowed.
    fn with_coordinator<R>(shared: &Shared, f: impl FnOnce(&mut BrowserCoordinator) -> R) -> Option<R> {
        match shared.try_borrow_mut() {
            Ok(mut coordinator) => Some(f(&mut coordinator)),
            Err(_) => {
                log::debug!("session coordinator busy, dropping event");
                None
            }
        }
    }

    pub(super) fn install<F>(config: &ClientConfig, navigate: F) -> u64
    where
        F: Fn(&str, NavigateOptions) + Clone + 'static,
    {
        let generation = GENERATION.with(|g| {
            let next = g.get() + 1;
            g.set(next);
            next
        });

        let local = BrowserStore::local();
        let navigator = DeferredNavigator {
            navigate: Rc::new(move |path: &str| navigate(path, NavigateOptions::default())),
        };
        let shared: Shared = Rc::new(RefCell::new(SessionCoordinator::new(
            local.clone(),
            BrowserStore::session(),
            navigator,
            config.coordinator,
        )));

        with_coordinator(&shared, |c| c.start(now_ms()));
        if shared.borrow().phase() == TabPhase::Unauthenticated {
            log::debug!("no session to coordinate");
        }

        let registry_enabled = config.registry_enabled;
        let tick_ms = config.coordinator.tick_ms;

        let heartbeat = {
            let shared = Rc::clone(&shared);
            Interval::new(tick_ms, move || {
                let decision = with_coordinator(&shared, |c| c.arbitrate(now_ms())).flatten();
                if registry_enabled && decision.is_some_and(LeaseDecision::grants) {
                    report_to_registry(&shared);
                }
            })
        };
        let sleep_check = {
            let shared = Rc::clone(&shared);
            Interval::new(tick_ms, move || {
                with_coordinator(&shared, |c| c.check_sleep(now_ms(), current_visibility()));
            })
        };

        let listeners = attach_listeners(&shared, &local, registry_enabled);
        let bridge = Bridge {
            generation,
            coordinator: Rc::clone(&shared),
            registry_enabled,
            _heartbeat: heartbeat,
            _sleep_check: sleep_check,
            _listeners: listeners,
        };
        drop(ACTIVE.with(|slot| slot.replace(Some(bridge))));
        generation
    }

    pub(super) fn uninstall(generation: u64) {
        let bridge = ACTIVE.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.as_ref().is_some_and(|b| b.generation == generation) { slot.take() } else { None }
        });
        let Some(bridge) = bridge else {
            return;
        };
        let held = with_coordinator(&bridge.coordinator, |c| {
            let held = registry_lease(c);
            c.detach();
            held
        })
        .flatten();
        if bridge.registry_enabled {
            release_in_registry(held);
        }
    }

    pub(super) fn end_session() {
        let active = ACTIVE.with(|slot| {
            slot.borrow()
                .as_ref()
                .map(|b| (Rc::clone(&b.coordinator), b.registry_enabled))
        });
        let Some((shared, registry_enabled)) = active else {
            AuthStore::new(BrowserStore::local()).clear_auth_data();
            return;
        };
        let held = with_coordinator(&shared, |c| {
            let held = registry_lease(c);
            if !c.force_logout(LogoutReason::SignedOut) {
                c.auth().clear_auth_data();
            }
            held
        })
        .flatten();
        if registry_enabled {
            release_in_registry(held);
        }
    }

    fn attach_listeners(shared: &Shared, local: &BrowserStore, registry_enabled: bool) -> Vec<Listener> {
        let Some(window) = web_sys::window() else {
            return Vec::new();
        };
        let Some(document) = window.document() else {
            return Vec::new();
        };
        let window_target: &web_sys::EventTarget = window.as_ref();
        let document_target: &web_sys::EventTarget = document.as_ref();
        let mut listeners = Vec::new();

        {
            let shared = Rc::clone(shared);
            let local = local.clone();
            listeners.extend(Listener::attach(window_target, "storage", move |event| {
                let Some(event) = event.dyn_ref::<web_sys::StorageEvent>() else {
                    return;
                };
                if let Some(change) = local.change_from_event(event) {
                    with_coordinator(&shared, |c| c.on_storage_change(&change));
                }
            }));
        }
        {
            let shared = Rc::clone(shared);
            listeners.extend(Listener::attach(document_target, "visibilitychange", move |_| {
                with_coordinator(&shared, |c| c.on_visibility_change(current_visibility(), now_ms()));
            }));
        }
        {
            let shared = Rc::clone(shared);
            listeners.extend(Listener::attach(window_target, "blur", move |_| {
                with_coordinator(&shared, |c| c.on_blur(current_visibility()));
            }));
        }
        {
            let shared = Rc::clone(shared);
            listeners.extend(Listener::attach(window_target, "focus", move |_| {
                with_coordinator(&shared, |c| c.on_focus(now_ms()));
            }));
        }
        {
            let shared = Rc::clone(shared);
            listeners.extend(Listener::attach(document_target, "resume", move |_| {
                with_coordinator(&shared, |c| c.on_resume(now_ms()));
            }));
        }
        for event in ACTIVITY_EVENTS {
            let shared = Rc::clone(shared);
            listeners.extend(Listener::attach(document_target, event, move |_| {
                with_coordinator(&shared, |c| c.record_activity(now_ms()));
            }));
        }
        for event in ["beforeunload", "pagehide"] {
            let shared = Rc::clone(shared);
            listeners.extend(Listener::attach(window_target, event, move |_| {
                let released = with_coordinator(&shared, |c| {
                    let held = registry_lease(c);
                    c.teardown();
                    held
                })
                .flatten();
                if registry_enabled {
                    release_in_registry(released);
                }
            }));
        }
        listeners
    }

    // =========================================================================
    // REGISTRY
    // =========================================================================

    /// Token and tab id to report, if this tab currently holds the lease.
    fn registry_lease(c: &BrowserCoordinator) -> Option<(String, String)> {
        if !c.holds_lease() {
            return None;
        }
        let token = c.auth().valid_token()?;
        let tab_id = c.tab_id()?.as_str().to_owned();
        Some((token, tab_id))
    }

    fn release_in_registry(held: Option<(String, String)>) {
        if let Some((token, tab_id)) = held {
            wasm_bindgen_futures::spawn_local(async move {
                api::release_lease(&token, &tab_id).await;
            });
        }
    }

    fn report_to_registry(shared: &Shared) {
        let Some((token, tab_id)) = with_coordinator(shared, |c| registry_lease(c)).flatten() else {
            return;
        };
        let weak: Weak<RefCell<BrowserCoordinator>> = Rc::downgrade(shared);
        wasm_bindgen_futures::spawn_local(async move {
            match api::send_heartbeat(&token, &tab_id).await {
                Ok(verdict) => {
                    if let Some(shared) = weak.upgrade() {
                        with_coordinator(&shared, |c| c.on_registry_verdict(&verdict));
                    }
                }
                Err(e) => log::debug!("registry heartbeat ignored: {e}"),
            }
        });
    }
}
