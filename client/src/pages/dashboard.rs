//! Role dashboards (`/admin`, `/candidat`).
//!
//! SYSTEM CONTEXT
//! ==============
//! These are the authenticated landing routes and the only routes that run
//! the session coordinator. Mounting a dashboard starts coordination for the
//! tab; leaving it stops it. Logging out clears the shared auth keys, which
//! every other tab observes through the storage event.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod dashboard_test;

use leptos::prelude::*;
use leptos_router::NavigateOptions;
use leptos_router::hooks::use_navigate;
use sessions::UserRole;

use crate::config::ClientConfig;
use crate::state::auth::{AuthState, load_from_browser};
use crate::util::auth::install_unauth_redirect;
use crate::util::session_bridge::{end_session, install_session_coordinator};

pub(crate) fn dashboard_title(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin => "Administration",
        UserRole::Candidate => "My applications",
    }
}

pub(crate) fn greeting(state: &AuthState) -> String {
    match state.user.as_ref().and_then(|u| u.display_name.as_deref()) {
        Some(name) if !name.trim().is_empty() => format!("Hello, {}", name.trim()),
        _ => "Hello".to_owned(),
    }
}

#[component]
pub fn AdminDashboardPage() -> impl IntoView {
    view! { <Dashboard role=UserRole::Admin/> }
}

#[component]
pub fn CandidateDashboardPage() -> impl IntoView {
    view! { <Dashboard role=UserRole::Candidate/> }
}

#[component]
fn Dashboard(role: UserRole) -> impl IntoView {
    let auth = expect_context::<RwSignal<AuthState>>();
    let config = expect_context::<ClientConfig>();
    let navigate = use_navigate();

    install_unauth_redirect(auth, role, navigate.clone());

    // The coordinator has already rewritten storage when it navigates; refresh
    // the snapshot first so the login page does not bounce back here.
    let navigate_after_logout = move |path: &str, options: NavigateOptions| {
        auth.set(load_from_browser());
        navigate(path, options);
    };
    install_session_coordinator(&config, navigate_after_logout);

    let on_logout = move |_| {
        end_session();
        auth.set(AuthState::default());
    };

    let picture = move || auth.get().user.and_then(|u| u.profile_picture);

    view! {
        <Show
            when=move || auth.get().role() == Some(role)
            fallback=move || {
                view! {
                    <div class="dashboard-page">
                        <p>{move || if auth.get().loading { "Loading..." } else { "Redirecting to login..." }}</p>
                    </div>
                }
            }
        >
            <div class="dashboard-page">
                <header class="dashboard-page__header toolbar">
                    <span class="toolbar__title">{dashboard_title(role)}</span>
                    <span class="toolbar__spacer"></span>
                    {move || picture().map(|src| view! { <img class="toolbar__avatar" src=src alt=""/> })}
                    <span class="toolbar__self">{move || greeting(&auth.get())}</span>
                    <button class="btn toolbar__logout" on:click=on_logout title="Logout">
                        "Logout"
                    </button>
                </header>
            </div>
        </Show>
    }
}
