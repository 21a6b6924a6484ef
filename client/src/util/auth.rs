//! Shared auth route-guard helpers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Both dashboards apply the same rule: once auth has loaded, a visitor
//! without a session goes to the dashboard's login route, and a visitor
//! signed in under the other role goes to their own dashboard.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use leptos::prelude::*;
use leptos_router::NavigateOptions;
use sessions::UserRole;

use crate::state::auth::AuthState;

/// Where a visitor of a `required`-role page must be sent, if anywhere.
pub fn redirect_target(state: &AuthState, required: UserRole) -> Option<&'static str> {
    if state.loading {
        return None;
    }
    match state.role() {
        None => Some(required.login_route()),
        Some(role) if role != required => Some(role.home_route()),
        Some(_) => None,
    }
}

/// Keep the current route consistent with [`redirect_target`].
pub fn install_unauth_redirect<F>(auth: RwSignal<AuthState>, required: UserRole, navigate: F)
where
    F: Fn(&str, NavigateOptions) + Clone + 'static,
{
    Effect::new(move || {
        let state = auth.get();
        if let Some(target) = redirect_target(&state, required) {
            navigate(target, NavigateOptions::default());
        }
    });
}
