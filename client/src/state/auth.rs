//! Auth-session state for the current browser user.
//!
//! SYSTEM CONTEXT
//! ==============
//! `localStorage` is the source of truth for authentication; this signal is a
//! render-time snapshot of it. Route guards and dashboards read it, and the
//! login and logout flows refresh it after writing storage.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use sessions::{AuthStore, KeyValueStore, UserRole};

/// Display data for the signed-in user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionUser {
    pub role: UserRole,
    pub display_name: Option<String>,
    pub profile_picture: Option<String>,
}

/// Authentication state tracking the current user and loading status.
///
/// `loading` stays true during SSR and until hydration has read storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<SessionUser>,
    pub loading: bool,
}

impl AuthState {
    #[must_use]
    pub fn loading() -> Self {
        Self { user: None, loading: true }
    }

    /// Snapshot of `auth`. A token without cached role metadata is treated as
    /// signed out, since no route can be chosen for it.
    pub fn from_store<S: KeyValueStore>(auth: &AuthStore<S>) -> Self {
        let user = if auth.is_authenticated() {
            auth.user_type().map(|role| SessionUser {
                role,
                display_name: auth.display_name(),
                profile_picture: auth.profile_picture(),
            })
        } else {
            None
        };
        Self { user, loading: false }
    }

    #[must_use]
    pub fn role(&self) -> Option<UserRole> {
        self.user.as_ref().map(|u| u.role)
    }
}

/// Read the current browser session. Outside the browser this is still loading.
pub fn load_from_browser() -> AuthState {
    #[cfg(feature = "hydrate")]
    {
        AuthState::from_store(&AuthStore::new(crate::util::storage::BrowserStore::local()))
    }
    #[cfg(not(feature = "hydrate"))]
    {
        AuthState::loading()
    }
}
