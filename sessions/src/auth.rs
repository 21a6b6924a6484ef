//! Auth utility over the persistent store.
//!
//! SYSTEM CONTEXT
//! ==============
//! `accessToken` in `localStorage` is the single source of truth for "is the
//! user logged in"; cached display names tell admins and candidates apart.
//! Pages, the coordinator and the logout button all go through [`AuthStore`]
//! so every tab applies the same interpretation.
//!
//! ERROR HANDLING
//! ==============
//! Read failures degrade to "logged out" and write failures are logged. A
//! broken storage backend must never crash hydration.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use serde::{Deserialize, Serialize};

use crate::keys;
use crate::store::{KeyValueStore, StoreError};

/// Account kind. Drives which login route a forced logout lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Candidate,
}

impl UserRole {
    /// Client route of the role's login page.
    #[must_use]
    pub fn login_route(self) -> &'static str {
        match self {
            Self::Admin => "/admin/login",
            Self::Candidate => "/candidat/login",
        }
    }

    /// Client route of the role's landing page after login.
    #[must_use]
    pub fn home_route(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Candidate => "/candidat",
        }
    }

    /// Path segment used by the backend for this role.
    #[must_use]
    pub fn api_segment(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Candidate => "candidat",
        }
    }
}

/// Credentials and display data persisted after a successful login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSession {
    pub role: UserRole,
    pub access_token: String,
    pub display_name: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

/// Auth reads and writes over a [`KeyValueStore`].
#[derive(Clone)]
pub struct AuthStore<S> {
    store: S,
}

impl<S: KeyValueStore> AuthStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store, for callers that also manage non-auth keys.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current bearer token if present and non-blank.
    pub fn valid_token(&self) -> Option<String> {
        self.read(keys::ACCESS_TOKEN)
            .filter(|token| !token.trim().is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.valid_token().is_some()
    }

    /// Role inferred from cached display metadata. Admin wins if both are set.
    pub fn user_type(&self) -> Option<UserRole> {
        if self.read(keys::ADMIN_NAME).is_some() {
            return Some(UserRole::Admin);
        }
        if self.read(keys::CANDIDATE_NAME).is_some() {
            return Some(UserRole::Candidate);
        }
        None
    }

    /// Cached display name for the current role.
    pub fn display_name(&self) -> Option<String> {
        match self.user_type()? {
            UserRole::Admin => self.read(keys::ADMIN_NAME),
            UserRole::Candidate => self.read(keys::CANDIDATE_NAME),
        }
    }

    pub fn profile_picture(&self) -> Option<String> {
        self.read(keys::CANDIDATE_PROFILE_PICTURE)
    }

    /// Remove the token and all cached display metadata.
    pub fn clear_auth_data(&self) {
        for key in keys::AUTH_KEYS {
            if let Err(e) = self.store.remove(key) {
                log::warn!("failed to clear {key}: {e}");
            }
        }
    }

    /// Persist a fresh login, replacing whatever the other role had cached.
    pub fn store_login(&self, session: &LoginSession) -> Result<(), StoreError> {
        self.clear_auth_data();
        self.store.set(keys::ACCESS_TOKEN, &session.access_token)?;
        match session.role {
            UserRole::Admin => self.store.set(keys::ADMIN_NAME, &session.display_name)?,
            UserRole::Candidate => {
                self.store.set(keys::CANDIDATE_NAME, &session.display_name)?;
                if let Some(picture) = &session.profile_picture {
                    self.store.set(keys::CANDIDATE_PROFILE_PICTURE, picture)?;
                }
            }
        }
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("failed to read {key}: {e}");
                None
            }
        }
    }
}
