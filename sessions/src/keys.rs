//! Storage key layout shared by every tab.
//!
//! Persistent keys live in `localStorage` and are visible to all tabs of the
//! browser profile. [`SESSION_ACTIVE`] and [`TAB_ID`] live in
//! `sessionStorage` and are scoped to a single tab.

/// Bearer token. Presence means "authenticated".
pub const ACCESS_TOKEN: &str = "accessToken";
/// Identifier of the tab currently holding the session lease.
pub const ACTIVE_TAB_ID: &str = "activeTabId";
/// Epoch milliseconds of the lease holder's last heartbeat.
pub const TAB_HEARTBEAT: &str = "tabHeartbeat";
/// Tab-scoped marker set once the coordinator initializes.
pub const SESSION_ACTIVE: &str = "sessionActive";
/// Tab-scoped id of this tab, reused by every coordinator the tab starts.
pub const TAB_ID: &str = "tabId";

pub const CANDIDATE_NAME: &str = "candidateName";
pub const ADMIN_NAME: &str = "adminName";
pub const CANDIDATE_PROFILE_PICTURE: &str = "candidateProfilePicture";

/// Keys removed by a logout: the token and all cached display metadata.
pub const AUTH_KEYS: [&str; 4] = [ACCESS_TOKEN, ADMIN_NAME, CANDIDATE_NAME, CANDIDATE_PROFILE_PICTURE];

/// Keys that make up the cross-tab lease.
pub const LEASE_KEYS: [&str; 2] = [ACTIVE_TAB_ID, TAB_HEARTBEAT];
