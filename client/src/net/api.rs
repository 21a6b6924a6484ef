//! REST API helpers.
//!
//! Client-side (hydrate): real HTTP calls via `gloo-net`.
//! Server-side (SSR): stubs returning errors since these endpoints are only
//! meaningful in the browser.
//!
//! Two backends are involved: the recruitment API at `API_BASE_URL` validates
//! credentials, and this app's own server hosts the session registry under
//! `/api/session/*`.
//!
//! ERROR HANDLING
//! ==============
//! Callers get `Result<_, String>` instead of panics so login and registry
//! failures degrade UI behavior without crashing hydration. Registry calls are
//! fire-and-forget from the coordinator's point of view.

#![allow(clippy::unused_async)]

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

#[cfg(any(test, feature = "hydrate"))]
use serde::Deserialize;
use sessions::{HeartbeatVerdict, LoginSession, UserRole};

/// Body returned by the recruitment backend on a successful login.
#[cfg(any(test, feature = "hydrate"))]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    #[serde(alias = "fullName")]
    name: String,
    #[serde(default)]
    profile_picture: Option<String>,
}

#[cfg(any(test, feature = "hydrate"))]
impl LoginResponse {
    fn into_session(self, role: UserRole) -> LoginSession {
        LoginSession {
            role,
            access_token: self.access_token,
            display_name: self.name,
            profile_picture: match role {
                UserRole::Candidate => self.profile_picture,
                UserRole::Admin => None,
            },
        }
    }
}

#[cfg(any(test, feature = "hydrate"))]
fn login_endpoint(base: &str, role: UserRole) -> String {
    format!("{base}/auth/{}/login", role.api_segment())
}

#[cfg(any(test, feature = "hydrate"))]
fn login_failed_message(status: u16) -> String {
    match status {
        400 | 401 | 403 => "Invalid email or password.".to_owned(),
        _ => format!("login failed: {status}"),
    }
}

#[cfg(any(test, feature = "hydrate"))]
fn heartbeat_failed_message(status: u16) -> String {
    format!("session heartbeat failed: {status}")
}

#[cfg(any(test, feature = "hydrate"))]
fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Sign in through `POST {base}/auth/{admin|candidat}/login`.
///
/// # Errors
///
/// Returns a user-facing message if the request fails, the credentials are
/// rejected, or the response body is malformed.
pub async fn login(base: &str, role: UserRole, email: &str, password: &str) -> Result<LoginSession, String> {
    #[cfg(feature = "hydrate")]
    {
        let payload = serde_json::json!({ "email": email, "password": password });
        let resp = gloo_net::http::Request::post(&login_endpoint(base, role))
            .json(&payload)
            .map_err(|e| e.to_string())?
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.ok() {
            return Err(login_failed_message(resp.status()));
        }
        let body: LoginResponse = resp.json().await.map_err(|e| e.to_string())?;
        Ok(body.into_session(role))
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (base, role, email, password);
        Err("not available on server".to_owned())
    }
}

/// Report this tab's lease to the server registry.
///
/// # Errors
///
/// Returns an error string on network failure or a non-OK status.
pub async fn send_heartbeat(token: &str, tab_id: &str) -> Result<HeartbeatVerdict, String> {
    #[cfg(feature = "hydrate")]
    {
        let body = sessions::HeartbeatRequest { tab_id: tab_id.to_owned() };
        let resp = gloo_net::http::Request::post(sessions::wire::HEARTBEAT_PATH)
            .header("Authorization", &bearer(token))
            .json(&body)
            .map_err(|e| e.to_string())?
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.ok() {
            return Err(heartbeat_failed_message(resp.status()));
        }
        resp.json::<HeartbeatVerdict>().await.map_err(|e| e.to_string())
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (token, tab_id);
        Err("not available on server".to_owned())
    }
}

/// Drop this tab's lease from the server registry. Best effort.
pub async fn release_lease(token: &str, tab_id: &str) {
    #[cfg(feature = "hydrate")]
    {
        let body = sessions::ReleaseRequest { tab_id: tab_id.to_owned() };
        let Ok(req) = gloo_net::http::Request::delete(sessions::wire::LEASE_PATH)
            .header("Authorization", &bearer(token))
            .json(&body)
        else {
            return;
        };
        if let Err(e) = req.send().await {
            log::debug!("lease release failed: {e}");
        }
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (token, tab_id);
    }
}
