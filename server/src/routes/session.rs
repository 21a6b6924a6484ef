//! Session registry routes.
//!
//! `POST /api/session/heartbeat` and `DELETE /api/session/lease`, both
//! authenticated with `Authorization: Bearer <accessToken>`. The token is not
//! validated here; it only identifies which session a lease belongs to.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::Json;
use sessions::{HeartbeatRequest, HeartbeatVerdict, ReleaseRequest, TabId};

use crate::state::AppState;

// =============================================================================
// EXTRACTOR
// =============================================================================

/// Bearer token from the `Authorization` header. Rejects with 401.
pub struct BearerToken(pub String);

impl<S> axum::extract::FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_bearer)
            .map(|token| Self(token.to_owned()))
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Token part of a `Bearer <token>` header value. The scheme is case-insensitive.
pub(crate) fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

fn parse_tab(raw: &str) -> Result<TabId, StatusCode> {
    TabId::parse(raw).map_err(|e| {
        tracing::debug!(error = %e, "rejected tab id");
        StatusCode::BAD_REQUEST
    })
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/session/heartbeat`: claim or renew the lease for the caller's tab.
pub async fn heartbeat(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Json(body): Json<HeartbeatRequest>,
) -> Result<Json<HeartbeatVerdict>, StatusCode> {
    let tab = parse_tab(&body.tab_id)?;
    let verdict = state.registry.heartbeat(&token, &tab);
    if let HeartbeatVerdict::Superseded { holder } = &verdict {
        tracing::info!(%tab, %holder, "heartbeat from superseded tab");
    }
    Ok(Json(verdict))
}

/// `DELETE /api/session/lease`: drop the lease if the caller's tab holds it.
pub async fn release(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Json(body): Json<ReleaseRequest>,
) -> StatusCode {
    let tab = match parse_tab(&body.tab_id) {
        Ok(tab) => tab,
        Err(status) => return status,
    };
    state.registry.release(&token, &tab);
    StatusCode::NO_CONTENT
}
