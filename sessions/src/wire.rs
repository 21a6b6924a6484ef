//! JSON payloads exchanged with the server session registry.

#[cfg(test)]
#[path = "wire_test.rs"]
mod wire_test;

use serde::{Deserialize, Serialize};

pub const HEARTBEAT_PATH: &str = "/api/session/heartbeat";
pub const LEASE_PATH: &str = "/api/session/lease";

/// Body of `POST /api/session/heartbeat`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub tab_id: String,
}

/// Body of `DELETE /api/session/lease`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRequest {
    pub tab_id: String,
}

/// Registry answer to a heartbeat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HeartbeatVerdict {
    /// The caller holds the session. `version` increases on every change of holder.
    Granted { version: u64 },
    /// Another live tab holds the session.
    Superseded { holder: String },
}
