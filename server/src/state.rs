//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! only carries the session registry, which is itself an `Arc` around a
//! mutex, so cloning the state per request is cheap.

use crate::config::ServerConfig;
use crate::registry::SessionRegistry;

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
}

impl AppState {
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        Self { registry: SessionRegistry::new(config.session.stale_after_ms) }
    }
}
