//! Cross-tab session coordination for the recruitment site.
//!
//! This crate owns the browser-agnostic half of the "single live session"
//! policy: the storage key layout, the auth utility over that storage, the
//! heartbeat lease arbitration and the per-tab coordinator state machine.
//! The `client` crate binds it to browser storage and DOM events; the
//! `server` crate reuses the lease rules and wire types for its registry.
//!
//! Everything here is driven by explicit `now_ms` timestamps so the state
//! machine can be exercised deterministically in native unit tests.

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod keys;
pub mod lease;
pub mod store;
pub mod wire;

pub use auth::{AuthStore, LoginSession, UserRole};
pub use config::{BackgroundPolicy, ConfigError, CoordinatorConfig};
pub use coordinator::{LogoutReason, Navigator, SessionCoordinator, TabPhase, Visibility};
pub use lease::{Lease, LeaseDecision, TabId, TabIdError, decide};
pub use store::{KeyValueStore, MemoryStore, StorageChange, StoreError};
pub use wire::{HeartbeatRequest, HeartbeatVerdict, ReleaseRequest};
