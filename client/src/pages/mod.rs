//! Page modules for route-level screens.
//!
//! ARCHITECTURE
//! ============
//! Each page owns route-scoped orchestration. Only the dashboards are
//! protected, and they are the ones that run the session coordinator.

pub mod dashboard;
pub mod home;
pub mod login;
