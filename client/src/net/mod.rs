//! Networking modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` handles REST calls to the recruitment backend and to the session
//! registry; the shared wire schema lives in `sessions::wire`.

pub mod api;
