//! # client
//!
//! Leptos + WASM front-end for the recruitment site.
//!
//! The crate renders the public home page, the role login pages and the role
//! dashboards, and binds the `sessions` coordinator to the browser so that a
//! signed-in user keeps exactly one live tab. With the `ssr` feature the same
//! app is rendered by the `server` crate; with `hydrate` it takes over in the
//! browser.

pub mod app;
pub mod config;
pub mod net;
pub mod pages;
pub mod state;
pub mod util;

/// WASM entry point: install logging and hydrate the server-rendered body.
#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
    leptos::mount::hydrate_body(app::App);
}
