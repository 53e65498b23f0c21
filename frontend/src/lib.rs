//! Activity, audit and notification sync layer of the back-office frontend.
//!
//! Views get their services through the Leptos bindings in [`state`]; the
//! components underneath ([`audit`], [`activity`], [`notifications`]) are plain
//! Rust and only reach the network through the traits in [`api::transport`].

pub mod activity;
pub mod api;
pub mod audit;
pub mod config;
pub mod logging;
pub mod notifications;
pub mod state;
pub mod utils;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    utils::runtime::spawn_local(async {
        let config = config::init().await;
        logging::init(config.log_level());
        log::info!("backoffice sync layer ready (api: {})", config.api_base_url());
    });
}
