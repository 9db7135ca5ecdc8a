//! Dioscuri proxy server
//!
//! Serves Gemini capsules over HTTP: `/` is the themed homepage, any other
//! path is decoded back into a capsule address and fetched.

pub mod api;

use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Router,
};
use dioscuri_addressbar::AddressBarHandler;
use dioscuri_core::Browser;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub browser: Arc<Browser>,
    pub address_bar: AddressBarHandler,
}

impl AppState {
    pub fn new(browser: Browser) -> Self {
        Self {
            browser: Arc::new(browser),
            address_bar: AddressBarHandler::new(),
        }
    }
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    let static_dir = state.browser.config().static_dir();

    Router::new()
        .route("/", get(api::home))
        .route("/healthz", get(api::healthz))
        .route("/api/known-hosts", get(api::list_known_hosts))
        .route("/api/known-hosts/{host}", delete(api::forget_known_host))
        .nest_service("/static", ServeDir::new(static_dir))
        .route("/{*address}", get(api::proxy).post(api::answer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
