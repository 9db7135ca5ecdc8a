//! Dioscuri Address Bar, browser side
//!
//! Built with `wasm-pack build --target web` into `static/pkg`; the
//! default theme loads `dioscuri_addressbar_web.js` from there. On other
//! targets this crate is empty.

#[cfg(target_arch = "wasm32")]
mod web;
