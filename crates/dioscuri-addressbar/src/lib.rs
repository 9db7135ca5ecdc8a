//! Dioscuri Address Bar
//!
//! Turns a submission of the `addressbar` form into a client-side
//! navigation:
//! 1. The default form submission is always suppressed
//! 2. A non-empty `address` field navigates to `/` + encoded(address)
//! 3. An empty or missing field does nothing else
//!
//! The handler itself is host independent. `dioscuri-addressbar-web`
//! binds it to the page with `web-sys`; the proxy server reuses it for
//! the no-JS `/?address=` fallback.

mod encoding;
mod error;
mod handler;

pub use encoding::{decode_component, encode_component};
pub use error::AddressError;
pub use handler::{
    AddressBarHandler, AddressInput, FormFields, Navigator, SubmitEvent, SubmitOutcome,
};

pub type Result<T> = std::result::Result<T, AddressError>;

/// Element id of the address bar form
pub const FORM_ID: &str = "addressbar";

/// Name of the form field carrying the address
pub const ADDRESS_FIELD: &str = "address";

/// `document.readyState` while the HTML is still being parsed
pub const LOADING_STATE: &str = "loading";

/// Whether binding has to wait for `DOMContentLoaded`
pub fn must_wait_for_dom(ready_state: &str) -> bool {
    ready_state == LOADING_STATE
}
