//! Browser binding via `web-sys`
//!
//! Waits for `DOMContentLoaded` (or binds immediately if the document is
//! already parsed), then routes `submit` events on `#addressbar` through
//! `AddressBarHandler::on_submit`.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Event, FormData, HtmlFormElement, Window};

use dioscuri_addressbar::{
    must_wait_for_dom, AddressBarHandler, FormFields, Navigator, SubmitEvent, FORM_ID,
};

struct BrowserSubmit {
    event: Event,
    data: Option<FormData>,
}

impl BrowserSubmit {
    fn new(event: Event) -> Self {
        let data = event
            .target()
            .and_then(|target| target.dyn_into::<HtmlFormElement>().ok())
            .and_then(|form| FormData::new_with_form(&form).ok());
        Self { event, data }
    }
}

impl FormFields for BrowserSubmit {
    fn field(&self, name: &str) -> Option<String> {
        // `get` yields null for absent fields and a File for file inputs
        self.data.as_ref().and_then(|data| data.get(name).as_string())
    }
}

impl SubmitEvent for BrowserSubmit {
    fn prevent_default(&self) {
        self.event.prevent_default();
    }
}

struct WindowNavigator(Window);

impl Navigator for WindowNavigator {
    fn navigate(&self, destination: &str) {
        if let Err(err) = self.0.location().set_href(destination) {
            tracing::warn!(?err, "Failed to set location");
        }
    }
}

/// Entry point run when the wasm module is instantiated
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    _ = console_log::init_with_level(log::Level::Debug);
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    if must_wait_for_dom(&document.ready_state()) {
        let target = document.clone();
        let on_ready = Closure::once_into_js(move || {
            if let Err(err) = bind(&window, &document) {
                tracing::warn!(?err, "Address bar not bound");
            }
        });
        target.add_event_listener_with_callback("DOMContentLoaded", on_ready.unchecked_ref())?;
        Ok(())
    } else {
        bind(&window, &document)
    }
}

fn bind(window: &Window, document: &Document) -> Result<(), JsValue> {
    let form = document
        .get_element_by_id(FORM_ID)
        .ok_or_else(|| JsValue::from_str("address bar form not found"))?
        .dyn_into::<HtmlFormElement>()?;

    let handler = AddressBarHandler::new();
    let navigator = WindowNavigator(window.clone());
    let on_submit = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        handler.on_submit(&BrowserSubmit::new(event), &navigator);
    });
    form.add_event_listener_with_callback("submit", on_submit.as_ref().unchecked_ref())?;

    // Lives as long as the page; navigation tears it down
    on_submit.forget();
    Ok(())
}
