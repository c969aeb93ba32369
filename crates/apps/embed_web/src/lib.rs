//! Browser binding of the embedding client.
//!
//! All clients on a page share one platform and one session coordinator, so
//! the first navigation of the page is serialized across clients.

use std::cell::RefCell;
use std::rc::Rc;

use client::Environment;
use runtime::SessionCoordinator;
use wasm_bindgen::prelude::*;

mod bindings;
mod convert;
mod http;
mod logging;
mod platform;

pub use bindings::EmbedClient;
pub use http::WebHttp;
pub use platform::{WebFrame, WebPlatform, WebWindow};

thread_local! {
    static ENVIRONMENT: RefCell<Option<Environment<WebPlatform>>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    logging::init();
}

/// The page-wide environment, created on first use.
pub(crate) fn environment() -> Result<Environment<WebPlatform>, JsValue> {
    ENVIRONMENT.with(|cell| {
        if let Some(env) = cell.borrow().as_ref() {
            return Ok(env.clone());
        }
        let platform =
            WebPlatform::new().map_err(|e| JsValue::from(js_sys::Error::new(&e.to_string())))?;
        let http = WebHttp::new(platform.window().clone());
        let env = Environment {
            platform: Rc::new(platform),
            http: Rc::new(http),
            session: SessionCoordinator::new(),
        };
        *cell.borrow_mut() = Some(env.clone());
        Ok(env)
    })
}
