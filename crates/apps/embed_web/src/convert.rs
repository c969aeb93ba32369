//! Conversions between JS values and the client's Rust types.

use std::rc::Rc;

use client::Pending;
use foundation::ValidationError;
use js_sys::{Array, Date, Object, Promise, Reflect};
use runtime::{AbortController, AbortSignal, Error};
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

/// Invalid arguments surface as a plain `Error`, thrown synchronously.
pub fn invalid(err: ValidationError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// Aborts become a `DOMException` named `AbortError`; remote failures an
/// `Error` carrying the technical `type`.
pub fn js_error(err: &Error) -> JsValue {
    match err {
        Error::Aborted => web_sys::DomException::new_with_message_and_name("Aborted", "AbortError")
            .map(JsValue::from)
            .unwrap_or_else(|e| e),
        Error::Remote(remote) => {
            let error = js_sys::Error::new(&remote.message);
            let _ = Reflect::set(
                &error,
                &JsValue::from_str("type"),
                &JsValue::from_str(remote.error_type.as_str()),
            );
            error.into()
        }
        Error::Invalid(e) => invalid(e.clone()),
        other => js_sys::Error::new(&other.to_string()).into(),
    }
}

pub fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(JsValue::from)
}

/// Copies a filter object with every `Date` replaced by its ISO string, the
/// same `YYYY-MM-DDTHH:MM:SS.mmmZ` text a parsed date encodes to.
pub fn filter_dates_to_iso(filter: &JsValue) -> Result<JsValue, JsValue> {
    let Some(object) = filter.dyn_ref::<Object>() else {
        return Ok(filter.clone());
    };
    let copy = Object::new();
    for entry in Object::entries(object).iter() {
        let entry: Array = entry.unchecked_into();
        let (key, value) = (entry.get(0), entry.get(1));
        let value = match value.dyn_ref::<Date>() {
            Some(date) if date.get_time().is_nan() => {
                return Err(js_sys::TypeError::new("Invalid date in filter").into());
            }
            Some(date) => JsValue::from(date.to_iso_string()),
            None => value,
        };
        Reflect::set(&copy, &key, &value)?;
    }
    Ok(copy.into())
}

/// `undefined` and `null` mean "all defaults".
pub fn options_from<T: DeserializeOwned + Default>(value: &JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    if !value.is_object() {
        return from_js(value.clone());
    }
    let key = JsValue::from_str("filter");
    let filter = Reflect::get(value, &key)?;
    if !filter.is_object() {
        return from_js(value.clone());
    }
    let copy = Object::assign(&Object::new(), value.unchecked_ref());
    Reflect::set(&copy, &key, &filter_dates_to_iso(&filter)?)?;
    from_js(copy.into())
}

/// Plain objects and arrays, never `Map`s.
pub fn to_js(value: &impl Serialize) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

/// Forwards a DOM `AbortSignal` to the client while the operation runs.
pub struct SignalBridge {
    dom: web_sys::AbortSignal,
    onabort: Closure<dyn FnMut()>,
    controller: Rc<AbortController>,
}

impl SignalBridge {
    /// Reads the `signal` member of an options object, if any.
    pub fn from_options(options: &JsValue) -> Result<Option<Self>, JsValue> {
        if !options.is_object() {
            return Ok(None);
        }
        let value = Reflect::get(options, &JsValue::from_str("signal"))?;
        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }
        let dom: web_sys::AbortSignal = value
            .dyn_into()
            .map_err(|_| JsValue::from(js_sys::TypeError::new("signal must be an AbortSignal")))?;

        let controller = Rc::new(AbortController::new());
        if dom.aborted() {
            controller.abort();
        }
        let target = controller.clone();
        let onabort = Closure::<dyn FnMut()>::new(move || target.abort());
        dom.add_event_listener_with_callback("abort", onabort.as_ref().unchecked_ref())?;
        Ok(Some(Self {
            dom,
            onabort,
            controller,
        }))
    }

    pub fn signal(&self) -> AbortSignal {
        self.controller.signal()
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        let _ = self
            .dom
            .remove_event_listener_with_callback("abort", self.onabort.as_ref().unchecked_ref());
    }
}

/// Runs `pending` as a JS promise, keeping `bridge` alive until it settles.
pub fn promise<T: 'static>(
    bridge: Option<SignalBridge>,
    pending: Pending<T>,
    convert: impl FnOnce(T) -> Result<JsValue, JsValue> + 'static,
) -> Promise {
    future_to_promise(async move {
        let _bridge = bridge;
        match pending.await {
            Ok(value) => convert(value),
            Err(err) => Err(js_error(&err)),
        }
    })
}
