//! The JS-facing client.

use std::rc::Rc;

use client::{
    Client, ClientOptions, CreateGeometryOptions, DownloadDataOptions, EditGeometryOptions,
    FetchAreaIntersectionsOptions, FetchDataOptions, FetchObjectInfoOptions, HttpResponse, Pending,
    SelectObjectsOptions, ShowMapOptions, ShowOptions,
};
use foundation::{EmbeddingTargetId, Geometry, GeometryType, LayerPath, PageName};
use futures::FutureExt;
use js_sys::{Function, Object, Promise, Reflect, Uint8Array};
use protocol::{CustomValidityType, DataType, Event, EventType, FilterVariables, Source};
use runtime::{Error, PendingRequest};
use serde::Deserialize;
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::HtmlIFrameElement;

use crate::convert::{
    SignalBridge, filter_dates_to_iso, from_js, invalid, js_error, options_from, promise, to_js,
};
use crate::environment;
use crate::platform::{WebFrame, WebPlatform};

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ReloadOptions {
    invalidate_caches: bool,
}

fn target_id(value: String) -> Result<EmbeddingTargetId, JsValue> {
    EmbeddingTargetId::new(value).map_err(invalid)
}

/// An embedding target id, or `{page}` for a well-known page.
fn source_from(value: &JsValue) -> Result<Source, JsValue> {
    if let Some(id) = value.as_string() {
        return target_id(id).map(Source::from);
    }
    let page = Reflect::get(value, &JsValue::from_str("page"))?
        .as_string()
        .unwrap_or_default();
    page.parse::<PageName>().map(Source::from).map_err(invalid)
}

fn parse<T: std::str::FromStr<Err = foundation::ValidationError>>(value: &str) -> Result<T, JsValue> {
    value.parse().map_err(invalid)
}

fn done(_: ()) -> Result<JsValue, JsValue> {
    Ok(JsValue::UNDEFINED)
}

fn json(value: Value) -> Result<JsValue, JsValue> {
    to_js(&value)
}

fn reply(request: Result<PendingRequest, Error>) -> Result<Promise, JsValue> {
    let pending: Pending<Value> = request.map_err(|e| js_error(&e))?.boxed_local();
    Ok(promise(None, pending, json))
}

/// `{status, contentType, body}` with the body as bytes.
fn response_object(response: HttpResponse) -> Result<JsValue, JsValue> {
    let object = Object::new();
    Reflect::set(&object, &"status".into(), &JsValue::from(response.status))?;
    Reflect::set(
        &object,
        &"contentType".into(),
        &response.content_type.map(JsValue::from).unwrap_or(JsValue::NULL),
    )?;
    Reflect::set(&object, &"body".into(), &Uint8Array::from(&response.body[..]))?;
    Ok(object.into())
}

/// Splits an `iframe` element out of the options, since only an id
/// deserializes.
fn client_options(options: &JsValue) -> Result<(Option<HtmlIFrameElement>, ClientOptions), JsValue> {
    if !options.is_object() {
        return Ok((None, options_from(options)?));
    }
    let iframe = Reflect::get(options, &"iframe".into())?;
    let Some(element) = iframe.dyn_ref::<HtmlIFrameElement>().cloned() else {
        return Ok((None, from_js(options.clone())?));
    };
    let copy = Object::assign(&Object::new(), options.unchecked_ref());
    Reflect::delete_property(&copy, &"iframe".into())?;
    Ok((Some(element), from_js(copy.into())?))
}

#[wasm_bindgen]
pub struct EmbedClient {
    client: Client<WebPlatform>,
}

#[wasm_bindgen]
impl EmbedClient {
    /// Without `baseUrl` the client talks to the window that opened or
    /// embeds the current page.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<EmbedClient, JsValue> {
        let env = environment()?;
        let (element, options) = client_options(&options)?;
        let client = match element {
            Some(element) => Client::with_iframe(env, WebFrame::new(element), options),
            None => Client::new(env, options),
        }
        .map_err(invalid)?;
        Ok(Self { client })
    }

    #[wasm_bindgen(getter, js_name = baseUrl)]
    pub fn base_url(&self) -> Option<String> {
        self.client.base_url().map(str::to_string)
    }

    #[wasm_bindgen(getter)]
    pub fn iframe(&self) -> Option<HtmlIFrameElement> {
        self.client.iframe().map(|frame| frame.element().clone())
    }

    pub fn show(&self, source: JsValue, options: JsValue) -> Result<Promise, JsValue> {
        let source = source_from(&source)?;
        let bridge = SignalBridge::from_options(&options)?;
        let mut parsed: ShowOptions = options_from(&options)?;
        parsed.signal = bridge.as_ref().map(SignalBridge::signal);
        let pending = self.client.show(source, parsed).map_err(invalid)?;
        Ok(promise(bridge, pending, done))
    }

    #[wasm_bindgen(js_name = showMap)]
    pub fn show_map(&self, map_view: String, options: JsValue) -> Result<Promise, JsValue> {
        let map_view = target_id(map_view)?;
        let bridge = SignalBridge::from_options(&options)?;
        let mut parsed: ShowMapOptions = options_from(&options)?;
        parsed.signal = bridge.as_ref().map(SignalBridge::signal);
        let pending = self.client.show_map(map_view, parsed).map_err(invalid)?;
        Ok(promise(bridge, pending, done))
    }

    #[wasm_bindgen(js_name = createGeometry)]
    pub fn create_geometry(
        &self,
        map_view: String,
        geometry_type: String,
        options: JsValue,
    ) -> Result<Promise, JsValue> {
        let map_view = target_id(map_view)?;
        let geometry_type: GeometryType = parse(&geometry_type)?;
        let bridge = SignalBridge::from_options(&options)?;
        let mut parsed: CreateGeometryOptions = options_from(&options)?;
        parsed.signal = bridge.as_ref().map(SignalBridge::signal);
        let pending = self
            .client
            .create_geometry(map_view, geometry_type, parsed)
            .map_err(invalid)?;
        Ok(promise(bridge, pending, done))
    }

    #[wasm_bindgen(js_name = editGeometry)]
    pub fn edit_geometry(
        &self,
        map_view: String,
        geometry: JsValue,
        options: JsValue,
    ) -> Result<Promise, JsValue> {
        let map_view = target_id(map_view)?;
        let geometry: Geometry = from_js(geometry)?;
        let bridge = SignalBridge::from_options(&options)?;
        let mut parsed: EditGeometryOptions = options_from(&options)?;
        parsed.signal = bridge.as_ref().map(SignalBridge::signal);
        let pending = self
            .client
            .edit_geometry(map_view, geometry, parsed)
            .map_err(invalid)?;
        Ok(promise(bridge, pending, done))
    }

    #[wasm_bindgen(js_name = selectObjects)]
    pub fn select_objects(&self, map_view: String, options: JsValue) -> Result<Promise, JsValue> {
        let map_view = target_id(map_view)?;
        let bridge = SignalBridge::from_options(&options)?;
        let mut parsed: SelectObjectsOptions = options_from(&options)?;
        parsed.signal = bridge.as_ref().map(SignalBridge::signal);
        let pending = self.client.select_objects(map_view, parsed).map_err(invalid)?;
        Ok(promise(bridge, pending, done))
    }

    pub fn reload(&self, options: JsValue) -> Result<Promise, JsValue> {
        let parsed: ReloadOptions = options_from(&options)?;
        reply(self.client.reload(parsed.invalidate_caches))
    }

    #[wasm_bindgen(js_name = expandNavigator)]
    pub fn expand_navigator(&self, expanded: Option<bool>) -> Result<(), JsValue> {
        self.client
            .expand_navigator(expanded.unwrap_or(true))
            .map_err(|e| js_error(&e))
    }

    #[wasm_bindgen(js_name = setCustomValidity)]
    pub fn set_custom_validity(&self, message: String, kind: Option<String>) -> Result<(), JsValue> {
        let kind = match kind {
            Some(kind) => parse(&kind)?,
            None => CustomValidityType::default(),
        };
        self.client
            .set_custom_validity(&message, kind)
            .map_err(|e| js_error(&e))
    }

    #[wasm_bindgen(js_name = closeMe)]
    pub fn close_me(&self) -> Result<(), JsValue> {
        self.client.close_me().map_err(|e| js_error(&e))
    }

    #[wasm_bindgen(js_name = getData)]
    pub fn get_data(&self, data_type: String) -> Result<Promise, JsValue> {
        let data_type: DataType = parse(&data_type)?;
        reply(self.client.get_data(data_type))
    }

    #[wasm_bindgen(js_name = setFilter)]
    pub fn set_filter(&self, filter: JsValue) -> Result<Promise, JsValue> {
        let filter: FilterVariables = from_js(filter_dates_to_iso(&filter)?)?;
        reply(self.client.set_filter(&filter))
    }

    #[wasm_bindgen(js_name = setLayerVisibility)]
    pub fn set_layer_visibility(&self, layer: JsValue, visible: bool) -> Result<Promise, JsValue> {
        let layer: LayerPath = from_js(layer)?;
        reply(self.client.set_layer_visibility(layer, visible))
    }

    #[wasm_bindgen(js_name = setSelection)]
    pub fn set_selection(&self, layer: JsValue, values: JsValue) -> Result<Promise, JsValue> {
        let layer: LayerPath = from_js(layer)?;
        reply(self.client.set_selection(layer, from_js(values)?))
    }

    #[wasm_bindgen(js_name = addSelection)]
    pub fn add_selection(&self, layer: JsValue, values: JsValue) -> Result<Promise, JsValue> {
        let layer: LayerPath = from_js(layer)?;
        reply(self.client.add_selection(layer, from_js(values)?))
    }

    #[wasm_bindgen(js_name = removeSelection)]
    pub fn remove_selection(&self, layer: JsValue, values: JsValue) -> Result<Promise, JsValue> {
        let layer: LayerPath = from_js(layer)?;
        reply(self.client.remove_selection(layer, from_js(values)?))
    }

    /// Calls `callback` with each `{type, detail}` event. Returns a function
    /// that unsubscribes.
    pub fn on(&self, kind: String, callback: Function) -> Result<Function, JsValue> {
        let kind: EventType = parse(&kind)?;
        let subscription = self.client.on(
            kind,
            Rc::new(move |event: &Event| {
                let result = to_js(event).and_then(|value| callback.call1(&JsValue::NULL, &value));
                if let Err(err) = result {
                    tracing::warn!(target: "embed", "event subscriber failed: {err:?}");
                }
            }),
        );
        let unsubscribe = Closure::<dyn Fn()>::new(move || subscription.unsubscribe());
        Ok(unsubscribe.into_js_value().unchecked_into())
    }

    pub fn destroy(&self) {
        self.client.destroy();
    }

    #[wasm_bindgen(js_name = fetchData)]
    pub fn fetch_data(
        &self,
        source: String,
        data_type: String,
        options: JsValue,
    ) -> Result<Promise, JsValue> {
        let source = target_id(source)?;
        let data_type: DataType = parse(&data_type)?;
        let bridge = SignalBridge::from_options(&options)?;
        let mut parsed: FetchDataOptions = options_from(&options)?;
        parsed.signal = bridge.as_ref().map(SignalBridge::signal);
        let pending = self
            .client
            .fetch_data(source, data_type, parsed)
            .map_err(invalid)?;
        Ok(promise(bridge, pending, response_object))
    }

    #[wasm_bindgen(js_name = downloadData)]
    pub fn download_data(
        &self,
        source: String,
        data_type: String,
        options: JsValue,
    ) -> Result<(), JsValue> {
        let source = target_id(source)?;
        let data_type: DataType = parse(&data_type)?;
        let parsed: DownloadDataOptions = options_from(&options)?;
        self.client
            .download_data(source, data_type, parsed)
            .map_err(|e| js_error(&e))
    }

    #[wasm_bindgen(js_name = fetchObjectInfo)]
    pub fn fetch_object_info(
        &self,
        source: String,
        layer: JsValue,
        object_ids: JsValue,
        options: JsValue,
    ) -> Result<Promise, JsValue> {
        let source = target_id(source)?;
        let layer: LayerPath = from_js(layer)?;
        let object_ids: Vec<Value> = from_js(object_ids)?;
        let bridge = SignalBridge::from_options(&options)?;
        let mut parsed: FetchObjectInfoOptions = options_from(&options)?;
        parsed.signal = bridge.as_ref().map(SignalBridge::signal);
        let pending = self
            .client
            .fetch_object_info(source, layer, object_ids, parsed)
            .map_err(invalid)?;
        Ok(promise(bridge, pending, json))
    }

    #[wasm_bindgen(js_name = fetchAreaIntersections)]
    pub fn fetch_area_intersections(
        &self,
        source: String,
        layer: JsValue,
        geometry: JsValue,
        options: JsValue,
    ) -> Result<Promise, JsValue> {
        let source = target_id(source)?;
        let layer: LayerPath = from_js(layer)?;
        let geometry: Geometry = from_js(geometry)?;
        let bridge = SignalBridge::from_options(&options)?;
        let mut parsed: FetchAreaIntersectionsOptions = options_from(&options)?;
        parsed.signal = bridge.as_ref().map(SignalBridge::signal);
        let pending = self
            .client
            .fetch_area_intersections(source, layer, geometry, parsed)
            .map_err(invalid)?;
        Ok(promise(bridge, pending, json))
    }
}
