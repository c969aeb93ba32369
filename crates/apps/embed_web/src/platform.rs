use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::mpsc;
use protocol::Event;
use runtime::{
    ErrorListener, Frame, InboundMessage, MessageListener, Platform, PlatformError, ReplyReceiver,
};
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlIFrameElement, MessageChannel, MessageEvent, MessagePort, Window};

pub(crate) fn platform_error(err: JsValue) -> PlatformError {
    PlatformError(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

/// Message data that is not a `{type, detail?}` envelope is ignored.
fn decode(data: JsValue) -> Option<Event> {
    serde_wasm_bindgen::from_value(data).ok()
}

fn encode(event: &Event) -> Result<JsValue, PlatformError> {
    event
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| PlatformError(e.to_string()))
}

/// Drops a callback once the current dispatch has returned.
fn retire<T: 'static>(callback: T) {
    wasm_bindgen_futures::spawn_local(async move { drop(callback) });
}

/// Another browsing context, possibly cross-origin. Only `postMessage` is
/// ever called on it.
#[derive(Debug, Clone)]
pub struct WebWindow(js_sys::Object);

impl PartialEq for WebWindow {
    fn eq(&self, other: &Self) -> bool {
        js_sys::Object::is(&self.0, &other.0)
    }
}

impl WebWindow {
    fn as_window(&self) -> &Window {
        self.0.unchecked_ref()
    }
}

type Registered<L, A> = Rc<RefCell<Vec<(L, Closure<dyn FnMut(A)>)>>>;

#[derive(Clone)]
pub struct WebFrame {
    element: HtmlIFrameElement,
    error_listeners: Registered<ErrorListener, web_sys::Event>,
}

impl WebFrame {
    pub fn new(element: HtmlIFrameElement) -> Self {
        Self {
            element,
            error_listeners: Rc::default(),
        }
    }

    pub fn element(&self) -> &HtmlIFrameElement {
        &self.element
    }
}

impl Frame for WebFrame {
    type Window = WebWindow;

    fn content_window(&self) -> Option<WebWindow> {
        self.element.content_window().map(|w| WebWindow(w.into()))
    }

    fn rendered_size(&self) -> (f64, f64) {
        let rect = self.element.get_bounding_client_rect();
        (rect.width(), rect.height())
    }

    fn set_src(&self, url: &str) {
        self.element.set_src(url);
    }

    fn stop(&self) {
        if let Some(window) = self.element.content_window() {
            let _ = window.stop();
        }
    }

    fn add_error_listener(&self, listener: &ErrorListener) {
        let target = listener.clone();
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| target());
        if let Err(err) = self
            .element
            .add_event_listener_with_callback("error", closure.as_ref().unchecked_ref())
        {
            tracing::warn!(target: "embed", "cannot listen for iframe errors: {}", platform_error(err));
            return;
        }
        self.error_listeners
            .borrow_mut()
            .push((listener.clone(), closure));
    }

    fn remove_error_listener(&self, listener: &ErrorListener) {
        let removed = {
            let mut listeners = self.error_listeners.borrow_mut();
            listeners
                .iter()
                .position(|(l, _)| Rc::ptr_eq(l, listener))
                .map(|i| listeners.remove(i))
        };
        if let Some((_, closure)) = removed {
            let _ = self
                .element
                .remove_event_listener_with_callback("error", closure.as_ref().unchecked_ref());
            retire(closure);
        }
    }
}

/// Keeps the local end of a reply channel open until the reply is consumed.
struct RetainedPort {
    port: MessagePort,
    _onmessage: Closure<dyn FnMut(MessageEvent)>,
}

impl Drop for RetainedPort {
    fn drop(&mut self) {
        self.port.set_onmessage(None);
        self.port.close();
    }
}

/// The page's global window.
pub struct WebPlatform {
    window: Window,
    listeners: Registered<MessageListener<WebWindow>, MessageEvent>,
}

impl WebPlatform {
    pub fn new() -> Result<Self, PlatformError> {
        let window = web_sys::window().ok_or_else(|| PlatformError("no global window".to_string()))?;
        Ok(Self {
            window,
            listeners: Rc::default(),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

impl Drop for WebPlatform {
    fn drop(&mut self) {
        for (_, closure) in self.listeners.borrow_mut().drain(..) {
            let _ = self
                .window
                .remove_event_listener_with_callback("message", closure.as_ref().unchecked_ref());
        }
    }
}

impl Platform for WebPlatform {
    type Window = WebWindow;
    type Frame = WebFrame;
    type Port = MessagePort;

    fn add_message_listener(&self, listener: &MessageListener<WebWindow>) {
        let target = listener.clone();
        let closure = Closure::<dyn FnMut(MessageEvent)>::new(move |e: MessageEvent| {
            let Some(event) = decode(e.data()) else {
                return;
            };
            target(&InboundMessage {
                origin: e.origin(),
                source: e.source().map(WebWindow),
                event,
            });
        });
        if let Err(err) = self
            .window
            .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            tracing::warn!(target: "embed", "cannot listen for messages: {}", platform_error(err));
            return;
        }
        self.listeners.borrow_mut().push((listener.clone(), closure));
    }

    fn remove_message_listener(&self, listener: &MessageListener<WebWindow>) {
        let removed = {
            let mut listeners = self.listeners.borrow_mut();
            listeners
                .iter()
                .position(|(l, _)| Rc::ptr_eq(l, listener))
                .map(|i| listeners.remove(i))
        };
        if let Some((_, closure)) = removed {
            let _ = self
                .window
                .remove_event_listener_with_callback("message", closure.as_ref().unchecked_ref());
            retire(closure);
        }
    }

    fn find_frame(&self, id: &str) -> Option<WebFrame> {
        let element = self.window.document()?.get_element_by_id(id)?;
        element.dyn_into::<HtmlIFrameElement>().ok().map(WebFrame::new)
    }

    fn opener_or_parent(&self) -> Option<WebWindow> {
        let opener = self
            .window
            .opener()
            .ok()
            .filter(|o| !o.is_null() && !o.is_undefined());
        match opener {
            Some(opener) => Some(WebWindow(opener.unchecked_into())),
            // A top-level page is its own parent and has no counterpart.
            None => self
                .window
                .parent()
                .ok()
                .flatten()
                .filter(|parent| !js_sys::Object::is(parent, &self.window))
                .map(|w| WebWindow(w.into())),
        }
    }

    fn post_message(
        &self,
        target: &WebWindow,
        event: &Event,
        target_origin: &str,
        transfer: Option<MessagePort>,
    ) -> Result<(), PlatformError> {
        let message = encode(event)?;
        let window = target.as_window();
        match transfer {
            Some(port) => {
                window.post_message_with_transfer(&message, target_origin, &js_sys::Array::of1(&port))
            }
            None => window.post_message(&message, target_origin),
        }
        .map_err(platform_error)
    }

    fn open_channel(&self) -> Result<(ReplyReceiver, MessagePort), PlatformError> {
        let channel = MessageChannel::new().map_err(platform_error)?;
        let (tx, rx) = mpsc::unbounded();
        let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |e: MessageEvent| {
            if let Some(event) = decode(e.data()) {
                let _ = tx.unbounded_send(event);
            }
        });
        let port = channel.port1();
        port.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        let retained = RetainedPort {
            port,
            _onmessage: onmessage,
        };
        Ok((ReplyReceiver::new(rx, retained), channel.port2()))
    }
}
