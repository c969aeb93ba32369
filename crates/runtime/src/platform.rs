//! The browser primitives the client depends on.
//!
//! The wasm binding implements these over `web_sys`; tests use
//! `fake::FakePlatform`.

use std::any::Any;
use std::rc::Rc;

use futures::channel::mpsc::UnboundedReceiver;
use protocol::Event;

use crate::error::PlatformError;

/// A message delivered to the page's window `message` listener.
#[derive(Debug, Clone)]
pub struct InboundMessage<W> {
    pub origin: String,
    /// `None` when the sender window is gone or not a window.
    pub source: Option<W>,
    pub event: Event,
}

/// Window message listener. Identity is the `Rc` pointer.
pub type MessageListener<W> = Rc<dyn Fn(&InboundMessage<W>)>;

/// Iframe load-error listener. Identity is the `Rc` pointer.
pub type ErrorListener = Rc<dyn Fn()>;

/// Receiving end of a private reply channel.
///
/// Dropping it releases the platform endpoint (e.g. closes the retained
/// `MessagePort`).
pub struct ReplyReceiver {
    pub events: UnboundedReceiver<Event>,
    _endpoint: Box<dyn Any>,
}

impl ReplyReceiver {
    pub fn new(events: UnboundedReceiver<Event>, endpoint: impl Any) -> Self {
        Self {
            events,
            _endpoint: Box::new(endpoint),
        }
    }
}

impl std::fmt::Debug for ReplyReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyReceiver").finish_non_exhaustive()
    }
}

/// An iframe element.
pub trait Frame {
    type Window;

    fn content_window(&self) -> Option<Self::Window>;
    /// Rendered `(width, height)` in CSS pixels.
    fn rendered_size(&self) -> (f64, f64);
    fn set_src(&self, url: &str);
    /// Stops an in-flight navigation of the frame's content window.
    fn stop(&self);
    fn add_error_listener(&self, listener: &ErrorListener);
    fn remove_error_listener(&self, listener: &ErrorListener);
}

pub trait Platform: 'static {
    /// Compared by identity.
    type Window: Clone + PartialEq + 'static;
    type Frame: Frame<Window = Self::Window> + Clone + 'static;
    /// Transferable channel endpoint handed to the counterpart.
    type Port: 'static;

    fn add_message_listener(&self, listener: &MessageListener<Self::Window>);
    fn remove_message_listener(&self, listener: &MessageListener<Self::Window>);
    fn find_frame(&self, id: &str) -> Option<Self::Frame>;
    /// `window.opener`, falling back to `window.parent`.
    fn opener_or_parent(&self) -> Option<Self::Window>;
    fn post_message(
        &self,
        target: &Self::Window,
        event: &Event,
        target_origin: &str,
        transfer: Option<Self::Port>,
    ) -> Result<(), PlatformError>;
    /// Opens a two-endpoint channel: replies arrive on the receiver, the port
    /// is transferred to the counterpart.
    fn open_channel(&self) -> Result<(ReplyReceiver, Self::Port), PlatformError>;
}
