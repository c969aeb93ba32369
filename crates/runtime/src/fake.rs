//! In-memory browser for tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::channel::mpsc::{self, UnboundedSender};
use protocol::Event;

use crate::error::PlatformError;
use crate::platform::{ErrorListener, Frame, InboundMessage, MessageListener, Platform, ReplyReceiver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeWindow(pub u32);

struct FrameState {
    window: FakeWindow,
    size: Cell<(f64, f64)>,
    sources: RefCell<Vec<String>>,
    stops: Cell<u32>,
    error_listeners: RefCell<Vec<ErrorListener>>,
}

/// An iframe whose navigations are recorded instead of performed.
#[derive(Clone)]
pub struct FakeFrame {
    state: Rc<FrameState>,
}

impl FakeFrame {
    pub fn window(&self) -> FakeWindow {
        self.state.window.clone()
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.state.size.set((width, height));
    }

    /// Every `src` assigned so far.
    pub fn sources(&self) -> Vec<String> {
        self.state.sources.borrow().clone()
    }

    pub fn stop_count(&self) -> u32 {
        self.state.stops.get()
    }

    pub fn error_listener_count(&self) -> usize {
        self.state.error_listeners.borrow().len()
    }

    /// Fires the element's `error` event.
    pub fn fail_loading(&self) {
        let listeners: Vec<ErrorListener> = self.state.error_listeners.borrow().clone();
        for listener in listeners {
            listener();
        }
    }
}

impl Frame for FakeFrame {
    type Window = FakeWindow;

    fn content_window(&self) -> Option<FakeWindow> {
        Some(self.state.window.clone())
    }

    fn rendered_size(&self) -> (f64, f64) {
        self.state.size.get()
    }

    fn set_src(&self, url: &str) {
        self.state.sources.borrow_mut().push(url.to_string());
    }

    fn stop(&self) {
        self.state.stops.set(self.state.stops.get() + 1);
    }

    fn add_error_listener(&self, listener: &ErrorListener) {
        self.state.error_listeners.borrow_mut().push(listener.clone());
    }

    fn remove_error_listener(&self, listener: &ErrorListener) {
        self.state
            .error_listeners
            .borrow_mut()
            .retain(|l| !Rc::ptr_eq(l, listener));
    }
}

/// The transferred end of a reply channel. Tests answer requests through it.
#[derive(Clone)]
pub struct FakePort {
    replies: UnboundedSender<Event>,
}

impl FakePort {
    pub fn reply(&self, event: Event) {
        let _ = self.replies.unbounded_send(event);
    }
}

/// A message passed to `post_message`.
#[derive(Clone)]
pub struct Posted {
    pub target: FakeWindow,
    pub event: Event,
    pub target_origin: String,
    pub port: Option<FakePort>,
}

#[derive(Default)]
pub struct FakePlatform {
    next_window: Cell<u32>,
    listeners: RefCell<Vec<MessageListener<FakeWindow>>>,
    frames: RefCell<Vec<(String, FakeFrame)>>,
    parent: RefCell<Option<FakeWindow>>,
    posted: RefCell<Vec<Posted>>,
    fail_posts: Cell<bool>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_window(&self) -> FakeWindow {
        let id = self.next_window.get() + 1;
        self.next_window.set(id);
        FakeWindow(id)
    }

    /// A frame findable by `id`.
    pub fn add_frame(&self, id: &str, size: (f64, f64)) -> FakeFrame {
        let frame = self.new_frame(size);
        self.frames
            .borrow_mut()
            .push((id.to_string(), frame.clone()));
        frame
    }

    pub fn new_frame(&self, size: (f64, f64)) -> FakeFrame {
        FakeFrame {
            state: Rc::new(FrameState {
                window: self.new_window(),
                size: Cell::new(size),
                sources: RefCell::new(Vec::new()),
                stops: Cell::new(0),
                error_listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn set_parent(&self, window: FakeWindow) {
        *self.parent.borrow_mut() = Some(window);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Delivers a message to every window listener, as the browser would.
    pub fn dispatch(&self, origin: &str, source: Option<FakeWindow>, event: Event) {
        let message = InboundMessage {
            origin: origin.to_string(),
            source,
            event,
        };
        let listeners: Vec<MessageListener<FakeWindow>> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(&message);
        }
    }

    pub fn posted(&self) -> Vec<Posted> {
        self.posted.borrow().clone()
    }

    pub fn posted_types(&self) -> Vec<String> {
        self.posted
            .borrow()
            .iter()
            .map(|p| p.event.kind.clone())
            .collect()
    }

    pub fn last_posted(&self) -> Option<Posted> {
        self.posted.borrow().last().cloned()
    }

    /// Releases the recorded ports, closing their channels.
    pub fn drop_ports(&self) {
        for posted in self.posted.borrow_mut().iter_mut() {
            posted.port = None;
        }
    }

    /// Makes every following `post_message` fail.
    pub fn fail_posts(&self) {
        self.fail_posts.set(true);
    }
}

impl Platform for FakePlatform {
    type Window = FakeWindow;
    type Frame = FakeFrame;
    type Port = FakePort;

    fn add_message_listener(&self, listener: &MessageListener<FakeWindow>) {
        self.listeners.borrow_mut().push(listener.clone());
    }

    fn remove_message_listener(&self, listener: &MessageListener<FakeWindow>) {
        self.listeners
            .borrow_mut()
            .retain(|l| !Rc::ptr_eq(l, listener));
    }

    fn find_frame(&self, id: &str) -> Option<FakeFrame> {
        self.frames
            .borrow()
            .iter()
            .find(|(frame_id, _)| frame_id == id)
            .map(|(_, frame)| frame.clone())
    }

    fn opener_or_parent(&self) -> Option<FakeWindow> {
        self.parent.borrow().clone()
    }

    fn post_message(
        &self,
        target: &FakeWindow,
        event: &Event,
        target_origin: &str,
        transfer: Option<FakePort>,
    ) -> Result<(), PlatformError> {
        if self.fail_posts.get() {
            return Err(PlatformError("DataCloneError".to_string()));
        }
        self.posted.borrow_mut().push(Posted {
            target: target.clone(),
            event: event.clone(),
            target_origin: target_origin.to_string(),
            port: transfer,
        });
        Ok(())
    }

    fn open_channel(&self) -> Result<(ReplyReceiver, FakePort), PlatformError> {
        let (tx, rx) = mpsc::unbounded();
        Ok((ReplyReceiver::new(rx, ()), FakePort { replies: tx }))
    }
}
