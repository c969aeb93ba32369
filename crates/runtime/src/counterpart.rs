use std::cell::RefCell;
use std::rc::Rc;

use crate::platform::{Frame, InboundMessage, Platform};

/// How the iframe was configured.
#[derive(Debug, Clone)]
pub enum FrameRef<F> {
    Element(F),
    /// Looked up by element id on first use.
    Id(String),
}

/// The window this client talks to, and the origin it must come from.
///
/// With a frame configured, that is the frame's content window. Without one
/// (the client runs inside the embedded application), it is the opener or
/// parent window.
pub struct Counterpart<P: Platform> {
    platform: Rc<P>,
    frame_ref: Option<FrameRef<P::Frame>>,
    frame: RefCell<Option<P::Frame>>,
    origin: Option<String>,
}

impl<P: Platform> Counterpart<P> {
    pub fn new(platform: Rc<P>, frame_ref: Option<FrameRef<P::Frame>>, origin: Option<String>) -> Self {
        let frame = match &frame_ref {
            Some(FrameRef::Element(f)) => Some(f.clone()),
            _ => None,
        };
        Self {
            platform,
            frame_ref,
            frame: RefCell::new(frame),
            origin,
        }
    }

    pub fn platform(&self) -> &Rc<P> {
        &self.platform
    }

    pub fn has_frame(&self) -> bool {
        self.frame_ref.is_some()
    }

    /// Resolves the iframe, caching a successful id lookup.
    pub fn frame(&self) -> Option<P::Frame> {
        if let Some(frame) = self.frame.borrow().as_ref() {
            return Some(frame.clone());
        }
        let Some(FrameRef::Id(id)) = &self.frame_ref else {
            return None;
        };
        let found = self.platform.find_frame(id)?;
        *self.frame.borrow_mut() = Some(found.clone());
        Some(found)
    }

    pub fn window(&self) -> Option<P::Window> {
        if self.has_frame() {
            self.frame()?.content_window()
        } else {
            self.platform.opener_or_parent()
        }
    }

    /// `None` accepts any origin.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn target_origin(&self) -> &str {
        self.origin.as_deref().unwrap_or("*")
    }

    /// Origin and source window must both match.
    pub fn accepts(&self, message: &InboundMessage<P::Window>) -> bool {
        if let Some(origin) = &self.origin {
            if message.origin != *origin {
                return false;
            }
        }
        match (&message.source, self.window()) {
            (Some(source), Some(window)) => *source == window,
            _ => false,
        }
    }
}
