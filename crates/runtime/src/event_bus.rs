use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::channel::oneshot;
use protocol::Event;

use crate::counterpart::Counterpart;
use crate::platform::{InboundMessage, MessageListener, Platform};
use crate::trace::Trace;

/// Subscriber callback. Identity is the `Rc` pointer.
pub type Callback = Rc<dyn Fn(&Event)>;

struct Entry {
    kind: String,
    callback: Callback,
}

struct BusInner<P: Platform> {
    counterpart: Rc<Counterpart<P>>,
    trace: Trace,
    entries: RefCell<Vec<Entry>>,
    listener: RefCell<Option<MessageListener<P::Window>>>,
    cleared: RefCell<Vec<oneshot::Sender<()>>>,
}

/// Dispatches inbound messages from the counterpart window to subscribers.
///
/// The window listener is attached on the first subscription and detached
/// when the last one goes away. Messages from any other origin or window are
/// dropped without a trace.
pub struct MessageBus<P: Platform> {
    inner: Rc<BusInner<P>>,
}

impl<P: Platform> Clone for MessageBus<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: Platform> MessageBus<P> {
    pub fn new(counterpart: Rc<Counterpart<P>>, trace: Trace) -> Self {
        Self {
            inner: Rc::new(BusInner {
                counterpart,
                trace,
                entries: RefCell::new(Vec::new()),
                listener: RefCell::new(None),
                cleared: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Callbacks for one type run in registration order.
    pub fn subscribe(&self, kind: impl Into<String>, callback: Callback) -> Subscription<P> {
        let kind = kind.into();
        self.inner.entries.borrow_mut().push(Entry {
            kind: kind.clone(),
            callback: callback.clone(),
        });
        self.attach();
        Subscription {
            bus: Rc::downgrade(&self.inner),
            kind,
            callback,
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// Drops every subscription and detaches the window listener.
    pub fn clear(&self) {
        self.inner.entries.borrow_mut().clear();
        self.inner.detach();
        let waiting = std::mem::take(&mut *self.inner.cleared.borrow_mut());
        for tx in waiting {
            let _ = tx.send(());
        }
    }

    /// Resolves on the next `clear`.
    pub fn cleared(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let mut waiting = self.inner.cleared.borrow_mut();
        waiting.retain(|tx| !tx.is_canceled());
        waiting.push(tx);
        rx
    }

    fn attach(&self) {
        if self.inner.listener.borrow().is_some() {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        let listener: MessageListener<P::Window> = Rc::new(move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch(message);
            }
        });
        self.inner
            .counterpart
            .platform()
            .add_message_listener(&listener);
        *self.inner.listener.borrow_mut() = Some(listener);
    }
}

impl<P: Platform> BusInner<P> {
    fn dispatch(&self, message: &InboundMessage<P::Window>) {
        if !self.counterpart.accepts(message) {
            return;
        }
        self.trace.received(&message.event);
        // Snapshot: callbacks may unsubscribe while we iterate.
        let matching: Vec<Callback> = self
            .entries
            .borrow()
            .iter()
            .filter(|e| e.kind == message.event.kind)
            .map(|e| e.callback.clone())
            .collect();
        for callback in matching {
            callback(&message.event);
        }
    }

    fn remove(&self, kind: &str, callback: &Callback) {
        let empty = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|e| !(e.kind == kind && Rc::ptr_eq(&e.callback, callback)));
            entries.is_empty()
        };
        if empty {
            self.detach();
        }
    }

    fn detach(&self) {
        let listener = self.listener.borrow_mut().take();
        if let Some(listener) = listener {
            self.counterpart.platform().remove_message_listener(&listener);
        }
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the subscription.
pub struct Subscription<P: Platform> {
    bus: Weak<BusInner<P>>,
    kind: String,
    callback: Callback,
}

impl<P: Platform> Subscription<P> {
    /// Removes every entry with this type and callback.
    pub fn unsubscribe(&self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(&self.kind, &self.callback);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakePlatform, FakeWindow};
    use crate::counterpart::FrameRef;
    use std::cell::Cell;

    const ORIGIN: &str = "https://example.test";

    fn bus_for(platform: &Rc<FakePlatform>) -> (MessageBus<FakePlatform>, FakeWindow) {
        let frame = platform.add_frame("embed", (640.0, 480.0));
        let window = frame.window();
        let counterpart = Counterpart::new(
            platform.clone(),
            Some(FrameRef::Element(frame)),
            Some(ORIGIN.to_string()),
        );
        (MessageBus::new(Rc::new(counterpart), Trace::default()), window)
    }

    fn counter() -> (Rc<Cell<u32>>, Callback) {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        (hits, Rc::new(move |_: &Event| h.set(h.get() + 1)))
    }

    #[test]
    fn listener_is_attached_lazily_and_detached_when_empty() {
        let platform = Rc::new(FakePlatform::new());
        let (bus, _) = bus_for(&platform);
        assert_eq!(platform.listener_count(), 0);

        let (_, cb) = counter();
        let a = bus.subscribe("ready", cb.clone());
        let b = bus.subscribe("reload", cb);
        assert_eq!(platform.listener_count(), 1);

        a.unsubscribe();
        assert_eq!(platform.listener_count(), 1);
        b.unsubscribe();
        assert_eq!(platform.listener_count(), 0);
    }

    #[test]
    fn filters_by_origin_and_source_window() {
        let platform = Rc::new(FakePlatform::new());
        let (bus, window) = bus_for(&platform);
        let (hits, cb) = counter();
        let _s = bus.subscribe("reload", cb);

        let other = platform.new_window();
        platform.dispatch(ORIGIN, Some(other), Event::bare("reload"));
        platform.dispatch("https://evil.test", Some(window.clone()), Event::bare("reload"));
        platform.dispatch(ORIGIN, None, Event::bare("reload"));
        assert_eq!(hits.get(), 0);

        platform.dispatch(ORIGIN, Some(window), Event::bare("reload"));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn dispatches_by_type_in_registration_order() {
        let platform = Rc::new(FakePlatform::new());
        let (bus, window) = bus_for(&platform);
        let order = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let order = order.clone();
            bus.subscribe("action", Rc::new(move |_: &Event| order.borrow_mut().push(n)));
        }
        let (other_hits, cb) = counter();
        bus.subscribe("reload", cb);

        platform.dispatch(ORIGIN, Some(window), Event::bare("action"));
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert_eq!(other_hits.get(), 0);
    }

    #[test]
    fn unsubscribe_removes_all_matching_entries() {
        let platform = Rc::new(FakePlatform::new());
        let (bus, window) = bus_for(&platform);
        let (hits, cb) = counter();
        let first = bus.subscribe("reload", cb.clone());
        bus.subscribe("reload", cb.clone());
        bus.subscribe("action", cb);
        first.unsubscribe();
        assert_eq!(bus.subscription_count(), 1);

        platform.dispatch(ORIGIN, Some(window.clone()), Event::bare("reload"));
        platform.dispatch(ORIGIN, Some(window), Event::bare("action"));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let platform = Rc::new(FakePlatform::new());
        let (bus, window) = bus_for(&platform);
        let slot: Rc<RefCell<Option<Subscription<FakePlatform>>>> = Rc::new(RefCell::new(None));
        let hits = Rc::new(Cell::new(0));
        let (s, h) = (slot.clone(), hits.clone());
        let sub = bus.subscribe(
            "ready",
            Rc::new(move |_: &Event| {
                h.set(h.get() + 1);
                if let Some(sub) = s.borrow().as_ref() {
                    sub.unsubscribe();
                }
            }),
        );
        *slot.borrow_mut() = Some(sub);

        platform.dispatch(ORIGIN, Some(window.clone()), Event::bare("ready"));
        platform.dispatch(ORIGIN, Some(window), Event::bare("ready"));
        assert_eq!(hits.get(), 1);
        assert_eq!(platform.listener_count(), 0);
    }

    #[test]
    fn any_origin_without_base_url() {
        let platform = Rc::new(FakePlatform::new());
        let parent = platform.new_window();
        platform.set_parent(parent.clone());
        let counterpart = Counterpart::new(platform.clone(), None, None);
        let bus = MessageBus::new(Rc::new(counterpart), Trace::default());
        let (hits, cb) = counter();
        bus.subscribe("setFilter", cb);

        platform.dispatch("https://anywhere.test", Some(parent), Event::bare("setFilter"));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn clear_detaches() {
        let platform = Rc::new(FakePlatform::new());
        let (bus, window) = bus_for(&platform);
        let (hits, cb) = counter();
        bus.subscribe("reload", cb);
        bus.clear();
        assert_eq!(platform.listener_count(), 0);
        platform.dispatch(ORIGIN, Some(window), Event::bare("reload"));
        assert_eq!(hits.get(), 0);
    }
}
