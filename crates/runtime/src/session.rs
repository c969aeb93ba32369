//! Iframe navigation and the page-wide first-navigation gate.

use std::cell::RefCell;
use std::rc::Rc;

use foundation::ValidationError;
use futures::channel::oneshot;
use futures::future::{self, Either, FutureExt, LocalBoxFuture, Shared};
use protocol::{ErrorDetail, Event, ERROR, READY};
use url::Url;

use crate::abort::AbortSignal;
use crate::counterpart::Counterpart;
use crate::error::{Error, ErrorType, RemoteError};
use crate::event_bus::{Callback, MessageBus, Subscription};
use crate::platform::{ErrorListener, Frame, Platform};

#[derive(Default)]
struct SessionState {
    established: bool,
    first_navigation: Option<Shared<LocalBoxFuture<'static, ()>>>,
    serialize: bool,
}

/// Serializes the first navigation of all clients sharing it.
///
/// Until one navigation has succeeded, concurrent navigations wait for the
/// pending first one and then retry, so the remote side creates one session
/// instead of racing several.
#[derive(Clone)]
pub struct SessionCoordinator {
    state: Rc<RefCell<SessionState>>,
}

impl SessionCoordinator {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SessionState {
                serialize: true,
                ..SessionState::default()
            })),
        }
    }

    /// Navigations never wait for each other.
    pub fn unserialized() -> Self {
        Self {
            state: Rc::new(RefCell::new(SessionState::default())),
        }
    }

    pub fn is_established(&self) -> bool {
        self.state.borrow().established
    }

    fn turn(&self) -> Turn {
        let mut state = self.state.borrow_mut();
        if state.established || !state.serialize {
            return Turn::Proceed(None);
        }
        if let Some(pending) = &state.first_navigation {
            return Turn::Wait(pending.clone());
        }
        let (tx, rx) = oneshot::channel::<()>();
        state.first_navigation = Some(rx.map(|_| ()).boxed_local().shared());
        Turn::Proceed(Some(FirstNavigation {
            state: self.state.clone(),
            done: Some(tx),
            succeeded: false,
        }))
    }
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

enum Turn {
    Proceed(Option<FirstNavigation>),
    Wait(Shared<LocalBoxFuture<'static, ()>>),
}

/// Held by the first navigation. Records its outcome and wakes the waiters
/// when it settles or is dropped.
struct FirstNavigation {
    state: Rc<RefCell<SessionState>>,
    done: Option<oneshot::Sender<()>>,
    succeeded: bool,
}

impl FirstNavigation {
    fn finish(mut self, succeeded: bool) {
        self.succeeded = succeeded;
    }
}

impl Drop for FirstNavigation {
    fn drop(&mut self) {
        {
            let mut state = self.state.borrow_mut();
            state.established |= self.succeeded;
            state.first_navigation = None;
        }
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}

/// Unsubscribes the lifecycle listeners of one navigation.
struct Teardown<P: Platform> {
    subscriptions: Vec<Subscription<P>>,
    frame: P::Frame,
    error_listener: ErrorListener,
}

impl<P: Platform> Drop for Teardown<P> {
    fn drop(&mut self) {
        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }
        self.frame.remove_error_listener(&self.error_listener);
    }
}

type Settle = Rc<RefCell<Option<oneshot::Sender<Result<(), Error>>>>>;

fn settle(slot: &Settle, outcome: Result<(), Error>) {
    if let Some(tx) = slot.borrow_mut().take() {
        let _ = tx.send(outcome);
    }
}

fn remote_error(event: &Event) -> RemoteError {
    match event.detail_as::<ErrorDetail>() {
        Ok(detail) => RemoteError::new(
            ErrorType::from(detail.kind),
            detail
                .message
                .unwrap_or_else(|| RemoteError::LOADING_FAILED.to_string()),
        ),
        Err(_) => RemoteError::loading_failed(),
    }
}

/// Navigates the counterpart iframe and waits for the embedded application.
pub struct IframeSession<P: Platform> {
    counterpart: Rc<Counterpart<P>>,
    bus: MessageBus<P>,
    coordinator: SessionCoordinator,
}

impl<P: Platform> Clone for IframeSession<P> {
    fn clone(&self) -> Self {
        Self {
            counterpart: self.counterpart.clone(),
            bus: self.bus.clone(),
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<P: Platform> IframeSession<P> {
    pub fn new(
        counterpart: Rc<Counterpart<P>>,
        bus: MessageBus<P>,
        coordinator: SessionCoordinator,
    ) -> Self {
        Self {
            counterpart,
            bus,
            coordinator,
        }
    }

    /// Checks that the iframe exists and is rendered.
    pub fn frame(&self) -> Result<P::Frame, ValidationError> {
        let frame = self.counterpart.frame().ok_or(ValidationError::IframeMissing)?;
        let (width, height) = frame.rendered_size();
        if width <= 0.0 || height <= 0.0 {
            return Err(ValidationError::IframeNotVisible);
        }
        Ok(frame)
    }

    /// Loads `url` into the iframe.
    ///
    /// Preconditions are checked before returning. The future resolves on
    /// `ready` and fails on `error`, on an iframe load error or when `signal`
    /// aborts (which also stops the iframe). An already aborted signal fails
    /// before anything is navigated.
    pub fn navigate(
        &self,
        url: Url,
        signal: Option<AbortSignal>,
    ) -> Result<LocalBoxFuture<'static, Result<(), Error>>, ValidationError> {
        let frame = self.frame()?;
        let this = self.clone();
        Ok(async move { this.run(frame, url, signal).await }.boxed_local())
    }

    async fn run(self, frame: P::Frame, url: Url, signal: Option<AbortSignal>) -> Result<(), Error> {
        let aborted = || signal.as_ref().is_some_and(|s| s.is_aborted());
        let until_aborted = || match &signal {
            Some(s) => s.aborted().left_future(),
            None => future::pending::<()>().right_future(),
        };

        let first = loop {
            if aborted() {
                return Err(Error::Aborted);
            }
            match self.coordinator.turn() {
                Turn::Proceed(first) => break first,
                Turn::Wait(pending) => {
                    let abort = Box::pin(until_aborted());
                    if let Either::Right(_) = future::select(pending, abort).await {
                        return Err(Error::Aborted);
                    }
                }
            }
        };

        let (tx, rx) = oneshot::channel::<Result<(), Error>>();
        let slot: Settle = Rc::new(RefCell::new(Some(tx)));

        let on_ready: Callback = {
            let slot = slot.clone();
            Rc::new(move |_: &Event| settle(&slot, Ok(())))
        };
        let on_error: Callback = {
            let slot = slot.clone();
            Rc::new(move |event: &Event| settle(&slot, Err(Error::Remote(remote_error(event)))))
        };
        let error_listener: ErrorListener = {
            let slot = slot.clone();
            Rc::new(move || settle(&slot, Err(Error::Remote(RemoteError::loading_failed()))))
        };
        frame.add_error_listener(&error_listener);
        let _teardown = Teardown::<P> {
            subscriptions: vec![
                self.bus.subscribe(READY, on_ready),
                self.bus.subscribe(ERROR, on_error),
            ],
            frame: frame.clone(),
            error_listener,
        };
        drop(slot);

        let cleared = self.bus.cleared();
        frame.set_src(url.as_str());

        let interrupted = future::select(cleared, Box::pin(until_aborted()));
        let outcome = match future::select(rx, interrupted).await {
            Either::Left((Ok(outcome), _)) => outcome,
            // The subscriptions were cleared, e.g. by `destroy`.
            Either::Left((Err(_), _)) | Either::Right((Either::Left(_), _)) => {
                Err(Error::ChannelClosed {
                    request: READY.to_string(),
                })
            }
            Either::Right((Either::Right(_), _)) => {
                frame.stop();
                Err(Error::Aborted)
            }
        };
        if let Some(first) = first {
            first.finish(outcome.is_ok());
        }
        outcome
    }
}
