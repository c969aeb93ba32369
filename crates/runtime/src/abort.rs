use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};

/// Cancels the operations holding its signals.
pub struct AbortController {
    sender: RefCell<Option<oneshot::Sender<()>>>,
    signal: AbortSignal,
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            sender: RefCell::new(Some(tx)),
            signal: AbortSignal {
                aborted: Rc::new(Cell::new(false)),
                receiver: rx.shared(),
            },
        }
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Idempotent.
    pub fn abort(&self) {
        self.signal.aborted.set(true);
        if let Some(tx) = self.sender.borrow_mut().take() {
            let _ = tx.send(());
        }
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct AbortSignal {
    aborted: Rc<Cell<bool>>,
    receiver: Shared<oneshot::Receiver<()>>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        self.aborted.get()
    }

    /// Resolves once the controller aborts; never, if it is dropped first.
    pub fn aborted(&self) -> impl Future<Output = ()> + 'static {
        let receiver = self.receiver.clone();
        async move {
            if receiver.await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
    }
}

impl std::fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}
