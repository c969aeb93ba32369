use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use foundation::ValidationError;
use futures::StreamExt;
use protocol::{error_type, success_type, Event};
use serde_json::Value;

use crate::counterpart::Counterpart;
use crate::error::Error;
use crate::platform::{Platform, ReplyReceiver};
use crate::trace::Trace;

/// Sends messages to the counterpart window.
pub struct Messenger<P: Platform> {
    counterpart: Rc<Counterpart<P>>,
    trace: Trace,
}

impl<P: Platform> Clone for Messenger<P> {
    fn clone(&self) -> Self {
        Self {
            counterpart: self.counterpart.clone(),
            trace: self.trace,
        }
    }
}

impl<P: Platform> Messenger<P> {
    pub fn new(counterpart: Rc<Counterpart<P>>, trace: Trace) -> Self {
        Self { counterpart, trace }
    }

    fn send(&self, event: &Event, transfer: Option<P::Port>) -> Result<(), Error> {
        let window = self
            .counterpart
            .window()
            .ok_or(ValidationError::TargetWindowMissing)?;
        self.trace.sent(event);
        self.counterpart.platform().post_message(
            &window,
            event,
            self.counterpart.target_origin(),
            transfer,
        )?;
        Ok(())
    }

    /// Fire-and-forget.
    pub fn post_event(&self, kind: &str, detail: Value) -> Result<(), Error> {
        self.send(&Event::new(kind, detail), None)
    }

    /// Posts `kind` with a private reply channel and returns the pending reply.
    ///
    /// The message is sent before this returns; dropping the `PendingRequest`
    /// only stops listening for the reply.
    pub fn request(&self, kind: &str, detail: Value) -> Result<PendingRequest, Error> {
        let (receiver, port) = self.counterpart.platform().open_channel()?;
        self.send(&Event::new(kind, detail), Some(port))?;
        Ok(PendingRequest {
            request: kind.to_string(),
            success: success_type(kind),
            error: error_type(kind),
            receiver,
            trace: self.trace,
        })
    }
}

/// Resolves with the `{type}:success` detail (`null` when absent).
#[derive(Debug)]
pub struct PendingRequest {
    request: String,
    success: String,
    error: String,
    receiver: ReplyReceiver,
    trace: Trace,
}

impl PendingRequest {
    pub fn request(&self) -> &str {
        &self.request
    }
}

impl Future for PendingRequest {
    type Output = Result<Value, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            match self.receiver.events.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    return Poll::Ready(Err(Error::ChannelClosed {
                        request: self.request.clone(),
                    }))
                }
                Poll::Ready(Some(reply)) => {
                    self.trace.received(&reply);
                    if reply.kind == self.success {
                        return Poll::Ready(Ok(reply.detail));
                    }
                    if reply.kind == self.error {
                        return Poll::Ready(Err(Error::RequestRejected {
                            request: self.request.clone(),
                        }));
                    }
                    // Unrelated reply types are ignored.
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counterpart::FrameRef;
    use crate::fake::FakePlatform;
    use futures::executor::block_on;
    use futures::future::join;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn messenger(platform: &Rc<FakePlatform>) -> Messenger<FakePlatform> {
        let frame = platform.add_frame("embed", (100.0, 100.0));
        let counterpart = Counterpart::new(
            platform.clone(),
            Some(FrameRef::Element(frame)),
            Some("https://example.test".to_string()),
        );
        Messenger::new(Rc::new(counterpart), Trace::default())
    }

    #[test]
    fn post_event_targets_counterpart_origin() {
        let platform = Rc::new(FakePlatform::new());
        let m = messenger(&platform);
        m.post_event("expandNavigator", json!(true)).unwrap();
        let posted = platform.last_posted().unwrap();
        assert_eq!(posted.event, Event::new("expandNavigator", json!(true)));
        assert_eq!(posted.target_origin, "https://example.test");
        assert!(posted.port.is_none());
    }

    #[test]
    fn success_reply_resolves_with_detail() {
        let platform = Rc::new(FakePlatform::new());
        let m = messenger(&platform);
        let pending = m.request("getData", json!({"dataType": "png"})).unwrap();
        let port = platform.last_posted().unwrap().port.unwrap();
        port.reply(Event::bare("somethingElse"));
        port.reply(Event::new("getData:success", json!("image")));
        assert_eq!(block_on(pending).unwrap(), json!("image"));
    }

    #[test]
    fn error_reply_rejects() {
        let platform = Rc::new(FakePlatform::new());
        let m = messenger(&platform);
        let pending = m.request("setFilter", json!({})).unwrap();
        platform
            .last_posted()
            .unwrap()
            .port
            .unwrap()
            .reply(Event::bare("setFilter:error"));
        assert_eq!(
            block_on(pending).unwrap_err(),
            Error::RequestRejected {
                request: "setFilter".to_string()
            }
        );
    }

    #[test]
    fn concurrent_requests_do_not_cross_resolve() {
        let platform = Rc::new(FakePlatform::new());
        let m = messenger(&platform);
        let first = m.request("setSelection", json!({"values": [1]})).unwrap();
        let second = m.request("setSelection", json!({"values": [2]})).unwrap();
        let posted = platform.posted();
        assert_eq!(posted.len(), 2);

        // Answer the second call first, on its own channel.
        posted[1]
            .port
            .as_ref()
            .unwrap()
            .reply(Event::new("setSelection:success", json!(2)));
        posted[0]
            .port
            .as_ref()
            .unwrap()
            .reply(Event::bare("setSelection:error"));

        let (a, b) = block_on(join(first, second));
        assert!(matches!(a, Err(Error::RequestRejected { .. })));
        assert_eq!(b.unwrap(), json!(2));
    }

    #[test]
    fn closed_channel_fails() {
        let platform = Rc::new(FakePlatform::new());
        let m = messenger(&platform);
        let pending = m.request("reload", json!({"invalidateCaches": true})).unwrap();
        platform.drop_ports();
        assert!(matches!(
            block_on(pending),
            Err(Error::ChannelClosed { .. })
        ));
    }

    #[test]
    fn missing_target_window_fails_without_posting() {
        let platform = Rc::new(FakePlatform::new());
        let counterpart = Counterpart::new(platform.clone(), None, None);
        let m = Messenger::new(Rc::new(counterpart), Trace::default());
        assert_eq!(
            m.post_event("closeMe", Value::Null).unwrap_err(),
            Error::Invalid(ValidationError::TargetWindowMissing)
        );
        assert!(platform.posted().is_empty());
    }
}
