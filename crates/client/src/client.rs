use std::rc::Rc;

use foundation::{ExternalLinkKey, LayerPath, ValidationError};
use futures::future::LocalBoxFuture;
use protocol::{
    BaseUrl, CommandType, CustomValidityType, DataType, EventType, FilterVariables, Params,
    RequestType,
};
use runtime::{
    Callback, Counterpart, Error, FrameRef, IframeSession, MessageBus, Messenger, PendingRequest,
    Platform, SessionCoordinator, Subscription, Trace,
};
use serde_json::{Value, json};
use url::Url;

use crate::fetch::{Gateway, HttpClient};
use crate::options::ClientOptions;

/// An operation that validated its arguments and now runs asynchronously.
pub type Pending<T> = LocalBoxFuture<'static, Result<T, Error>>;

/// What a client needs from its host page.
pub struct Environment<P: Platform> {
    pub platform: Rc<P>,
    pub http: Rc<dyn HttpClient>,
    /// Shared by every client on the page.
    pub session: SessionCoordinator,
}

impl<P: Platform> Clone for Environment<P> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            http: self.http.clone(),
            session: self.session.clone(),
        }
    }
}

pub(crate) struct Inner<P: Platform> {
    pub(crate) base_url: Option<BaseUrl>,
    pub(crate) web_application: Option<ExternalLinkKey>,
    pub(crate) counterpart: Rc<Counterpart<P>>,
    pub(crate) bus: MessageBus<P>,
    pub(crate) messenger: Messenger<P>,
    pub(crate) session: IframeSession<P>,
    pub(crate) gateway: Gateway,
    pub(crate) trace: Trace,
}

/// Embeds the remote application in an iframe and talks to it, or, when
/// created without a base URL, talks to the application embedding this page.
pub struct Client<P: Platform> {
    pub(crate) inner: Rc<Inner<P>>,
}

impl<P: Platform> Clone for Client<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: Platform> Client<P> {
    pub fn new(env: Environment<P>, options: ClientOptions) -> Result<Self, ValidationError> {
        let frame = options.iframe.clone().map(FrameRef::Id);
        Self::build(env, frame, options)
    }

    /// Uses `iframe` instead of looking one up by id.
    pub fn with_iframe(
        env: Environment<P>,
        iframe: P::Frame,
        options: ClientOptions,
    ) -> Result<Self, ValidationError> {
        Self::build(env, Some(FrameRef::Element(iframe)), options)
    }

    fn build(
        env: Environment<P>,
        frame: Option<FrameRef<P::Frame>>,
        options: ClientOptions,
    ) -> Result<Self, ValidationError> {
        if let Some(key) = &options.web_application {
            key.validate()?;
        }
        let base_url = options.base_url.as_deref().map(BaseUrl::parse).transpose()?;
        let trace = Trace::new(options.debug);

        let (frame, origin) = match &base_url {
            Some(base) => {
                trace.call(
                    "Create client",
                    &[json!(base.as_str()), json!(options.iframe)],
                );
                (frame, Some(base.origin().to_string()))
            }
            None => {
                trace.note("Create client for parent application");
                (None, None)
            }
        };

        let counterpart = Rc::new(Counterpart::new(env.platform, frame, origin));
        let bus = MessageBus::new(counterpart.clone(), trace);
        Ok(Self {
            inner: Rc::new(Inner {
                base_url,
                web_application: options.web_application,
                messenger: Messenger::new(counterpart.clone(), trace),
                session: IframeSession::new(counterpart.clone(), bus.clone(), env.session),
                gateway: Gateway::new(env.http, trace),
                counterpart,
                bus,
                trace,
            }),
        })
    }

    pub fn base_url(&self) -> Option<&str> {
        self.inner.base_url.as_ref().map(|b| b.as_str())
    }

    /// The iframe used for embedding, resolved on first access.
    pub fn iframe(&self) -> Option<P::Frame> {
        self.inner.counterpart.frame()
    }

    pub(crate) fn url(&self, path: &str, params: &Params) -> Result<Url, ValidationError> {
        self.inner
            .base_url
            .as_ref()
            .ok_or(ValidationError::BaseUrlMissing)?
            .url(path, params)
    }

    pub(crate) fn trace_call(&self, method: &str, args: &[Value]) {
        self.inner.trace.call(method, args);
    }

    /// Subscribes to an event from the counterpart.
    pub fn on(&self, event: EventType, callback: Callback) -> Subscription<P> {
        self.inner.bus.subscribe(event.as_str(), callback)
    }

    /// Removes every subscription, including those of in-flight embeds.
    pub fn destroy(&self) {
        self.trace_call("destroy", &[]);
        self.inner.bus.clear();
    }

    pub(crate) fn request(&self, request: RequestType, detail: Value) -> Result<PendingRequest, Error> {
        self.inner.messenger.request(request.as_str(), detail)
    }

    pub(crate) fn command(&self, command: CommandType, detail: Value) -> Result<(), Error> {
        self.inner.messenger.post_event(command.as_str(), detail)
    }

    /// Reloads the views and, optionally, invalidates the server caches.
    pub fn reload(&self, invalidate_caches: bool) -> Result<PendingRequest, Error> {
        self.trace_call("reload", &[json!({ "invalidateCaches": invalidate_caches })]);
        self.request(RequestType::Reload, json!({ "invalidateCaches": invalidate_caches }))
    }

    pub fn expand_navigator(&self, expanded: bool) -> Result<(), Error> {
        self.trace_call("expandNavigator", &[json!(expanded)]);
        self.command(
            CommandType::ExpandNavigator,
            json!({ "expandNavigator": expanded }),
        )
    }

    /// Shows a validity message in the geometry editor.
    pub fn set_custom_validity(&self, message: &str, kind: CustomValidityType) -> Result<(), Error> {
        self.trace_call("setCustomValidity", &[json!(message), json!(kind)]);
        self.command(
            CommandType::SetCustomValidity,
            json!({ "message": message, "type": kind }),
        )
    }

    /// Asks the embedding application to close this page. Only for clients
    /// without an iframe.
    pub fn close_me(&self) -> Result<(), Error> {
        self.trace_call("closeMe", &[]);
        if self.inner.counterpart.has_frame() {
            return Err(ValidationError::CloseMeFromIframe.into());
        }
        self.command(CommandType::CloseMe, Value::Null)
    }

    /// Gets the data of the current view. Only `png` is supported.
    pub fn get_data(&self, data_type: DataType) -> Result<PendingRequest, Error> {
        self.trace_call("getData", &[json!(data_type)]);
        data_type.ensure_one_of(&[DataType::Png])?;
        self.request(RequestType::GetData, json!({ "dataType": data_type }))
    }

    pub fn set_filter(&self, filter: &FilterVariables) -> Result<PendingRequest, Error> {
        self.trace_call("setFilter", &[filter.to_json()]);
        filter.validate()?;
        self.request(RequestType::SetFilter, json!({ "filter": filter.to_json() }))
    }

    pub fn set_layer_visibility(
        &self,
        layer: impl Into<LayerPath>,
        visible: bool,
    ) -> Result<PendingRequest, Error> {
        let layer = layer.into();
        self.trace_call("setLayerVisibility", &[json!(layer), json!(visible)]);
        self.request(
            RequestType::SetLayerVisibility,
            json!({ "layer": layer, "visible": visible }),
        )
    }

    /// Replaces the selection of a layer with the objects identified by `values`.
    pub fn set_selection(
        &self,
        layer: impl Into<LayerPath>,
        values: Vec<Value>,
    ) -> Result<PendingRequest, Error> {
        self.selection(RequestType::SetSelection, layer.into(), values)
    }

    pub fn add_selection(
        &self,
        layer: impl Into<LayerPath>,
        values: Vec<Value>,
    ) -> Result<PendingRequest, Error> {
        self.selection(RequestType::AddSelection, layer.into(), values)
    }

    pub fn remove_selection(
        &self,
        layer: impl Into<LayerPath>,
        values: Vec<Value>,
    ) -> Result<PendingRequest, Error> {
        self.selection(RequestType::RemoveSelection, layer.into(), values)
    }

    fn selection(
        &self,
        request: RequestType,
        layer: LayerPath,
        values: Vec<Value>,
    ) -> Result<PendingRequest, Error> {
        self.trace_call(request.as_str(), &[json!(layer), json!(values)]);
        self.request(request, json!({ "layer": layer, "values": values }))
    }
}
