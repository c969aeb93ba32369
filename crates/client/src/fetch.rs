//! HTTP access to the remote application's server.

use std::rc::Rc;

use futures::future::{self, Either, FutureExt, LocalBoxFuture};
use runtime::{AbortSignal, Error, ErrorType, PlatformError, RemoteError, Trace};
use serde::de::DeserializeOwned;
use url::Url;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// GET without a body, otherwise a JSON POST. Always marked as a
    /// programmatic request.
    pub fn new(url: Url, body: Option<String>) -> Self {
        let mut headers = vec![("X-Requested-With".to_string(), "XMLHttpRequest".to_string())];
        let method = match body {
            Some(_) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                Method::Post
            }
            None => Method::Get,
        };
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::Platform(PlatformError(format!("invalid JSON response: {e}"))))
    }
}

/// The browser's `fetch` and "save as" primitives.
///
/// Dropping a future returned by `send` must cancel the request.
pub trait HttpClient {
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'static, Result<HttpResponse, PlatformError>>;
    fn download(&self, url: &Url) -> Result<(), PlatformError>;
}

/// Issues requests and classifies failed responses.
#[derive(Clone)]
pub struct Gateway {
    http: Rc<dyn HttpClient>,
    trace: Trace,
}

impl Gateway {
    pub fn new(http: Rc<dyn HttpClient>, trace: Trace) -> Self {
        Self { http, trace }
    }

    pub fn fetch(
        &self,
        url: Url,
        body: Option<String>,
        signal: Option<AbortSignal>,
    ) -> LocalBoxFuture<'static, Result<HttpResponse, Error>> {
        let http = self.http.clone();
        let trace = self.trace;
        async move {
            if signal.as_ref().is_some_and(|s| s.is_aborted()) {
                return Err(Error::Aborted);
            }
            trace.note(&format!("Fetch {url}"));
            let response = http.send(HttpRequest::new(url, body));
            let response = match signal {
                Some(signal) => match future::select(response, Box::pin(signal.aborted())).await {
                    Either::Left((response, _)) => response?,
                    Either::Right(_) => return Err(Error::Aborted),
                },
                None => response.await?,
            };
            if !response.is_ok() {
                return Err(Error::Remote(RemoteError::new(
                    ErrorType::from_status(response.status),
                    RemoteError::FETCH_FAILED,
                )));
            }
            Ok(response)
        }
        .boxed_local()
    }

    pub fn download(&self, url: &Url) -> Result<(), Error> {
        self.trace.note(&format!("Download {url}"));
        self.http.download(url)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use futures::channel::oneshot;

    use super::*;

    /// Records requests; responses are queued up front or sent later.
    #[derive(Default)]
    pub struct FakeHttp {
        pub requests: RefCell<Vec<HttpRequest>>,
        pub downloads: RefCell<Vec<Url>>,
        responses: RefCell<VecDeque<HttpResponse>>,
        held: RefCell<Vec<oneshot::Sender<HttpResponse>>>,
    }

    impl FakeHttp {
        pub fn respond(&self, status: u16, body: &str) {
            self.responses.borrow_mut().push_back(HttpResponse {
                status,
                content_type: Some("application/json".to_string()),
                body: body.as_bytes().to_vec(),
            });
        }

        /// Dropped senders mean the request was cancelled.
        pub fn held_open(&self) -> usize {
            self.held.borrow().iter().filter(|tx| !tx.is_canceled()).count()
        }
    }

    impl HttpClient for FakeHttp {
        fn send(
            &self,
            request: HttpRequest,
        ) -> LocalBoxFuture<'static, Result<HttpResponse, PlatformError>> {
            self.requests.borrow_mut().push(request);
            if let Some(response) = self.responses.borrow_mut().pop_front() {
                return future::ready(Ok(response)).boxed_local();
            }
            let (tx, rx) = oneshot::channel();
            self.held.borrow_mut().push(tx);
            rx.map(|r| r.map_err(|_| PlatformError("request dropped".to_string())))
                .boxed_local()
        }

        fn download(&self, url: &Url) -> Result<(), PlatformError> {
            self.downloads.borrow_mut().push(url.clone());
            Ok(())
        }
    }
}
