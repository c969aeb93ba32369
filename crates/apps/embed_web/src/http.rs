use client::{HttpClient, HttpRequest, HttpResponse, Method};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use gloo_net::http::Request;
use runtime::PlatformError;
use url::Url;
use wasm_bindgen::JsCast;
use web_sys::{HtmlAnchorElement, Window};

use crate::platform::platform_error;

fn gloo_error(err: gloo_net::Error) -> PlatformError {
    PlatformError(err.to_string())
}

/// Aborts the browser fetch when the request future is dropped.
struct AbortOnDrop(web_sys::AbortController);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// `fetch` through gloo-net, and downloads through a hidden anchor.
pub struct WebHttp {
    window: Window,
}

impl WebHttp {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl HttpClient for WebHttp {
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'static, Result<HttpResponse, PlatformError>> {
        async move {
            let abort = AbortOnDrop(web_sys::AbortController::new().map_err(platform_error)?);
            let mut builder = match request.method {
                Method::Get => Request::get(request.url.as_str()),
                Method::Post => Request::post(request.url.as_str()),
            };
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            let signal = abort.0.signal();
            let builder = builder.abort_signal(Some(&signal));
            let prepared = match request.body {
                Some(body) => builder.body(body),
                None => builder.build(),
            }
            .map_err(gloo_error)?;

            let response = prepared.send().await.map_err(gloo_error)?;
            let status = response.status();
            let content_type = response.headers().get("content-type");
            let body = response.binary().await.map_err(gloo_error)?;
            Ok(HttpResponse {
                status,
                content_type,
                body,
            })
        }
        .boxed_local()
    }

    fn download(&self, url: &Url) -> Result<(), PlatformError> {
        let document = self
            .window
            .document()
            .ok_or_else(|| PlatformError("no document".to_string()))?;
        let body = document
            .body()
            .ok_or_else(|| PlatformError("no document body".to_string()))?;
        let anchor: HtmlAnchorElement = document
            .create_element("a")
            .map_err(platform_error)?
            .dyn_into()
            .map_err(|_| PlatformError("not an anchor element".to_string()))?;
        anchor.set_href(url.as_str());
        // Forces a download even for `Content-Disposition: inline`.
        anchor.set_download("");
        anchor.set_hidden(true);
        body.append_child(&anchor).map_err(platform_error)?;
        anchor.click();
        anchor.remove();
        Ok(())
    }
}
