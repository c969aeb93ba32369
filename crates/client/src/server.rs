//! Operations served over HTTP by the remote application, without the iframe.

use foundation::{EmbeddingTargetId, Geometry, LayerPath, ValidationError};
use futures::FutureExt;
use protocol::{DataType, Params, Source};
use runtime::{AbortSignal, Error, Platform};
use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

use crate::client::{Client, Pending};
use crate::fetch::HttpResponse;
use crate::options::{
    Distance, DownloadDataOptions, FetchAreaIntersectionsOptions, FetchDataOptions,
    FetchObjectInfoOptions,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ObjectInfoRequest<'a> {
    object_ids: &'a [Value],
    layer_path: &'a LayerPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    use_map_srs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_geometries: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AreaIntersectionsRequest<'a> {
    layer_path: &'a LayerPath,
    geometry: &'a Geometry,
    #[serde(skip_serializing_if = "Option::is_none")]
    use_map_srs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    buffer: Option<Distance>,
}

fn to_body(body: &impl Serialize) -> Result<String, ValidationError> {
    serde_json::to_string(body).map_err(|e| ValidationError::Malformed(e.to_string()))
}

impl<P: Platform> Client<P> {
    fn data_url(
        &self,
        view: &EmbeddingTargetId,
        suffix: &str,
        params: &Params,
    ) -> Result<Url, ValidationError> {
        let path = Source::EmbeddingTarget(view.clone()).path();
        self.url(&format!("{path}{suffix}"), params)
    }

    fn fetch_json(
        &self,
        url: Url,
        body: String,
        signal: Option<AbortSignal>,
    ) -> Pending<Value> {
        let response = self.inner.gateway.fetch(url, Some(body), signal);
        async move { response.await?.json::<Value>() }.boxed_local()
    }

    /// Exports the data of a view. `csv`, `excel` and `json` for tables and
    /// indicators, `pdf` for reports.
    pub fn fetch_data(
        &self,
        view: EmbeddingTargetId,
        data_type: DataType,
        options: FetchDataOptions,
    ) -> Result<Pending<HttpResponse>, ValidationError> {
        self.trace_call(
            "fetchData",
            &[
                json!(view),
                json!(data_type),
                serde_json::to_value(&options).unwrap_or(Value::Null),
            ],
        );
        data_type.ensure_one_of(&DataType::EXPORTS)?;
        let params = Params {
            data_type: Some(data_type),
            filter: options.filter,
            parts: options.parts,
            ..Params::default()
        };
        let url = self.data_url(&view, "", &params)?;
        Ok(self.inner.gateway.fetch(url, None, options.signal))
    }

    /// Lets the browser save the export of a view as a file.
    ///
    /// Without a file name the server derives one from the view name and date.
    pub fn download_data(
        &self,
        view: EmbeddingTargetId,
        data_type: DataType,
        options: DownloadDataOptions,
    ) -> Result<(), Error> {
        self.trace_call(
            "downloadData",
            &[
                json!(view),
                json!(data_type),
                serde_json::to_value(&options).unwrap_or(Value::Null),
            ],
        );
        data_type.ensure_one_of(&DataType::EXPORTS)?;
        let params = Params {
            data_type: Some(data_type),
            file_name: options.file_name,
            filter: options.filter,
            parts: options.parts,
            ..Params::default()
        };
        let url = self.data_url(&view, "", &params)?;
        self.inner.gateway.download(&url)
    }

    /// Fetches the object info of map objects as a feature collection.
    pub fn fetch_object_info(
        &self,
        view: EmbeddingTargetId,
        layer: impl Into<LayerPath>,
        object_ids: Vec<Value>,
        options: FetchObjectInfoOptions,
    ) -> Result<Pending<Value>, ValidationError> {
        let layer = layer.into();
        self.trace_call(
            "fetchObjectInfo",
            &[
                json!(view),
                json!(layer),
                json!(object_ids),
                serde_json::to_value(&options).unwrap_or(Value::Null),
            ],
        );
        let params = Params {
            filter: options.filter,
            ..Params::default()
        };
        let url = self.data_url(&view, "/objectinfo", &params)?;
        let body = to_body(&ObjectInfoRequest {
            object_ids: &object_ids,
            layer_path: &layer,
            use_map_srs: options.use_map_srs,
            full_geometries: options.full_geometries,
        })?;
        Ok(self.fetch_json(url, body, options.signal))
    }

    /// Fetches the parts of a layer's objects intersecting `geometry`.
    pub fn fetch_area_intersections(
        &self,
        view: EmbeddingTargetId,
        layer: impl Into<LayerPath>,
        geometry: Geometry,
        options: FetchAreaIntersectionsOptions,
    ) -> Result<Pending<Value>, ValidationError> {
        let layer = layer.into();
        self.trace_call(
            "fetchAreaIntersections",
            &[
                json!(view),
                json!(layer),
                json!(geometry),
                serde_json::to_value(&options).unwrap_or(Value::Null),
            ],
        );
        let url = self.data_url(&view, "/area-intersections", &Params::default())?;
        let body = to_body(&AreaIntersectionsRequest {
            layer_path: &layer,
            geometry: &geometry,
            use_map_srs: options.use_map_srs,
            buffer: options.buffer,
        })?;
        Ok(self.fetch_json(url, body, options.signal))
    }
}
