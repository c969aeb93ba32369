//! Client and per-operation options.
//!
//! All of these deserialize from the camelCase objects a JS caller passes.
//! Abort signals are attached separately since they are not data.

use foundation::{Extent, ExternalLinkKey, Geometry, GlobalId, LayerPath};
use protocol::{DataType, FilterVariables, Layout, OperationMode, SnappingType, TablePart, UiFeature, ZoomTarget};
use runtime::AbortSignal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientOptions {
    /// Without a base URL the client talks to its opener or parent window.
    pub base_url: Option<String>,
    /// Element id of the iframe; ignored without a base URL.
    pub iframe: Option<String>,
    pub web_application: Option<ExternalLinkKey>,
    pub debug: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShowOptions {
    /// Only `pdf`, for report views.
    pub data_type: Option<DataType>,
    pub disabled_ui_features: Option<Vec<UiFeature>>,
    pub expand_navigator: bool,
    pub filter: Option<FilterVariables>,
    pub hide_main_header_and_footer: bool,
    pub hide_workbook_tool_bar: bool,
    pub highlight_global_id: Option<GlobalId>,
    /// Only supported on the welcome page.
    pub label_set: Option<String>,
    pub layout: Option<Layout>,
    pub operation_mode: Option<OperationMode>,
    #[serde(skip)]
    pub signal: Option<AbortSignal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShowMapOptions {
    pub disabled_ui_features: Option<Vec<UiFeature>>,
    pub expand_navigator: bool,
    pub filter: Option<FilterVariables>,
    /// Shown after the map is ready.
    pub geometry: Option<Geometry>,
    pub hide_main_header_and_footer: bool,
    pub hide_workbook_tool_bar: bool,
    pub highlight_global_id: Option<GlobalId>,
    pub layout: Option<Layout>,
    /// Deprecated in favour of `zoom_target`.
    pub location_finder: Option<String>,
    /// Deprecated in favour of `zoom_target`.
    pub map_extent: Option<Extent>,
    pub operation_mode: Option<OperationMode>,
    pub use_map_srs: bool,
    pub zoom_target: Option<ZoomTarget>,
    #[serde(skip)]
    pub signal: Option<AbortSignal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateGeometryOptions {
    /// Layer definitions imported one by one after the map is ready.
    pub additional_layers: Vec<Value>,
    pub disabled_ui_features: Option<Vec<UiFeature>>,
    pub filter: Option<FilterVariables>,
    pub location_finder: Option<String>,
    pub map_extent: Option<Extent>,
    /// A warning is shown when the map is zoomed out beyond this scale.
    pub min_scale: Option<f64>,
    pub operation_mode: Option<OperationMode>,
    pub snapping_layer: Vec<LayerPath>,
    pub snapping_types: Option<Vec<SnappingType>>,
    pub use_map_srs: bool,
    pub zoom_target: Option<ZoomTarget>,
    #[serde(skip)]
    pub signal: Option<AbortSignal>,
}

pub type EditGeometryOptions = CreateGeometryOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectObjectsOptions {
    pub filter: Option<FilterVariables>,
    /// Layers the user may select from.
    pub layers: Vec<LayerPath>,
    pub location_finder: Option<String>,
    pub map_extent: Option<Extent>,
    pub operation_mode: Option<OperationMode>,
    pub use_map_srs: bool,
    #[serde(skip)]
    pub signal: Option<AbortSignal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchDataOptions {
    pub filter: Option<FilterVariables>,
    /// All parts when absent.
    pub parts: Option<Vec<TablePart>>,
    #[serde(skip)]
    pub signal: Option<AbortSignal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadDataOptions {
    pub file_name: Option<String>,
    pub filter: Option<FilterVariables>,
    pub parts: Option<Vec<TablePart>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchObjectInfoOptions {
    pub filter: Option<FilterVariables>,
    pub use_map_srs: Option<bool>,
    pub full_geometries: Option<bool>,
    #[serde(skip)]
    pub signal: Option<AbortSignal>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnit {
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "km")]
    Kilometers,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distance {
    pub value: f64,
    pub length_unit: LengthUnit,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchAreaIntersectionsOptions {
    pub use_map_srs: Option<bool>,
    /// Grows the intersection geometry before intersecting.
    pub buffer: Option<Distance>,
    #[serde(skip)]
    pub signal: Option<AbortSignal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_options_from_js_object() {
        let options: ClientOptions = serde_json::from_str(
            r#"{"baseUrl":"https://example.test/app","iframe":"embed",
                "webApplication":{"repositoryName":"repo","externalLinkId":"abcd"}}"#,
        )
        .unwrap();
        assert_eq!(options.base_url.as_deref(), Some("https://example.test/app"));
        assert_eq!(options.iframe.as_deref(), Some("embed"));
        assert!(!options.debug);
        assert_eq!(options.web_application.unwrap().repository_name, "repo");
    }

    #[test]
    fn enum_values_are_checked_when_deserializing() {
        let err = serde_json::from_str::<ShowOptions>(r#"{"operationMode":"expert"}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid operation mode: expert"));
        assert!(
            serde_json::from_str::<ShowOptions>(r#"{"disabledUiFeatures":["workbook-design","nope"]}"#)
                .is_err()
        );
    }

    #[test]
    fn buffer_carries_its_unit() {
        let options: FetchAreaIntersectionsOptions =
            serde_json::from_str(r#"{"buffer":{"value":2.5,"lengthUnit":"km"}}"#).unwrap();
        assert_eq!(
            options.buffer,
            Some(Distance {
                value: 2.5,
                length_unit: LengthUnit::Kilometers
            })
        );
        assert!(serde_json::from_str::<Distance>(r#"{"value":1,"lengthUnit":"mi"}"#).is_err());
    }

    #[test]
    fn show_map_accepts_zoom_target() {
        let options: ShowMapOptions = serde_json::from_str(
            r#"{"zoomTarget":{"type":"layerDataExtent","layers":["Rivers"]},"useMapSrs":true}"#,
        )
        .unwrap();
        assert!(options.use_map_srs);
        assert_eq!(
            options.zoom_target,
            Some(ZoomTarget::LayerDataExtent {
                layers: vec![LayerPath::from("Rivers")]
            })
        );
    }
}
