//! Query parameters understood by the embedded application.
//!
//! `Params` is a flat record; `encode` validates it and produces the query
//! string with a fixed key order so equal options always yield equal URLs.

use foundation::{Extent, ExternalLinkKey, GeometryType, GlobalId, LayerPath, ValidationError};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::filter::FilterVariables;

/// A closed set of wire strings, parsed with a `ValidationError` naming the
/// rejected value.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident / $error:ident {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| ValidationError::$error(s.to_string()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for &'static str {
            fn from(v: $name) -> Self {
                v.as_str()
            }
        }
    };
}

wire_enum! {
    /// Parts of the UI a caller can switch off.
    pub enum UiFeature / InvalidUiFeature {
        WorkbookDesign => "workbook-design",
        WorkbookMapAddLayer => "workbook-map-add-layer",
        WorkbookViewManagement => "workbook-view-management",
    }
}

wire_enum! {
    /// The mode a workbook is operated in.
    #[derive(Default)]
    pub enum OperationMode / InvalidOperationMode {
        #[default]
        Normal => "normal",
        Simplified => "simplified",
    }
}

wire_enum! {
    /// A part of a table export.
    pub enum TablePart / InvalidTablePart {
        Columns => "columns",
        Values => "values",
        Totals => "totals",
    }
}

wire_enum! {
    /// Arrangement of the embedded workbook around its views.
    pub enum Layout / InvalidLayout {
        Default => "default",
        Compact => "compact",
    }
}

wire_enum! {
    /// What the geometry editor snaps to on the snapping layers.
    pub enum SnappingType / InvalidSnappingType {
        Vertex => "vertex",
        Edge => "edge",
    }
}

wire_enum! {
    /// Output format of exports and `getData`.
    pub enum DataType / InvalidDataType {
        Csv => "csv",
        Excel => "excel",
        Json => "json",
        Pdf => "pdf",
        Png => "png",
    }
}

impl DataType {
    /// Formats a table view can be exported to.
    pub const EXPORTS: [DataType; 4] = [DataType::Csv, DataType::Excel, DataType::Json, DataType::Pdf];

    /// Fails unless the type is one an operation accepts.
    pub fn ensure_one_of(self, supported: &[DataType]) -> Result<Self, ValidationError> {
        if supported.contains(&self) {
            Ok(self)
        } else {
            Err(ValidationError::InvalidDataType(self.as_str().to_string()))
        }
    }
}

/// Interactive workflow started on load.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    EditGeometry,
    SelectObjects,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::EditGeometry => "editGeometry",
            Action::SelectObjects => "selectObjects",
        }
    }
}

/// Kind of view the embedding target must be.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TargetType {
    Map,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Map => "MAP",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    pub action: Option<Action>,
    pub data_type: Option<DataType>,
    pub disabled_ui_features: Option<Vec<UiFeature>>,
    pub expand_navigator: bool,
    pub file_name: Option<String>,
    pub filter: Option<FilterVariables>,
    pub geometry_type: Option<GeometryType>,
    pub hide_main_header_and_footer: bool,
    pub hide_workbook_tool_bar: bool,
    pub highlight_global_id: Option<GlobalId>,
    pub label_set: Option<String>,
    pub layers: Vec<LayerPath>,
    pub layout: Option<Layout>,
    pub location_finder: Option<String>,
    pub map_extent: Option<Extent>,
    pub min_scale: Option<f64>,
    pub operation_mode: Option<OperationMode>,
    pub parts: Option<Vec<TablePart>>,
    pub snapping_layer: Vec<LayerPath>,
    pub snapping_types: Option<Vec<SnappingType>>,
    pub target_type: Option<TargetType>,
    pub use_map_srs: bool,
    /// Appended last as `webApplicationLink` / `webApplicationLinkRepository`.
    pub web_application: Option<ExternalLinkKey>,
}

fn join<T: Copy>(items: &[T], name: impl Fn(T) -> &'static str) -> String {
    items.iter().map(|i| name(*i)).collect::<Vec<_>>().join(",")
}

fn layer_paths_json(layers: &[LayerPath]) -> String {
    serde_json::Value::Array(
        layers
            .iter()
            .map(|l| l.0.iter().cloned().map(serde_json::Value::String).collect())
            .collect(),
    )
    .to_string()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Params {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(filter) = &self.filter {
            filter.validate()?;
        }
        if let Some(key) = &self.web_application {
            key.validate()?;
        }
        Ok(())
    }

    /// Key/value pairs in wire order, without validation.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Vec::new();
        let mut push = |k: &str, v: String| out.push((k.to_string(), v));

        if let Some(action) = self.action {
            push("action", action.as_str().to_string());
        }
        if let Some(data_type) = self.data_type {
            push("dataType", data_type.as_str().to_string());
        }
        if let Some(features) = self.disabled_ui_features.as_ref().filter(|v| !v.is_empty()) {
            push("disabledUiFeatures", join(features, |f| f.as_str()));
        }
        if self.expand_navigator {
            push("expandNavigator", "true".to_string());
        }
        if let Some(file_name) = non_empty(&self.file_name) {
            push("fileName", file_name.to_string());
        }
        if let Some(filter) = &self.filter {
            for (k, v) in filter.to_params() {
                push(&k, v);
            }
        }
        if let Some(geometry_type) = self.geometry_type {
            push("geometryType", geometry_type.as_str().to_string());
        }
        if self.hide_main_header_and_footer {
            push("hideMainHeaderAndFooter", "true".to_string());
        }
        if self.hide_workbook_tool_bar {
            push("hideWorkbookToolBar", "true".to_string());
        }
        if let Some(id) = self.highlight_global_id.as_ref().filter(|id| !id.0.is_empty()) {
            push("highlightGlobalId", id.0.clone());
        }
        if let Some(label_set) = non_empty(&self.label_set) {
            push("labelSet", label_set.to_string());
        }
        if !self.layers.is_empty() {
            push("layers", layer_paths_json(&self.layers));
        }
        if let Some(layout) = self.layout {
            push("layout", layout.as_str().to_string());
        }
        if let Some(query) = non_empty(&self.location_finder) {
            push("locationFinder", query.to_string());
        }
        if let Some(extent) = self.map_extent {
            push("mapExtent", extent.to_param());
        }
        if let Some(scale) = self.min_scale.filter(|s| *s != 0.0) {
            push("minScale", scale.to_string());
        }
        if let Some(mode) = self.operation_mode {
            push("operationMode", mode.as_str().to_string());
        }
        if let Some(parts) = self.parts.as_ref().filter(|v| !v.is_empty()) {
            push("parts", join(parts, |p| p.as_str()));
        }
        if !self.snapping_layer.is_empty() {
            push("snappingLayer", layer_paths_json(&self.snapping_layer));
        }
        if let Some(types) = self.snapping_types.as_ref().filter(|v| !v.is_empty()) {
            push("snappingTypes", join(types, |t| t.as_str()));
        }
        if let Some(target_type) = self.target_type {
            push("targetType", target_type.as_str().to_string());
        }
        if self.use_map_srs {
            push("useMapSrs", "true".to_string());
        }
        if let Some(key) = &self.web_application {
            push("webApplicationLink", key.external_link_id.clone());
            push("webApplicationLinkRepository", key.repository_name.clone());
        }
        out
    }

    /// Validates and URL-encodes the parameters.
    pub fn encode(&self) -> Result<String, ValidationError> {
        self.validate()?;
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in self.pairs() {
            serializer.append_pair(&k, &v);
        }
        Ok(serializer.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn booleans_and_global_id() {
        let params = Params {
            expand_navigator: true,
            hide_main_header_and_footer: true,
            hide_workbook_tool_bar: true,
            highlight_global_id: Some(GlobalId("ROOT.MyFolder".to_string())),
            ..Default::default()
        };
        assert_eq!(
            params.encode().unwrap(),
            "expandNavigator=true&hideMainHeaderAndFooter=true&hideWorkbookToolBar=true&highlightGlobalId=ROOT.MyFolder"
        );
    }

    #[test]
    fn false_booleans_and_empty_values_are_omitted() {
        let params = Params {
            file_name: Some(String::new()),
            layers: Vec::new(),
            min_scale: Some(0.0),
            disabled_ui_features: Some(Vec::new()),
            parts: Some(Vec::new()),
            snapping_types: Some(Vec::new()),
            ..Default::default()
        };
        assert_eq!(params.encode().unwrap(), "");
    }

    #[test]
    fn keys_follow_wire_order() {
        let params = Params {
            use_map_srs: true,
            target_type: Some(TargetType::Map),
            action: Some(Action::EditGeometry),
            geometry_type: Some(GeometryType::Point),
            min_scale: Some(1000.0),
            map_extent: Some(Extent::new(0.0, 0.0, 1.0, 1.0)),
            parts: Some(vec![TablePart::Columns, TablePart::Totals]),
            ..Default::default()
        };
        let keys: Vec<_> = params.pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "action",
                "geometryType",
                "mapExtent",
                "minScale",
                "parts",
                "targetType",
                "useMapSrs"
            ]
        );
        assert_eq!(
            params.encode().unwrap(),
            "action=editGeometry&geometryType=Point&mapExtent=0%2C0%2C1%2C1&minScale=1000&parts=columns%2Ctotals&targetType=MAP&useMapSrs=true"
        );
    }

    #[test]
    fn layers_are_json_arrays_of_paths() {
        let params = Params {
            layers: vec![LayerPath::from("Rivers"), LayerPath::from(["Water", "Lakes"])],
            ..Default::default()
        };
        assert_eq!(
            params.pairs(),
            vec![(
                "layers".to_string(),
                r#"[["Rivers"],["Water","Lakes"]]"#.to_string()
            )]
        );
    }

    #[test]
    fn invalid_filter_name_fails_encoding() {
        let params = Params {
            filter: Some(FilterVariables::new().with("notKebab", FilterValue::Null)),
            ..Default::default()
        };
        assert!(matches!(
            params.encode(),
            Err(ValidationError::InvalidFilterVariableName(_))
        ));
    }

    #[test]
    fn web_application_is_appended_last() {
        let params = Params {
            use_map_srs: true,
            web_application: Some(ExternalLinkKey::new("my repo", "abcd").unwrap()),
            ..Default::default()
        };
        assert_eq!(
            params.encode().unwrap(),
            "useMapSrs=true&webApplicationLink=abcd&webApplicationLinkRepository=my+repo"
        );
    }

    #[test]
    fn enum_values_are_checked_on_parse() {
        assert_eq!(
            "workbook-design".parse::<UiFeature>().unwrap(),
            UiFeature::WorkbookDesign
        );
        assert_eq!(
            "workbook".parse::<UiFeature>().unwrap_err(),
            ValidationError::InvalidUiFeature("workbook".to_string())
        );
        assert!("expert".parse::<OperationMode>().is_err());
        assert!("header".parse::<TablePart>().is_err());
        assert!("grid".parse::<Layout>().is_err());
        assert!(serde_json::from_str::<Vec<TablePart>>(r#"["values","rows"]"#).is_err());
        assert_eq!(
            serde_json::to_string(&[SnappingType::Vertex, SnappingType::Edge]).unwrap(),
            r#"["vertex","edge"]"#
        );
        assert_eq!(OperationMode::default(), OperationMode::Normal);
    }

    #[test]
    fn data_type_subsets() {
        assert!(DataType::Pdf.ensure_one_of(&DataType::EXPORTS).is_ok());
        assert_eq!(
            DataType::Png.ensure_one_of(&DataType::EXPORTS).unwrap_err(),
            ValidationError::InvalidDataType("png".to_string())
        );
    }
}
