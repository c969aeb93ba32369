//! Message envelope and the event catalogue exchanged over `postMessage`.
//!
//! Every message in both directions is `{ type, detail? }`. Request-style
//! messages are answered on a private channel with `{type}:success` or
//! `{type}:error`.

use foundation::{Geometry, LayerPath, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `postMessage` envelope. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub detail: Value,
}

impl Event {
    pub fn new(kind: impl Into<String>, detail: Value) -> Self {
        Self {
            kind: kind.into(),
            detail,
        }
    }

    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new(kind, Value::Null)
    }

    /// Decodes the detail into a typed payload.
    pub fn detail_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.detail.clone())
    }
}

/// Lifecycle signal: the embedded application initialized successfully.
pub const READY: &str = "ready";
/// Lifecycle signal: the embedded application failed to initialize.
pub const ERROR: &str = "error";

pub fn success_type(request: &str) -> String {
    format!("{request}:success")
}

pub fn error_type(request: &str) -> String {
    format!("{request}:error")
}

/// Inbound events a caller may subscribe to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Action,
    ChangeSelection,
    DrillThrough,
    EditGeometryUpdate,
    EditGeometryOk,
    EditGeometryCancel,
    ObjectInfo,
    Reload,
    SelectObjectsOk,
    SelectObjectsCancel,
}

impl EventType {
    pub const ALL: [EventType; 10] = [
        EventType::Action,
        EventType::ChangeSelection,
        EventType::DrillThrough,
        EventType::EditGeometryUpdate,
        EventType::EditGeometryOk,
        EventType::EditGeometryCancel,
        EventType::ObjectInfo,
        EventType::Reload,
        EventType::SelectObjectsOk,
        EventType::SelectObjectsCancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Action => "action",
            EventType::ChangeSelection => "change:selection",
            EventType::DrillThrough => "drillThrough",
            EventType::EditGeometryUpdate => "editGeometry:update",
            EventType::EditGeometryOk => "editGeometry:ok",
            EventType::EditGeometryCancel => "editGeometry:cancel",
            EventType::ObjectInfo => "objectInfo",
            EventType::Reload => "reload",
            EventType::SelectObjectsOk => "selectObjects:ok",
            EventType::SelectObjectsCancel => "selectObjects:cancel",
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidEventType(s.to_string()))
    }
}

/// Request-style outbound messages; each is answered on its own channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RequestType {
    SetFilter,
    SetLayerVisibility,
    SetSelection,
    AddSelection,
    RemoveSelection,
    GetData,
    Reload,
    ImportLayer,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::SetFilter => "setFilter",
            RequestType::SetLayerVisibility => "setLayerVisibility",
            RequestType::SetSelection => "setSelection",
            RequestType::AddSelection => "addSelection",
            RequestType::RemoveSelection => "removeSelection",
            RequestType::GetData => "getData",
            RequestType::Reload => "reload",
            RequestType::ImportLayer => "importLayer",
        }
    }
}

/// Fire-and-forget outbound messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CommandType {
    SetGeometry,
    SetZoomTarget,
    ExpandNavigator,
    SetCustomValidity,
    CloseMe,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::SetGeometry => "setGeometry",
            CommandType::SetZoomTarget => "setZoomTarget",
            CommandType::ExpandNavigator => "expandNavigator",
            CommandType::SetCustomValidity => "setCustomValidity",
            CommandType::CloseMe => "closeMe",
        }
    }
}

/// Detail of the `error` lifecycle signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// `action`: the user executed a POST message action of an external link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDetail {
    pub context: String,
}

/// `drillThrough`: one row per selected item; map views append the geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillThroughDetail {
    #[serde(default)]
    pub context: Option<String>,
    pub values: Vec<Vec<Value>>,
}

/// `change:selection` and `selectObjects:ok`. The detail is absent when
/// nothing is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionDetail {
    pub layer: LayerPath,
    pub values: Vec<Vec<Value>>,
}

/// `editGeometry:update` and `editGeometry:ok`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryDetail {
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfoElement {
    pub attribute_print_name: String,
    pub formatted_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfos {
    pub selection_index: u32,
    pub elements: Vec<ObjectInfoElement>,
}

/// `objectInfo`: the user opened the object info flyout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfoDetail {
    pub layer: LayerPath,
    pub object_infos: ObjectInfos,
}

/// Validity level shown by the geometry editor for `setCustomValidity`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomValidityType {
    #[default]
    Error,
    Warning,
    Info,
    Success,
}

impl std::str::FromStr for CustomValidityType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(CustomValidityType::Error),
            "warning" => Ok(CustomValidityType::Warning),
            "info" => Ok(CustomValidityType::Info),
            "success" => Ok(CustomValidityType::Success),
            _ => Err(ValidationError::InvalidCustomValidityType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_omits_absent_detail() {
        let e = Event::bare("closeMe");
        assert_eq!(serde_json::to_value(&e).unwrap(), json!({"type": "closeMe"}));

        let parsed: Event = serde_json::from_value(json!({"type": "ready"})).unwrap();
        assert_eq!(parsed, Event::bare(READY));
    }

    #[test]
    fn reply_types_are_suffixed() {
        assert_eq!(success_type("setFilter"), "setFilter:success");
        assert_eq!(error_type("setFilter"), "setFilter:error");
    }

    #[test]
    fn error_detail_message_is_optional() {
        let e = Event::new(ERROR, json!({"type": "unauthorized"}));
        let detail: ErrorDetail = e.detail_as().unwrap();
        assert_eq!(detail.kind, "unauthorized");
        assert_eq!(detail.message, None);
    }

    #[test]
    fn event_type_names_round_trip() {
        for t in EventType::ALL {
            assert_eq!(t.as_str().parse::<EventType>().unwrap(), t);
        }
        assert!("ready".parse::<EventType>().is_err());
    }

    #[test]
    fn selection_detail_decodes_layer_path() {
        let e = Event::new(
            "change:selection",
            json!({"layer": ["Water", "Rivers"], "values": [[1], [2]]}),
        );
        let detail: SelectionDetail = e.detail_as().unwrap();
        assert_eq!(detail.layer, LayerPath::from(["Water", "Rivers"]));
        assert_eq!(detail.values.len(), 2);
    }
}
