use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use foundation::{Geometry, GeometryType, ValidationError, is_kebab_case};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved filter variable carrying a spatial restriction.
pub const SPATIAL_FILTER: &str = "spatial";

/// How the spatial filter geometry restricts the displayed objects.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpatialRelation {
    Intersects,
    Contains,
    Within,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialFilter {
    pub relation: SpatialRelation,
    pub geometry: Geometry,
}

/// A typed filter variable value.
///
/// Dates are normalized to `YYYY-MM-DDTHH:MM:SS.mmmZ` on the wire so the
/// encoding does not depend on how the caller represents time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Number(f64),
    Text(String),
    TextList(Vec<String>),
    Spatial(SpatialFilter),
    #[serde(skip_deserializing)]
    Date(DateTime<Utc>),
}

impl FilterValue {
    fn to_json(&self) -> Value {
        match self {
            FilterValue::Null => Value::Null,
            // Whole numbers go out without a fraction, e.g. `42`, not `42.0`.
            FilterValue::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                Value::from(*n as i64)
            }
            FilterValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FilterValue::Text(s) => Value::String(s.clone()),
            FilterValue::TextList(list) => {
                Value::Array(list.iter().cloned().map(Value::String).collect())
            }
            FilterValue::Spatial(spatial) => {
                serde_json::to_value(spatial).unwrap_or(Value::Null)
            }
            FilterValue::Date(date) => {
                Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
        }
    }

    /// JSON text sent as the value of a `filter.{name}` parameter.
    pub fn encode(&self) -> String {
        self.to_json().to_string()
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Number(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Number(v as f64)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        FilterValue::Date(v)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(v: Vec<String>) -> Self {
        FilterValue::TextList(v)
    }
}

/// Filter variable names and values. Keys iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterVariables(pub BTreeMap<String, FilterValue>);

impl FilterVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in &self.0 {
            if !is_kebab_case(name) {
                return Err(ValidationError::InvalidFilterVariableName(name.clone()));
            }
            match (name.as_str(), value) {
                (SPATIAL_FILTER, FilterValue::Spatial(spatial)) => {
                    if spatial.geometry.kind != GeometryType::Polygon {
                        return Err(ValidationError::InvalidFilterValue {
                            name: name.clone(),
                            reason: format!(
                                "spatial filter geometry must be a Polygon, got {}",
                                spatial.geometry.kind.as_str()
                            ),
                        });
                    }
                }
                (SPATIAL_FILTER, _) => {
                    return Err(ValidationError::InvalidFilterValue {
                        name: name.clone(),
                        reason: "expected {relation, geometry}".to_string(),
                    });
                }
                (_, FilterValue::Spatial(_)) => {
                    return Err(ValidationError::InvalidFilterValue {
                        name: name.clone(),
                        reason: format!("spatial values are only allowed for '{SPATIAL_FILTER}'"),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// `(filter.{name}, json)` pairs in key order. Call `validate` first.
    pub fn to_params(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.0
            .iter()
            .map(|(name, value)| (format!("filter.{name}"), value.encode()))
    }

    /// Plain JSON object form used in message payloads.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}
