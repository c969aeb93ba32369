use foundation::{Extent, Geometry, LayerPath};
use serde::{Deserialize, Serialize};

use crate::params::Params;

/// Where a map view should initially zoom to.
///
/// Variants with optional payloads fall back to the matching legacy option
/// and then to `Default` when the payload is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ZoomTarget {
    /// The embedded application's own placement logic, including auto zoom.
    Default,
    #[serde(rename_all = "camelCase")]
    Geometry {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        geometry: Option<Geometry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        use_map_srs: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    LocationFinder {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        search_query: Option<String>,
    },
    MapExtent {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extent: Option<Extent>,
    },
    /// The data extent of all layers in the map.
    DataExtent,
    LayerDataExtent {
        #[serde(default)]
        layers: Vec<LayerPath>,
    },
}

/// The overlapping zoom inputs of a map view call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoomInputs<'a> {
    pub zoom_target: Option<&'a ZoomTarget>,
    pub geometry: Option<&'a Geometry>,
    pub map_extent: Option<Extent>,
    pub location_finder: Option<&'a str>,
}

/// The single resolved zoom instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TargetInstruction {
    Default,
    #[serde(rename_all = "camelCase")]
    Geometry {
        geometry: Geometry,
        #[serde(skip_serializing_if = "Option::is_none")]
        use_map_srs: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    LocationFinder { search_query: String },
    MapExtent { extent: Extent },
    DataExtent,
    LayerDataExtent { layers: Vec<LayerPath> },
}

/// Reconciles the zoom inputs into at most one instruction. Never fails.
///
/// `None` means no input was given at all and the embedded application
/// decides.
pub fn resolve(inputs: &ZoomInputs<'_>) -> Option<TargetInstruction> {
    let legacy_geometry = || {
        inputs.geometry.map(|g| TargetInstruction::Geometry {
            geometry: g.clone(),
            use_map_srs: None,
        })
    };
    let legacy_extent = || inputs.map_extent.map(|extent| TargetInstruction::MapExtent { extent });
    let legacy_query = || {
        inputs
            .location_finder
            .filter(|q| !q.is_empty())
            .map(|q| TargetInstruction::LocationFinder {
                search_query: q.to_string(),
            })
    };

    let Some(target) = inputs.zoom_target else {
        return legacy_geometry().or_else(legacy_extent).or_else(legacy_query);
    };

    let resolved = match target {
        ZoomTarget::Default => legacy_extent().or_else(legacy_query),
        ZoomTarget::Geometry {
            geometry,
            use_map_srs,
        } => match geometry {
            Some(geometry) => Some(TargetInstruction::Geometry {
                geometry: geometry.clone(),
                use_map_srs: *use_map_srs,
            }),
            None => legacy_geometry(),
        },
        ZoomTarget::LocationFinder { search_query } => match search_query.as_deref() {
            Some(q) if !q.is_empty() => Some(TargetInstruction::LocationFinder {
                search_query: q.to_string(),
            }),
            _ => legacy_query(),
        },
        ZoomTarget::MapExtent { extent } => match extent {
            Some(extent) => Some(TargetInstruction::MapExtent { extent: *extent }),
            None => legacy_extent(),
        },
        ZoomTarget::DataExtent => Some(TargetInstruction::DataExtent),
        ZoomTarget::LayerDataExtent { layers } if !layers.is_empty() => {
            Some(TargetInstruction::LayerDataExtent {
                layers: layers.clone(),
            })
        }
        ZoomTarget::LayerDataExtent { .. } => None,
    };
    Some(resolved.unwrap_or(TargetInstruction::Default))
}

impl TargetInstruction {
    /// Writes URL-carried instructions into the navigation parameters.
    ///
    /// A map extent instruction clears the location finder query and vice
    /// versa, so the embedded application sees a single signal.
    pub fn apply_to(&self, params: &mut Params) {
        match self {
            TargetInstruction::MapExtent { extent } => {
                params.location_finder = None;
                params.map_extent = Some(*extent);
            }
            TargetInstruction::LocationFinder { search_query } => {
                params.map_extent = None;
                params.location_finder = Some(search_query.clone());
            }
            _ => {}
        }
    }

    /// Whether the instruction must be sent as `setZoomTarget` after ready.
    pub fn needs_message(&self) -> bool {
        matches!(
            self,
            TargetInstruction::Geometry { .. }
                | TargetInstruction::DataExtent
                | TargetInstruction::LayerDataExtent { .. }
        )
    }
}
