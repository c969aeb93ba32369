/// A caller error detected before any navigation, messaging or network activity.
///
/// These are never retried; the message names the offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidBaseUrl(String),
    InvalidEmbeddingTargetId(String),
    InvalidPageName(String),
    InvalidWebApplication { repository_name: String, external_link_id: String },
    InvalidFilterVariableName(String),
    InvalidFilterValue { name: String, reason: String },
    InvalidUiFeature(String),
    InvalidOperationMode(String),
    InvalidGeometryType(String),
    InvalidTablePart(String),
    InvalidLayout(String),
    InvalidSnappingType(String),
    InvalidDataType(String),
    InvalidCustomValidityType(String),
    InvalidEventType(String),
    /// An option that is only valid in combination with another one.
    Unsupported(&'static str),
    /// Structurally malformed input (e.g. an options object that does not parse).
    Malformed(String),
    BaseUrlMissing,
    IframeMissing,
    IframeNotVisible,
    TargetWindowMissing,
    CloseMeFromIframe,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidBaseUrl(v) => write!(f, "Invalid baseUrl: {v}"),
            ValidationError::InvalidEmbeddingTargetId(v) => {
                write!(f, "Invalid embedding target ID: {v}")
            }
            ValidationError::InvalidPageName(v) => write!(f, "Invalid page name: {v}"),
            ValidationError::InvalidWebApplication {
                repository_name,
                external_link_id,
            } => write!(
                f,
                "Invalid webApplication parameter: {repository_name}/{external_link_id}"
            ),
            ValidationError::InvalidFilterVariableName(v) => {
                write!(f, "Invalid filter variable name: {v}")
            }
            ValidationError::InvalidFilterValue { name, reason } => {
                write!(f, "Invalid value for filter variable {name}: {reason}")
            }
            ValidationError::InvalidUiFeature(v) => write!(f, "Invalid UI feature: {v}"),
            ValidationError::InvalidOperationMode(v) => write!(f, "Invalid operation mode: {v}"),
            ValidationError::InvalidGeometryType(v) => write!(f, "Invalid geometry type: {v}"),
            ValidationError::InvalidTablePart(v) => write!(f, "Invalid table part: {v}"),
            ValidationError::InvalidLayout(v) => write!(f, "Invalid layout: {v}"),
            ValidationError::InvalidSnappingType(v) => write!(f, "Invalid snapping type: {v}"),
            ValidationError::InvalidDataType(v) => write!(f, "Invalid data type: {v}"),
            ValidationError::InvalidCustomValidityType(v) => {
                write!(f, "Invalid validity type: {v}")
            }
            ValidationError::InvalidEventType(v) => write!(f, "Invalid event type: {v}"),
            ValidationError::Unsupported(msg) => write!(f, "{msg}"),
            ValidationError::Malformed(msg) => write!(f, "Invalid argument: {msg}"),
            ValidationError::BaseUrlMissing => write!(f, "Required base URL is not present"),
            ValidationError::IframeMissing => write!(f, "Required iframe is not present."),
            ValidationError::IframeNotVisible => write!(f, "Iframe must be visible."),
            ValidationError::TargetWindowMissing => write!(f, "Cannot find target window"),
            ValidationError::CloseMeFromIframe => write!(f, "Cannot send closeMe to iframe"),
        }
    }
}

impl std::error::Error for ValidationError {}
