use foundation::ValidationError;
use serde::{Deserialize, Serialize};

/// Technical classification of a remote failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorType {
    LoadingError,
    BadRequest,
    Unauthorized,
    NotFound,
    InternalError,
    /// A type the embedded application declared that this client does not know.
    Other(String),
}

impl ErrorType {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorType::LoadingError => "loading-error",
            ErrorType::BadRequest => "bad-request",
            ErrorType::Unauthorized => "unauthorized",
            ErrorType::NotFound => "not-found",
            ErrorType::InternalError => "internal-error",
            ErrorType::Other(s) => s,
        }
    }

    /// Classifies a non-2xx HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorType::BadRequest,
            401 => ErrorType::Unauthorized,
            404 => ErrorType::NotFound,
            _ => ErrorType::InternalError,
        }
    }
}

impl From<&str> for ErrorType {
    fn from(s: &str) -> Self {
        match s {
            "loading-error" => ErrorType::LoadingError,
            "bad-request" => ErrorType::BadRequest,
            "unauthorized" => ErrorType::Unauthorized,
            "not-found" => ErrorType::NotFound,
            "internal-error" => ErrorType::InternalError,
            other => ErrorType::Other(other.to_string()),
        }
    }
}

impl From<String> for ErrorType {
    fn from(s: String) -> Self {
        ErrorType::from(s.as_str())
    }
}

impl From<ErrorType> for String {
    fn from(t: ErrorType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by, or while talking to, the remote application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub error_type: ErrorType,
    pub message: String,
}

impl RemoteError {
    pub const LOADING_FAILED: &'static str = "Loading failed";
    pub const FETCH_FAILED: &'static str = "Failed to fetch data";

    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
        }
    }

    pub fn loading_failed() -> Self {
        Self::new(ErrorType::LoadingError, Self::LOADING_FAILED)
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.error_type)
    }
}

impl std::error::Error for RemoteError {}

/// A browser primitive failed (e.g. `postMessage` threw, a fetch never got a response).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError(pub String);

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "platform error: {}", self.0)
    }
}

impl std::error::Error for PlatformError {}

/// Error surfaced by every asynchronous operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Invalid(ValidationError),
    /// Cancelled through an `AbortSignal`.
    Aborted,
    Remote(RemoteError),
    /// The counterpart answered `{request}:error`.
    RequestRejected { request: String },
    /// The reply channel closed before any reply arrived.
    ChannelClosed { request: String },
    Platform(PlatformError),
}

impl Error {
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Aborted)
    }

    pub fn remote_type(&self) -> Option<&ErrorType> {
        match self {
            Error::Remote(e) => Some(&e.error_type),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Invalid(e) => write!(f, "{e}"),
            Error::Aborted => write!(f, "The operation was aborted."),
            Error::Remote(e) => write!(f, "{e}"),
            Error::RequestRejected { request } => write!(f, "{request} failed"),
            Error::ChannelClosed { request } => {
                write!(f, "{request}: reply channel closed without a reply")
            }
            Error::Platform(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Invalid(e) => Some(e),
            Error::Remote(e) => Some(e),
            Error::Platform(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Invalid(e)
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        Error::Remote(e)
    }
}

impl From<PlatformError> for Error {
    fn from(e: PlatformError) -> Self {
        Error::Platform(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_types_use_technical_ids() {
        assert_eq!(ErrorType::from("unauthorized"), ErrorType::Unauthorized);
        assert_eq!(
            ErrorType::from("quota-exceeded"),
            ErrorType::Other("quota-exceeded".to_string())
        );
        assert_eq!(
            serde_json::to_string(&ErrorType::NotFound).unwrap(),
            "\"not-found\""
        );
    }

    #[test]
    fn status_classification() {
        assert_eq!(ErrorType::from_status(400), ErrorType::BadRequest);
        assert_eq!(ErrorType::from_status(401), ErrorType::Unauthorized);
        assert_eq!(ErrorType::from_status(404), ErrorType::NotFound);
        assert_eq!(ErrorType::from_status(403), ErrorType::InternalError);
        assert_eq!(ErrorType::from_status(503), ErrorType::InternalError);
    }

    #[test]
    fn abort_is_distinguishable() {
        assert!(Error::Aborted.is_abort());
        assert!(!Error::Remote(RemoteError::loading_failed()).is_abort());
        assert_eq!(
            Error::Remote(RemoteError::loading_failed()).remote_type(),
            Some(&ErrorType::LoadingError)
        );
    }
}
