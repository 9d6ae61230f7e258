//! Error types raised by the request/response cycle.

use std::fmt;
use thiserror::Error;

/// Detail text used when the service supplies no extra context.
pub const NO_DETAILS: &str = "None";

/// A locally detectable misconfiguration, raised before any network I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Error code carried by a [`ServerError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    /// HTTP status of a failed transport round trip.
    Status(u16),
    /// Code reported by the service in an `ErrorResponse` document.
    Service(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Status(status) => write!(f, "{}", status),
            ErrorCode::Service(code) => write!(f, "{}", code),
        }
    }
}

/// A failure reported after a network round trip.
///
/// `kind` is `"HTTP"` for transport failures, otherwise the category the
/// service reported (`"Sender"`, `"Receiver"`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Type: {kind}, Code: {code}, Message: {message}, Details: {details}")]
pub struct ServerError {
    pub kind: String,
    pub code: ErrorCode,
    pub message: String,
    pub details: String,
}

impl ServerError {
    /// Builds a service-level error with no details.
    pub fn service(
        kind: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            code: ErrorCode::Service(code.into()),
            message: message.into(),
            details: NO_DETAILS.to_string(),
        }
    }

    /// Builds a transport-level error from an HTTP status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: "HTTP".to_string(),
            code: ErrorCode::Status(status),
            message: message.into(),
            details: NO_DETAILS.to_string(),
        }
    }
}

/// Every failure the client can surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("Transport failure: {0}")]
    Transport(#[from] wreq::Error),

    #[error("Malformed response body: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("No result node matched '{path}'")]
    MissingResult { path: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = ServerError::http(500, "Internal Server Error");
        assert_eq!(
            err.to_string(),
            "Type: HTTP, Code: 500, Message: Internal Server Error, Details: None"
        );
    }

    #[test]
    fn test_service_error_defaults() {
        let err = ServerError::service("Sender", "InvalidParameterValue", "bad");
        assert_eq!(err.code, ErrorCode::Service("InvalidParameterValue".to_string()));
        assert_eq!(err.details, "None");
        assert_eq!(err.kind, "Sender");
    }

    #[test]
    fn test_validation_error_message() {
        let err: Error = ValidationError::new("A secret key must be specified.").into();
        assert_eq!(err.to_string(), "A secret key must be specified.");
        assert!(matches!(err, Error::Validation(_)));
    }
}
