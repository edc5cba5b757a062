//! Error types for promframes

use crate::frame::FieldType;
use std::fmt;

/// Result type alias for decode operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for promframes
#[derive(Debug)]
pub enum Error {
    /// Malformed, truncated or wrongly shaped JSON
    Json(serde_json::Error),
    /// The server reported `status: "error"`
    Prometheus { error_type: String, message: String },
    /// `resultType` is not one we know how to read
    UnknownResultType(String),
    /// A sample value was not a valid float
    ParseFloat {
        value: String,
        source: std::num::ParseFloatError,
    },
    /// An integer token or timestamp segment was not a valid integer
    ParseInt {
        value: String,
        source: std::num::ParseIntError,
    },
    /// Timestamp could not be interpreted
    TimeFormat(String),
    /// Sparse histogram layout violation
    Histogram(String),
    /// Value appended to a field of a different type
    FieldTypeMismatch {
        field: String,
        expected: FieldType,
        found: FieldType,
    },
    /// Arrow-related errors
    Arrow(arrow_schema::ArrowError),
    /// IO errors
    Io(std::io::Error),
    /// Configuration errors
    Config(String),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ParseFloat { source, .. } => Some(source),
            Error::ParseInt { source, .. } => Some(source),
            Error::Json(e) => Some(e),
            Error::Arrow(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Json(e) => write!(f, "invalid response: {}", e),
            Error::Prometheus {
                error_type,
                message,
            } => write!(f, "{}: {}", error_type, message),
            Error::UnknownResultType(t) => write!(f, "unknown result type: {}", t),
            Error::ParseFloat { value, source } => {
                write!(f, "invalid float value '{}': {}", value, source)
            }
            Error::ParseInt { value, source } => {
                write!(f, "invalid integer value '{}': {}", value, source)
            }
            Error::TimeFormat(msg) => write!(f, "{}", msg),
            Error::Histogram(msg) => write!(f, "invalid histogram: {}", msg),
            Error::FieldTypeMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "field '{}' holds {} values, cannot append {}",
                field, expected, found
            ),
            Error::Arrow(e) => write!(f, "Arrow error: {}", e),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error {
    /// True for failures caused by the token stream itself rather than its content
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Json(_))
    }

    /// True when the payload ended before the document was complete
    pub fn is_truncated(&self) -> bool {
        matches!(self, Error::Json(e) if e.is_eof())
    }
}

impl From<arrow_schema::ArrowError> for Error {
    fn from(e: arrow_schema::ArrowError) -> Self {
        Error::Arrow(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}
