use crate::SessionState;
use std::fmt;

/// Errors produced by the optimizer
#[derive(Debug)]
pub enum Error {
    /// Input pixel payload is malformed or has a zero dimension
    Decode { reason: String },
    /// Construction argument is out of range or not recognized
    Validation { reason: String },
    /// Operation is not allowed in the current session state
    IllegalState {
        operation: &'static str,
        state: SessionState,
    },
    /// Export serialization failure
    Json(serde_json::Error),
}

impl Error {
    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Decode { reason } => write!(f, "failed to decode image: {}", reason),
            Error::Validation { reason } => write!(f, "invalid argument: {}", reason),
            Error::IllegalState { operation, state } => {
                write!(f, "`{}` is not allowed in {:?} state", operation, state)
            }
            Error::Json(error) => write!(f, "failed to serialize sketch: {}", error),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error)
    }
}

impl From<Error> for std::io::Error {
    fn from(error: Error) -> Self {
        Self::new(std::io::ErrorKind::InvalidData, error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(error) => Some(error),
            _ => None,
        }
    }
}
