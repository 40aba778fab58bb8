//! # Error Definitions
//!
//! Failures raised while moving values in and out of a transport context.

use crate::context::Handle;

/// Marshalling and unmarshalling errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The value cannot be represented in a payload (function literal,
    /// non-finite float, reserved key, nesting too deep).
    UnsupportedValue(String),
    /// A payload referenced a handle the context never registered.
    UnknownHandle(Handle),
    /// The payload text is not a marshalled value.
    MalformedPayload(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedValue(msg) => write!(f, "Unsupported value: {}", msg),
            Self::UnknownHandle(handle) => write!(f, "Unknown handle: {}", handle),
            Self::MalformedPayload(msg) => write!(f, "Malformed payload: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedPayload(e.to_string())
    }
}

/// A specialized Result type for marshalling operations.
pub type Result<T> = std::result::Result<T, Error>;
