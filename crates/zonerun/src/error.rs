//! # Error Definitions
//!
//! Every failure a zone call can surface. The same condition yields the same
//! [`ErrorKind`] whether it is returned by a sync entry point or delivered
//! through a [`Pending`](crate::pending::Pending).

/// Classification of a zone failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A call was given arguments of the wrong runtime shape.
    InvalidArgumentShape,
    /// A value could not be marshalled.
    UnsupportedValue,
    /// A payload referenced a handle missing from its context.
    UnknownHandle,
    /// A payload was not valid marshalled text.
    MalformedPayload,
    /// The native zone reported a nonzero response code.
    NativeExecutionFailure,
}

/// Zone errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed call convention.
    InvalidArgumentShape(String),
    /// Marshalling or unmarshalling failed.
    Marshal(zonepack::Error),
    /// The native zone failed; `message` is passed through verbatim.
    NativeExecutionFailure { code: i32, message: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgumentShape(_) => ErrorKind::InvalidArgumentShape,
            Self::Marshal(zonepack::Error::UnsupportedValue(_)) => ErrorKind::UnsupportedValue,
            Self::Marshal(zonepack::Error::UnknownHandle(_)) => ErrorKind::UnknownHandle,
            Self::Marshal(zonepack::Error::MalformedPayload(_)) => ErrorKind::MalformedPayload,
            Self::NativeExecutionFailure { .. } => ErrorKind::NativeExecutionFailure,
        }
    }

    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        Self::InvalidArgumentShape(msg.into())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgumentShape(msg) => write!(f, "Invalid argument shape: {}", msg),
            Self::Marshal(e) => write!(f, "Marshal error: {}", e),
            Self::NativeExecutionFailure { message, .. } => f.write_str(message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Marshal(e) => Some(e),
            _ => None,
        }
    }
}

impl From<zonepack::Error> for Error {
    fn from(e: zonepack::Error) -> Self {
        Self::Marshal(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
