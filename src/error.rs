//! Error handling for the host-side edges of the effect.
//!
//! The tick path itself is infallible: sample arithmetic works on bounded
//! integers and index violations are programming errors that panic. Errors
//! arise only where the effect meets the outside world:
//! * Loading and validating configuration
//! * Reading input and writing output files
//! * Spawning the sample clock thread
//!
//! Errors are categorized by [`ErrorKind`], modeled after the gRPC status
//! codes, and carry the underlying error as their source.

use std::{error, fmt, io};

use thiserror::Error;

/// Categories of errors that can occur.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Error)]
pub enum ErrorKind {
    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Unknown error.
    #[error("unknown error")]
    Unknown,

    /// Client specified an invalid argument.
    #[error("invalid argument")]
    InvalidArgument,

    /// Some requested entity (e.g. a file) was not found.
    #[error("not found")]
    NotFound,

    /// The caller lacks permission for the operation.
    #[error("permission denied")]
    PermissionDenied,

    /// Operation was attempted past the valid range.
    #[error("out of range")]
    OutOfRange,

    /// Operation is not implemented or supported.
    #[error("not implemented")]
    Unimplemented,

    /// Internal invariant broken.
    #[error("internal error")]
    Internal,

    /// The resource is currently unavailable.
    #[error("unavailable")]
    Unavailable,

    /// Unrecoverable data loss or corruption.
    #[error("data loss")]
    DataLoss,
}

/// Error type carrying a kind and the underlying cause.
#[derive(Debug)]
pub struct Error {
    /// Category of the error.
    pub kind: ErrorKind,

    /// Underlying error.
    pub error: Box<dyn error::Error + Send + Sync>,
}

/// Result type with [`Error`] as the error variant.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new error of the given kind.
    pub fn new<E>(kind: ErrorKind, error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    /// Creates an `InvalidArgument` error.
    pub fn invalid_argument<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::InvalidArgument, error)
    }

    /// Creates an `OutOfRange` error.
    pub fn out_of_range<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::OutOfRange, error)
    }

    /// Creates an `Unimplemented` error.
    pub fn unimplemented<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Unimplemented, error)
    }

    /// Creates an `Internal` error.
    pub fn internal<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Internal, error)
    }

    /// Creates a `DataLoss` error.
    pub fn data_loss<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::DataLoss, error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.error)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            io::ErrorKind::InvalidInput => ErrorKind::InvalidArgument,
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => ErrorKind::DataLoss,
            io::ErrorKind::Interrupted => ErrorKind::Cancelled,
            io::ErrorKind::Unsupported => ErrorKind::Unimplemented,
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ErrorKind::Unavailable,
            _ => ErrorKind::Unknown,
        };
        Self::new(kind, err)
    }
}

impl From<hound::Error> for Error {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => e.into(),
            hound::Error::FormatError(_) => Self::data_loss(err),
            hound::Error::Unsupported => Self::unimplemented(err),
            _ => Self::invalid_argument(err),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::invalid_argument(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_kinds() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "missing.wav").into();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "short read").into();
        assert_eq!(err.kind, ErrorKind::DataLoss);
    }

    #[test]
    fn display_includes_kind_and_cause() {
        let err = Error::out_of_range("mix 11 exceeds 10");
        assert_eq!(err.to_string(), "out of range: mix 11 exceeds 10");
    }
}
