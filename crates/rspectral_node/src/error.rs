//! Shim error types.

use std::io;

use thiserror::Error;

/// Host-side failures raised while serving a shim operation.
///
/// These never reach the host caller directly: shims convert them into
/// guest `Error` values at the boundary.
#[derive(Debug, Error)]
pub enum ShimError {
    /// A virtual filesystem path was rooted or contained `..` elements.
    #[error("invalid virtual path: {0}")]
    InvalidPath(String),

    /// A path could not be expressed relative to the working directory.
    #[error("cannot make '{target}' relative to '{base}'")]
    NotRelative { base: String, target: String },

    /// I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ShimError {
    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Creates a relativization error.
    pub fn not_relative(base: impl Into<String>, target: impl Into<String>) -> Self {
        Self::NotRelative {
            base: base.into(),
            target: target.into(),
        }
    }

    /// Converts the error into an [`io::Error`], keeping the original kind
    /// for I/O failures.
    pub fn into_io(self) -> io::Error {
        match self {
            Self::Io(err) => err,
            other => io::Error::new(io::ErrorKind::NotFound, other.to_string()),
        }
    }
}
