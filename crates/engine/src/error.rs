//! Engine Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Errors from the codec and filesystem crates are raised
//! into this taxonomy so that each failed item carries one of these kinds,
//! with the original error kept as a child in the tree.

use derive_more::{Display, Error};
use shears_codec::error::Error as CodecError;
use shears_fs::Failure;
use shears_fs::error::{Error as FsError, ErrorKind as FsErrorKind};
use std::io::Error as IoError;
use std::path::{Path, PathBuf};

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a single item (or a whole batch) failed.
///
/// ### Caller Errors
/// - [`ErrorKind::NotAFile`]
/// - [`ErrorKind::NotAnImage`]
/// - [`ErrorKind::UnsupportedFormat`]
/// - [`ErrorKind::InvalidParameter`]
///
/// ### Environment Errors
/// - [`ErrorKind::AlreadyExists`]
/// - [`ErrorKind::PermissionDenied`]
/// - [`ErrorKind::Busy`]
/// - [`ErrorKind::NotFound`]
/// - [`ErrorKind::DirectoryResolution`]
/// - [`ErrorKind::Filesystem`]
///
/// ### Dependency Errors
/// - [`ErrorKind::CodecFailure`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("not a file: {}", _0.display())]
    NotAFile(#[error(not(source))] PathBuf),
    #[display("not an image: {}", _0.display())]
    NotAnImage(#[error(not(source))] PathBuf),
    #[display("unsupported format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    #[display("invalid parameter: {_0}")]
    InvalidParameter(#[error(not(source))] String),
    #[display("already exists: {}", _0.display())]
    AlreadyExists(#[error(not(source))] PathBuf),
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("in use by another program: {}", _0.display())]
    Busy(#[error(not(source))] PathBuf),
    #[display("not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The output directory could not be created or used; fails the whole batch.
    #[display("cannot use output directory: {_0}")]
    DirectoryResolution(#[error(not(source))] String),
    /// Decoding, encoding or compositing failed. The codec's message is kept verbatim.
    #[display("{_0}")]
    CodecFailure(#[error(not(source))] String),
    /// Any other I/O failure.
    #[display("filesystem error: {_0}")]
    Filesystem(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy(_) | Self::Filesystem(_))
    }

    /// Raise a codec error into a [`CodecFailure`](Self::CodecFailure),
    /// preserving the codec's error tree as a child.
    #[track_caller]
    pub fn codec(err: CodecError) -> Error {
        let message = (*err).to_string();
        err.raise(Self::CodecFailure(message))
    }

    /// Raise a filesystem error into the matching engine kind, preserving the
    /// filesystem crate's error tree as a child.
    #[track_caller]
    pub fn fs(err: FsError) -> Error {
        let kind = match &*err {
            FsErrorKind::NotFound(path) => Self::NotFound(path.clone()),
            FsErrorKind::PermissionDenied(path) => Self::PermissionDenied(path.clone()),
            FsErrorKind::AlreadyExists(path) => Self::AlreadyExists(path.clone()),
            FsErrorKind::Busy(path) => Self::Busy(path.clone()),
            FsErrorKind::InvalidPath(path) => Self::InvalidParameter(format!("invalid name: {}", path.display())),
            FsErrorKind::DirectoryResolution(path) => Self::DirectoryResolution(path.display().to_string()),
            FsErrorKind::Io(e) => Self::Filesystem(e.to_string()),
        };
        err.raise(kind)
    }

    /// Map an I/O error about `path` onto the matching kind.
    pub fn io(err: &IoError, path: &Path) -> Self {
        let path = path.to_path_buf();
        match shears_fs::classify(err) {
            Failure::NotFound => Self::NotFound(path),
            Failure::PermissionDenied => Self::PermissionDenied(path),
            Failure::AlreadyExists => Self::AlreadyExists(path),
            Failure::Busy => Self::Busy(path),
            Failure::Other => Self::Filesystem(err.to_string()),
        }
    }
}
