//! Filesystem Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Every variant that concerns a particular entry carries
//! its path so callers can report it without extra bookkeeping.

use crate::classify::{Failure, classify};
use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::{Path, PathBuf};

/// A filesystem error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for filesystem operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Entry does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied, even after attempting to repair permissions
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Target already exists (for operations that must not overwrite)
    #[display("file already exists: {}", _0.display())]
    AlreadyExists(#[error(not(source))] PathBuf),
    /// Entry is in use by another process
    #[display("file is in use: {}", _0.display())]
    Busy(#[error(not(source))] PathBuf),
    /// Path or name is malformed
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Output directory cannot be created or used
    #[display("cannot use output directory: {}", _0.display())]
    DirectoryResolution(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy(_) | Self::Io(_))
    }

    /// The classified failure for this error.
    pub fn failure(&self) -> Failure {
        match self {
            Self::NotFound(_) => Failure::NotFound,
            Self::PermissionDenied(_) => Failure::PermissionDenied,
            Self::AlreadyExists(_) => Failure::AlreadyExists,
            Self::Busy(_) => Failure::Busy,
            Self::Io(e) => classify(e),
            Self::InvalidPath(_) | Self::DirectoryResolution(_) => Failure::Other,
        }
    }
}

/// Map an I/O error about `path` onto the matching error kind.
pub fn map_io_error(e: IoError, path: &Path) -> ErrorKind {
    match classify(&e) {
        Failure::NotFound => ErrorKind::NotFound(path.to_path_buf()),
        Failure::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
        Failure::AlreadyExists => ErrorKind::AlreadyExists(path.to_path_buf()),
        Failure::Busy => ErrorKind::Busy(path.to_path_buf()),
        Failure::Other => ErrorKind::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;
    use std::io::ErrorKind as IoKind;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound(PathBuf::from("/a/b.jpg")).to_string(), "file not found: /a/b.jpg");
        assert_eq!(
            ErrorKind::DirectoryResolution(PathBuf::from("/out")).to_string(),
            "cannot use output directory: /out"
        );
    }

    #[test]
    fn map_io_error_kinds() {
        let path = Path::new("/x");
        assert!(matches!(map_io_error(IoError::from(IoKind::NotFound), path), ErrorKind::NotFound(_)));
        assert!(matches!(
            map_io_error(IoError::from(IoKind::PermissionDenied), path),
            ErrorKind::PermissionDenied(_)
        ));
        assert!(matches!(map_io_error(IoError::from(IoKind::AlreadyExists), path), ErrorKind::AlreadyExists(_)));
        assert!(matches!(map_io_error(IoError::from(IoKind::UnexpectedEof), path), ErrorKind::Io(_)));
    }

    #[test]
    fn error_from_result() {
        let result: std::result::Result<(), IoError> = Err(IoError::from(IoKind::NotFound));
        let err: Result<()> = result.or_raise(|| ErrorKind::NotFound(PathBuf::from("x")));
        let exn = err.unwrap_err();
        assert_eq!(exn.failure(), Failure::NotFound);
    }
}
