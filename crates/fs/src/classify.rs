//! Typed classification of I/O failures.

use derive_more::Display;
use std::io::{Error as IoError, ErrorKind as IoKind};

/// What the user can do about a failed filesystem operation.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Failure {
    #[display("permission denied")]
    PermissionDenied,
    #[display("file is in use by another program")]
    Busy,
    #[display("file no longer exists")]
    NotFound,
    #[display("a file with that name already exists")]
    AlreadyExists,
    #[display("unexpected error")]
    Other,
}

impl Failure {
    /// Whether the permission repair ladder is worth attempting.
    pub fn is_permission(&self) -> bool {
        matches!(self, Failure::PermissionDenied)
    }
}

// Raw OS codes that older toolchains or unusual filesystems surface without a
// matching `io::ErrorKind`.
#[cfg(unix)]
const RAW_PERMISSION: &[i32] = &[1, 13]; // EPERM, EACCES
#[cfg(unix)]
const RAW_BUSY: &[i32] = &[16, 26]; // EBUSY, ETXTBSY
#[cfg(windows)]
const RAW_PERMISSION: &[i32] = &[5]; // ERROR_ACCESS_DENIED
#[cfg(windows)]
const RAW_BUSY: &[i32] = &[32, 33]; // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
#[cfg(not(any(unix, windows)))]
const RAW_PERMISSION: &[i32] = &[];
#[cfg(not(any(unix, windows)))]
const RAW_BUSY: &[i32] = &[];

/// Classify an I/O error.
///
/// The `io::ErrorKind` wins when it is specific; otherwise the raw OS error
/// code decides.
pub fn classify(error: &IoError) -> Failure {
    match error.kind() {
        IoKind::PermissionDenied | IoKind::ReadOnlyFilesystem => return Failure::PermissionDenied,
        IoKind::NotFound => return Failure::NotFound,
        IoKind::AlreadyExists => return Failure::AlreadyExists,
        IoKind::ResourceBusy | IoKind::ExecutableFileBusy => return Failure::Busy,
        _ => {},
    }
    match error.raw_os_error() {
        Some(code) if RAW_PERMISSION.contains(&code) => Failure::PermissionDenied,
        Some(code) if RAW_BUSY.contains(&code) => Failure::Busy,
        _ => Failure::Other,
    }
}
