use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::ErrorKind as IoKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::instrument;

/// Resolve user input into an existing, absolute output directory.
///
/// - A relative path is taken relative to the current working directory.
/// - An existing directory is checked for readability and returned in its
///   canonical form (or its absolute form if canonicalization fails).
/// - An existing file is replaced by its parent directory.
/// - A missing path is created, including intermediate directories. Another
///   task creating the same directory at the same time is not an error.
///
/// Calling this twice with the same input yields the same directory.
///
/// # Errors
///
/// [`InvalidPath`](ErrorKind::InvalidPath) for blank input, and
/// [`DirectoryResolution`](ErrorKind::DirectoryResolution) when the
/// directory cannot be created or read.
#[instrument(skip(raw), fields(path = %raw.as_ref().display()))]
pub async fn resolve_output_dir(raw: impl AsRef<Path>) -> Result<PathBuf> {
    let raw = raw.as_ref();
    if raw.as_os_str().to_string_lossy().trim().is_empty() {
        exn::bail!(ErrorKind::InvalidPath(raw.to_path_buf()));
    }
    let absolute = std::path::absolute(raw).or_raise(|| ErrorKind::InvalidPath(raw.to_path_buf()))?;

    let directory = match fs::metadata(&absolute).await {
        Ok(metadata) if metadata.is_dir() => absolute,
        Ok(_) => match absolute.parent() {
            Some(parent) => parent.to_path_buf(),
            None => exn::bail!(ErrorKind::DirectoryResolution(absolute)),
        },
        Err(e) if e.kind() == IoKind::NotFound => {
            create(&absolute).await?;
            absolute
        },
        Err(e) => return Err(e).or_raise(|| ErrorKind::DirectoryResolution(absolute)),
    };

    // Readability check; a directory we can't list is no use as an output.
    fs::read_dir(&directory)
        .await
        .map(drop)
        .or_raise(|| ErrorKind::DirectoryResolution(directory.clone()))?;

    match fs::canonicalize(&directory).await {
        Ok(canonical) => Ok(canonical),
        Err(e) => {
            tracing::debug!(path = %directory.display(), error = %e, "Falling back to non-canonical output directory");
            Ok(directory)
        },
    }
}

async fn create(directory: &Path) -> Result<()> {
    match fs::create_dir_all(directory).await {
        Ok(()) => {},
        // Lost a race with a concurrent creator; the re-stat below decides.
        Err(e) if e.kind() == IoKind::AlreadyExists => {},
        Err(e) => return Err(e).or_raise(|| ErrorKind::DirectoryResolution(directory.to_path_buf())),
    }
    let metadata =
        fs::metadata(directory).await.or_raise(|| ErrorKind::DirectoryResolution(directory.to_path_buf()))?;
    if !metadata.is_dir() {
        exn::bail!(ErrorKind::DirectoryResolution(directory.to_path_buf()));
    }
    tracing::debug!(path = %directory.display(), "Created output directory");
    Ok(())
}
