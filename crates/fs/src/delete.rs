//! Deletion with permission self-repair.
//!
//! A removal that fails for permission reasons gets exactly one more chance:
//! the parent directory and the entry are made owner-writable, extended
//! attributes are stripped where an `xattr` tool exists, and the removal is
//! retried. Repair steps that fail are logged and skipped; only the outcome
//! of the retry is reported.

use crate::classify::{Failure, classify};
use crate::error::{ErrorKind, Result, map_io_error};
use exn::ResultExt;
use futures::future::join_all;
use std::io::{ErrorKind as IoKind, Result as IoResult};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;
use tokio::process::Command;
use tracing::instrument;

/// Located once per process; most platforms don't have one.
static XATTR: LazyLock<Option<PathBuf>> = LazyLock::new(|| which::which("xattr").ok());

/// What happened to one path passed to [`delete_each`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed(PathBuf),
    Failed {
        path: PathBuf,
        failure: Failure,
        message: String,
    },
}
impl DeleteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Removed(path) | Self::Failed { path, .. } => path,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed(_))
    }
}

async fn remove(path: &Path, is_dir: bool) -> IoResult<()> {
    let removed = match is_dir {
        true => fs::remove_dir_all(path).await,
        false => fs::remove_file(path).await,
    };
    match removed {
        // Someone else got there first; the goal is met.
        Err(e) if e.kind() == IoKind::NotFound => Ok(()),
        other => other,
    }
}

async fn make_writable(path: &Path) -> IoResult<()> {
    #[allow(unused_mut)]
    let mut permissions = fs::metadata(path).await?.permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions).await
}

async fn strip_attributes(path: &Path) -> IoResult<()> {
    let Some(tool) = XATTR.as_deref() else {
        return Ok(());
    };
    let status = Command::new(tool).arg("-c").arg(path).status().await?;
    match status.success() {
        true => Ok(()),
        false => Err(std::io::Error::other(format!("xattr exited with {status}"))),
    }
}

/// Best-effort repairs before the single retry.
async fn repair(path: &Path) {
    if let Some(parent) = path.parent()
        && let Err(e) = make_writable(parent).await
    {
        tracing::debug!(path = %parent.display(), error = %e, "Could not make parent directory writable");
    }
    if let Err(e) = make_writable(path).await {
        tracing::debug!(path = %path.display(), error = %e, "Could not make entry writable");
    }
    if let Err(e) = strip_attributes(path).await {
        tracing::debug!(path = %path.display(), error = %e, "Could not strip extended attributes");
    }
}

/// Delete one file or folder (recursively), repairing permissions once if
/// needed.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub async fn delete_path(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let absolute = std::path::absolute(path).or_raise(|| ErrorKind::InvalidPath(path.to_path_buf()))?;
    let metadata = fs::symlink_metadata(&absolute).await.map_err(|e| map_io_error(e, &absolute))?;
    let is_dir = metadata.is_dir();

    let error = match remove(&absolute, is_dir).await {
        Ok(()) => return Ok(()),
        Err(e) if classify(&e).is_permission() => e,
        Err(e) => exn::bail!(map_io_error(e, &absolute)),
    };

    tracing::debug!(error = %error, "Permission denied; repairing and retrying once");
    repair(&absolute).await;
    remove(&absolute, is_dir).await.map_err(|e| map_io_error(e, &absolute))?;
    tracing::debug!("Deleted after repairing permissions");
    Ok(())
}

/// Delete every path independently. One failure never stops the others.
///
/// Outcomes are returned in input order.
pub async fn delete_each<P: AsRef<Path>>(paths: &[P]) -> Vec<DeleteOutcome> {
    let attempts = paths.iter().map(|path| async move {
        let path = path.as_ref();
        match delete_path(path).await {
            Ok(()) => DeleteOutcome::Removed(path.to_path_buf()),
            Err(err) => {
                let failure = err.failure();
                let message = (*err).to_string();
                tracing::warn!(path = %path.display(), error = %message, "Failed to delete");
                DeleteOutcome::Failed {
                    path: path.to_path_buf(),
                    failure,
                    message,
                }
            },
        }
    });
    join_all(attempts).await
}

/// Delete every path; `true` only if all of them are gone.
///
/// An empty list is trivially successful and touches nothing.
pub async fn delete_many<P: AsRef<Path>>(paths: &[P]) -> bool {
    if paths.is_empty() {
        return true;
    }
    delete_each(paths).await.iter().all(DeleteOutcome::is_removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_many_empty() {
        let paths: [&Path; 0] = [];
        assert!(delete_many(&paths).await);
    }

    #[tokio::test]
    async fn test_delete_file_and_folder() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("a.txt");
        let folder = temp_dir.path().join("folder");
        std::fs::write(&file, b"data").unwrap();
        std::fs::create_dir_all(folder.join("nested/deeper")).unwrap();
        std::fs::write(folder.join("nested/b.txt"), b"data").unwrap();
        assert!(delete_many(&[&file, &folder]).await);
        assert!(!file.exists());
        assert!(!folder.exists());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_others() {
        let temp_dir = tempfile::tempdir().unwrap();
        let first = temp_dir.path().join("1.txt");
        let missing = temp_dir.path().join("2.txt");
        let third = temp_dir.path().join("3.txt");
        std::fs::write(&first, b"1").unwrap();
        std::fs::write(&third, b"3").unwrap();

        let outcomes = delete_each(&[&first, &missing, &third]).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0], DeleteOutcome::Removed(first.clone()));
        assert!(matches!(&outcomes[1], DeleteOutcome::Failed { failure: Failure::NotFound, .. }));
        assert_eq!(outcomes[2].path(), third.as_path());
        assert!(outcomes[2].is_removed());
        assert!(!first.exists() && !third.exists());

        assert!(!delete_many(&[&missing]).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_repairs_read_only_parent() {
        use std::os::unix::fs::PermissionsExt;
        let temp_dir = tempfile::tempdir().unwrap();
        let locked = temp_dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        let file = locked.join("a.txt");
        std::fs::write(&file, b"data").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        let removed = delete_path(&file).await;
        // Restore so the tempdir can clean up whatever the outcome.
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        removed.unwrap();
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_symlink_removes_link_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = temp_dir.path().join("target.txt");
        std::fs::write(&target, b"data").unwrap();
        let link = temp_dir.path().join("link.txt");
        #[cfg(unix)]
        std::os::unix::fs::symlink(&target, &link).unwrap();
        #[cfg(not(unix))]
        std::fs::copy(&target, &link).unwrap();
        delete_path(&link).await.unwrap();
        assert!(!link.exists());
        assert!(target.exists());
    }
}
