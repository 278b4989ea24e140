use crate::Engine;
use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::instrument;

impl Engine {
    /// Give `path` a new base name within its directory.
    ///
    /// Returns `true` on success, including when the name is unchanged.
    pub async fn rename(&self, path: impl AsRef<Path>, new_name: &str) -> bool {
        let path = path.as_ref();
        match self.rename_checked(path, new_name).await {
            Ok(_) => true,
            Err(err) => {
                let message = (*err).to_string();
                tracing::warn!(path = %path.display(), new_name, error = %message, "Rename failed");
                false
            },
        }
    }

    /// Like [`rename`](Self::rename), but reports the new path or why the
    /// rename was refused.
    ///
    /// Files keep their extension when `new_name` has none. An existing
    /// entry under the target name is never replaced and never worked
    /// around with a numbered variant; the rename fails with
    /// [`AlreadyExists`](ErrorKind::AlreadyExists) instead.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn rename_checked(&self, path: impl AsRef<Path>, new_name: &str) -> Result<PathBuf> {
        let source = path.as_ref();
        let metadata = fs::symlink_metadata(source).await.map_err(|e| ErrorKind::io(&e, source))?;
        let target = shears_fs::rename_target(source, new_name, metadata.is_dir()).map_err(ErrorKind::fs)?;
        if target == source {
            tracing::debug!("Name unchanged; nothing to do");
            return Ok(target);
        }
        if fs::symlink_metadata(&target).await.is_ok() && !same_entry(source, &target).await {
            exn::bail!(ErrorKind::AlreadyExists(target));
        }
        fs::rename(source, &target).await.map_err(|e| ErrorKind::io(&e, source))?;
        tracing::info!(target = %target.display(), "Renamed");
        Ok(target)
    }
}

/// Whether two paths name the same entry, as they do for a case-only rename
/// on a case-insensitive filesystem.
async fn same_entry(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a).await, fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
