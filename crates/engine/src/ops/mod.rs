//! The operations, one module each, as `impl Engine` blocks.

mod compress;
mod convert;
mod crop;
mod delete;
mod rename;
mod watermark;

use crate::Engine;
use crate::error::{ErrorKind, Result};
use crate::model::{BatchResult, FileTask, OperationKind, OperationParams};
use shears_codec::ImageFormat;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Run a codec call on the blocking pool.
///
/// A panic inside the codec fails the item instead of tearing down the batch.
pub(crate) async fn blocking<T, F>(call: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> shears_codec::error::Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(call).await {
        Ok(result) => result.map_err(ErrorKind::codec),
        Err(join) => exn::bail!(ErrorKind::CodecFailure(format!("codec task failed: {join}"))),
    }
}

/// The input must exist and be a regular file (symlinks are followed).
pub(crate) async fn ensure_file(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).await.map_err(|e| ErrorKind::io(&e, path))?;
    if !metadata.is_file() {
        exn::bail!(ErrorKind::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

/// The input's image format, judged by its extension.
pub(crate) fn image_format(path: &Path) -> Result<ImageFormat> {
    match ImageFormat::from_path(path) {
        Some(format) => Ok(format),
        None => exn::bail!(ErrorKind::NotAnImage(path.to_path_buf())),
    }
}

/// Complain about a task routed to the wrong operation.
pub(crate) fn mismatched(expected: OperationKind, task: &FileTask) -> ErrorKind {
    ErrorKind::InvalidParameter(format!("{} task submitted to {expected}", task.operation()))
}

impl Engine {
    /// Resolve the batch's output directory, or fail every task with the
    /// reason.
    pub(crate) async fn batch_output_dir(
        &self,
        raw: &Path,
        tasks: &[FileTask],
    ) -> std::result::Result<PathBuf, BatchResult> {
        match shears_fs::resolve_output_dir(raw).await {
            Ok(dir) => Ok(dir),
            Err(err) => {
                let kind = (*ErrorKind::fs(err)).clone();
                tracing::warn!(path = %raw.display(), error = %kind, "Output directory unusable; failing batch");
                Err(fail_all(tasks, &kind))
            },
        }
    }

    /// Resolve (creating if needed) an output directory.
    pub async fn resolve_output_dir(&self, raw: impl AsRef<Path>) -> Result<PathBuf> {
        shears_fs::resolve_output_dir(raw).await.map_err(ErrorKind::fs)
    }
}

/// Fail every task with the same error, running none of them.
pub(crate) fn fail_all(tasks: &[FileTask], err: &ErrorKind) -> BatchResult {
    BatchResult::failed_all(tasks.iter().map(|t| t.input_path.as_path()), &err.to_string())
}

pub(crate) fn tasks<P: AsRef<Path>>(paths: &[P], params: impl Fn() -> OperationParams) -> Vec<FileTask> {
    paths.iter().map(|path| FileTask::new(path.as_ref(), params())).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::{Engine, Options};
    use shears_codec::{Dimensions, MockCodec};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    pub(crate) fn engine(codec: MockCodec) -> (Engine, Arc<MockCodec>) {
        let codec = Arc::new(codec);
        (Engine::new(codec.clone(), Options::default()), codec)
    }

    pub(crate) fn default_engine() -> (Engine, Arc<MockCodec>) {
        engine(MockCodec::new(Dimensions::new(1000, 800)))
    }

    /// Create a file with placeholder content; the mock codec never reads it.
    pub(crate) fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"input").unwrap();
        path
    }
}
