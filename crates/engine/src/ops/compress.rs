use super::{blocking, ensure_file, mismatched, tasks};
use crate::Engine;
use crate::batch;
use crate::error::{ErrorKind, Result};
use crate::model::{BatchResult, FileTask, OperationKind, OperationParams, tags};
use shears_codec::ImageFormat;
use shears_fs::Reservations;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Formats that can be re-encoded in place. BMP has nothing to compress.
const COMPRESSIBLE: &[ImageFormat] =
    &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Webp, ImageFormat::Tiff, ImageFormat::Avif];

/// How to name a format nothing here recognises: its extension, or the file
/// name when there is none.
fn unknown_format(input: &Path) -> String {
    input
        .extension()
        .or_else(|| input.file_name())
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

impl Engine {
    /// Re-encode every file at `quality`, keeping its format, into
    /// `output_dir`.
    ///
    /// A quality outside 1-100 (or none at all) uses the configured default.
    #[instrument(skip(self, paths, output_dir), fields(items = paths.len()))]
    pub async fn compress<P: AsRef<Path>>(
        &self,
        paths: &[P],
        output_dir: impl AsRef<Path>,
        quality: Option<i64>,
    ) -> BatchResult {
        let tasks = tasks(paths, || OperationParams::Compress { quality });
        if tasks.is_empty() {
            return BatchResult::default();
        }
        let dir = match self.batch_output_dir(output_dir.as_ref(), &tasks).await {
            Ok(dir) => dir,
            Err(failed) => return failed,
        };
        let reservations = Reservations::new();
        batch::run(OperationKind::Compress, tasks, self.options.max_concurrency, |task| {
            self.compress_one(task, &dir, &reservations)
        })
        .await
    }

    async fn compress_one(&self, task: FileTask, dir: &Path, reservations: &Reservations) -> Result<PathBuf> {
        let OperationParams::Compress { quality } = task.params else {
            exn::bail!(mismatched(OperationKind::Compress, &task));
        };
        let input = task.input_path;
        ensure_file(&input).await?;
        let format = match ImageFormat::from_path(&input) {
            Some(format) if COMPRESSIBLE.contains(&format) => format,
            Some(format) => exn::bail!(ErrorKind::UnsupportedFormat(format.to_string())),
            None => exn::bail!(ErrorKind::UnsupportedFormat(unknown_format(&input))),
        };
        let quality = self.options.effective_quality(quality);

        let output = reservations.reserve(&*self.probe, dir, &input, tags::COMPRESS, None).await;
        let codec = Arc::clone(&self.codec);
        let destination = output.clone();
        blocking(move || codec.reencode(&input, &destination, format, quality)).await?;
        Ok(output)
    }
}
