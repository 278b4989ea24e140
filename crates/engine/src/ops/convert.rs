use super::{blocking, ensure_file, image_format, mismatched};
use crate::Engine;
use crate::batch;
use crate::error::Result;
use crate::model::{BatchResult, ConvertFormat, FileTask, ItemResult, OperationKind, OperationParams, tags};
use shears_fs::Reservations;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

impl Engine {
    /// Convert each file to its requested format (`jpg`, `png` or `bmp`)
    /// into `output_dir`.
    ///
    /// Every pair names its own target, so one batch can mix formats. An
    /// unsupported target fails only its own item.
    #[instrument(skip(self, requests, output_dir), fields(items = requests.len()))]
    pub async fn convert<P: AsRef<Path>, S: AsRef<str>>(
        &self,
        requests: &[(P, S)],
        output_dir: impl AsRef<Path>,
    ) -> BatchResult {
        if requests.is_empty() {
            return BatchResult::default();
        }
        let parsed: Vec<std::result::Result<FileTask, ItemResult>> = requests
            .iter()
            .map(|(path, target)| match target.as_ref().parse::<ConvertFormat>() {
                Ok(target) => Ok(FileTask::new(path.as_ref(), OperationParams::Convert { target })),
                Err(err) => Err(ItemResult::failed(path.as_ref(), (*err).to_string())),
            })
            .collect();
        let tasks: Vec<FileTask> = parsed.iter().filter_map(|p| p.as_ref().ok()).cloned().collect();

        let converted = match tasks.is_empty() {
            true => Vec::new(),
            false => match self.batch_output_dir(output_dir.as_ref(), &tasks).await {
                Ok(dir) => {
                    let reservations = Reservations::new();
                    batch::run(OperationKind::Convert, tasks, self.options.max_concurrency, |task| {
                        self.convert_one(task, &dir, &reservations)
                    })
                    .await
                    .results
                },
                Err(failed) => failed.results,
            },
        };
        merge(parsed, converted)
    }

    async fn convert_one(&self, task: FileTask, dir: &Path, reservations: &Reservations) -> Result<PathBuf> {
        let OperationParams::Convert { target } = task.params else {
            exn::bail!(mismatched(OperationKind::Convert, &task));
        };
        let input = task.input_path;
        image_format(&input)?;
        ensure_file(&input).await?;

        let output = reservations.reserve(&*self.probe, dir, &input, tags::CONVERT, Some(target.extension())).await;
        let codec = Arc::clone(&self.codec);
        let destination = output.clone();
        blocking(move || codec.convert(&input, &destination, target.image_format())).await?;
        Ok(output)
    }
}

/// Put rejected requests back between the converted ones, in request order.
fn merge(parsed: Vec<std::result::Result<FileTask, ItemResult>>, converted: Vec<ItemResult>) -> BatchResult {
    let mut converted = converted.into_iter();
    let results = parsed
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(_) => converted.next(),
            Err(rejected) => Some(rejected),
        })
        .collect();
    BatchResult::from_results(results)
}

#[cfg(test)]
mod tests {
    use crate::ops::testing::{default_engine, touch};
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_convert_png_to_jpg() {
        let source = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let input = touch(source.path(), "a.png");
        let (engine, _) = default_engine();

        let batch = engine.convert(&[(&input, "jpg")], out.path()).await;
        assert!(batch.success);
        let output = &batch.results[0].output_path;
        assert_eq!(output, &out.path().canonicalize().unwrap().join("a_转换.jpg"));

        // Distinct from what compress would name the same input.
        let compressed = engine.compress(&[&input], out.path(), None).await;
        assert_ne!(&compressed.results[0].output_path, output);
        assert_eq!(compressed.results[0].output_path.file_name().unwrap(), "a_压缩.png");
    }

    #[tokio::test]
    async fn test_mixed_targets_and_rejections_keep_order() {
        let source = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let first = touch(source.path(), "first.jpg");
        let second = touch(source.path(), "second.jpg");
        let notes = touch(source.path(), "notes.txt");
        let third = touch(source.path(), "third.tiff");
        let (engine, codec) = default_engine();

        let requests = [(&first, "png"), (&second, "gif"), (&notes, "jpg"), (&third, "BMP")];
        let batch = engine.convert(&requests, out.path()).await;
        assert!(!batch.success);
        let inputs: Vec<&PathBuf> = batch.results.iter().map(|r| &r.input_path).collect();
        assert_eq!(inputs, vec![&first, &second, &notes, &third]);
        assert_eq!(batch.results[0].output_path.file_name().unwrap(), "first_转换.png");
        assert_eq!(batch.results[1].error.as_deref(), Some("unsupported format: gif"));
        assert_eq!(batch.results[2].error, Some(format!("not an image: {}", notes.display())));
        assert_eq!(batch.results[3].output_path.file_name().unwrap(), "third_转换.bmp");
        assert_eq!(codec.calls(), 2);
    }

    #[tokio::test]
    async fn test_all_targets_rejected_writes_nothing() {
        let out = tempfile::tempdir().unwrap();
        let input = touch(out.path(), "a.png");
        let (engine, codec) = default_engine();
        let batch = engine.convert(&[(&input, "webp")], out.path().join("never-created")).await;
        assert!(!batch.success);
        assert!(!out.path().join("never-created").exists());
        assert_eq!(codec.calls(), 0);
    }
}
