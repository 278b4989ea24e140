use super::{blocking, ensure_file, image_format, mismatched};
use crate::Engine;
use crate::batch;
use crate::error::{ErrorKind, Result};
use crate::model::{CropArea, FileTask, ItemResult, OperationKind, OperationParams, tags};
use shears_codec::Rect;
use shears_fs::Reservations;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

impl Engine {
    /// Cut `rect` out of a single image into `output_dir`.
    ///
    /// Exactly one file must be given. An empty rectangle is rejected before
    /// the codec is involved; a rectangle reaching past the image's edges is
    /// left to the codec, whose message is reported as is.
    #[instrument(skip(self, files, output_dir), fields(items = files.len()))]
    pub async fn crop<P: AsRef<Path>>(&self, files: &[P], output_dir: impl AsRef<Path>, rect: Rect) -> ItemResult {
        let input = match files {
            [file] => file.as_ref().to_path_buf(),
            _ => {
                let input = files.first().map(|f| f.as_ref().to_path_buf()).unwrap_or_default();
                let reason = format!("crop takes exactly one file, got {}", files.len());
                return ItemResult::failed(input, ErrorKind::InvalidParameter(reason).to_string());
            },
        };
        if rect.is_empty() {
            let reason = format!("crop area must have a positive size, got {}x{}", rect.width, rect.height);
            return ItemResult::failed(input, ErrorKind::InvalidParameter(reason).to_string());
        }

        let tasks = vec![FileTask::new(&input, OperationParams::Crop { rect: CropArea::from(rect) })];
        let batch = match self.batch_output_dir(output_dir.as_ref(), &tasks).await {
            Ok(dir) => {
                let reservations = Reservations::new();
                batch::run(OperationKind::Crop, tasks, 1, |task| self.crop_one(task, &dir, &reservations)).await
            },
            Err(failed) => failed,
        };
        batch
            .results
            .into_iter()
            .next()
            .unwrap_or_else(|| ItemResult::failed(input, "crop produced no result"))
    }

    async fn crop_one(&self, task: FileTask, dir: &Path, reservations: &Reservations) -> Result<PathBuf> {
        let OperationParams::Crop { rect } = task.params else {
            exn::bail!(mismatched(OperationKind::Crop, &task));
        };
        let input = task.input_path;
        ensure_file(&input).await?;
        image_format(&input)?;

        let output = reservations.reserve(&*self.probe, dir, &input, tags::CROP, None).await;
        let codec = Arc::clone(&self.codec);
        let destination = output.clone();
        blocking(move || codec.crop(&input, &destination, Rect::from(rect))).await?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use crate::ops::testing::{default_engine, touch};
    use rstest::rstest;
    use shears_codec::Rect;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_crop_writes_tagged_output() {
        let source = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let input = touch(source.path(), "photo.png");
        let (engine, codec) = default_engine();

        let result = engine.crop(&[&input], out.path(), Rect::new(10, 20, 300, 200)).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output_path, out.path().canonicalize().unwrap().join("photo_裁剪.png"));
        assert!(result.output_path.exists());
        assert_eq!(codec.calls(), 1);
    }

    #[rstest]
    #[case(Rect::new(0, 0, 0, 10))]
    #[case(Rect::new(0, 0, 10, 0))]
    #[tokio::test]
    async fn test_empty_area_rejected_before_codec(#[case] rect: Rect) {
        let out = tempfile::tempdir().unwrap();
        let input = touch(out.path(), "a.jpg");
        let (engine, codec) = default_engine();
        let result = engine.crop(&[&input], out.path(), rect).await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("invalid parameter"));
        assert_eq!(codec.calls(), 0);
    }

    #[tokio::test]
    async fn test_exactly_one_file() {
        let out = tempfile::tempdir().unwrap();
        let inputs = [touch(out.path(), "a.jpg"), touch(out.path(), "b.jpg")];
        let (engine, codec) = default_engine();

        let result = engine.crop(&inputs, out.path(), Rect::new(0, 0, 10, 10)).await;
        assert!(!result.success);
        assert_eq!(result.input_path, inputs[0]);
        assert!(result.error.unwrap().contains("exactly one file"));

        let none: [PathBuf; 0] = [];
        let result = engine.crop(&none, out.path(), Rect::new(0, 0, 10, 10)).await;
        assert!(!result.success);
        assert_eq!(codec.calls(), 0);
    }

    #[tokio::test]
    async fn test_out_of_bounds_reported_verbatim() {
        let out = tempfile::tempdir().unwrap();
        let input = touch(out.path(), "a.jpg");
        let (engine, _) = default_engine();
        let result = engine.crop(&[&input], out.path(), Rect::new(900, 0, 200, 100)).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("crop area 900,0 200x100 exceeds image bounds 1000x800"));
        assert!(!out.path().join("a_裁剪.jpg").exists());
    }

    #[tokio::test]
    async fn test_non_image_rejected() {
        let out = tempfile::tempdir().unwrap();
        let input = touch(out.path(), "notes.txt");
        let (engine, codec) = default_engine();
        let result = engine.crop(&[&input], out.path(), Rect::new(0, 0, 10, 10)).await;
        assert_eq!(result.error, Some(format!("not an image: {}", input.display())));
        assert_eq!(codec.calls(), 0);
    }
}
