use super::{blocking, ensure_file, fail_all, image_format, mismatched, tasks};
use crate::Engine;
use crate::batch;
use crate::error::{ErrorKind, Result};
use crate::model::{Anchor, BatchResult, FileTask, OperationKind, OperationParams, Position, WatermarkOptions, tags};
use crate::options::WatermarkDefaults;
use shears_codec::{Dimensions, Overlay};
use shears_fs::Reservations;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Longest watermark text accepted, in characters.
const MAX_TEXT_CHARS: usize = 10;

impl Engine {
    /// Stamp `text` onto a single image into `output_dir`.
    ///
    /// The text applies to the whole call, so a text that fails validation
    /// fails every item without writing anything. Only one file is accepted.
    #[instrument(skip(self, files, text, output_dir, options), fields(items = files.len()))]
    pub async fn add_watermark<P: AsRef<Path>>(
        &self,
        files: &[P],
        text: &str,
        output_dir: impl AsRef<Path>,
        options: WatermarkOptions,
    ) -> BatchResult {
        let tasks = tasks(files, || OperationParams::Watermark { text: text.to_string(), options: options.clone() });
        if tasks.is_empty() {
            return BatchResult::default();
        }
        if let Err(err) = validate(text, &options) {
            return fail_all(&tasks, &err);
        }
        if tasks.len() > 1 {
            let reason = format!("watermark takes exactly one file, got {}", tasks.len());
            return fail_all(&tasks, &ErrorKind::InvalidParameter(reason));
        }
        let dir = match self.batch_output_dir(output_dir.as_ref(), &tasks).await {
            Ok(dir) => dir,
            Err(failed) => return failed,
        };
        let reservations = Reservations::new();
        batch::run(OperationKind::Watermark, tasks, self.options.max_concurrency, |task| {
            self.watermark_one(task, &dir, &reservations)
        })
        .await
    }

    async fn watermark_one(&self, task: FileTask, dir: &Path, reservations: &Reservations) -> Result<PathBuf> {
        let OperationParams::Watermark { text, options } = task.params else {
            exn::bail!(mismatched(OperationKind::Watermark, &task));
        };
        let input = task.input_path;
        ensure_file(&input).await?;
        image_format(&input)?;

        let codec = Arc::clone(&self.codec);
        let source = input.clone();
        let dimensions = blocking(move || codec.metadata(&source)).await?;
        let layout = Layout::new(dimensions, &options, &self.options.watermark);
        let overlay = Overlay::svg(layout.render(dimensions, &text));
        tracing::debug!(input = %input.display(), font_size = layout.font_size, "Watermark laid out");

        let output = reservations.reserve(&*self.probe, dir, &input, tags::WATERMARK, None).await;
        let codec = Arc::clone(&self.codec);
        let destination = output.clone();
        blocking(move || codec.composite(&input, &destination, &overlay)).await?;
        Ok(output)
    }
}

/// Checks that don't depend on any particular image.
fn validate(text: &str, options: &WatermarkOptions) -> std::result::Result<(), ErrorKind> {
    let chars = text.chars().count();
    if text.trim().is_empty() {
        return Err(ErrorKind::InvalidParameter("watermark text must not be empty".to_string()));
    }
    if chars > MAX_TEXT_CHARS {
        return Err(ErrorKind::InvalidParameter(format!(
            "watermark text is {chars} characters, at most {MAX_TEXT_CHARS} allowed"
        )));
    }
    if options.font_size == Some(0) {
        return Err(ErrorKind::InvalidParameter("watermark font size must be positive".to_string()));
    }
    if options.color.as_deref().is_some_and(|c| c.trim().is_empty()) {
        return Err(ErrorKind::InvalidParameter("watermark color must not be empty".to_string()));
    }
    if options.angle.is_some_and(|a| !a.is_finite()) {
        return Err(ErrorKind::InvalidParameter("watermark angle must be a finite number".to_string()));
    }
    if let Some(Position::Ratio { x_ratio, y_ratio }) = options.position
        && !(x_ratio.is_finite() && y_ratio.is_finite())
    {
        return Err(ErrorKind::InvalidParameter("watermark position ratios must be finite numbers".to_string()));
    }
    Ok(())
}

/// Where and how the text is drawn on one particular image.
#[derive(Clone, Debug, PartialEq)]
struct Layout {
    font_size: u32,
    x: f64,
    y: f64,
    text_anchor: &'static str,
    baseline: &'static str,
    angle: f64,
    color: String,
}

impl Layout {
    fn new(dimensions: Dimensions, options: &WatermarkOptions, defaults: &WatermarkDefaults) -> Self {
        let short = f64::from(dimensions.shorter_side());
        let font_size = options
            .font_size
            .or(defaults.font_size)
            .unwrap_or_else(|| scaled(short, 0.05, 16));
        let padding = f64::from(scaled(short, 0.03, 10));
        let (width, height) = (f64::from(dimensions.width), f64::from(dimensions.height));

        let position = options.position.unwrap_or(Position::Anchor(defaults.anchor));
        let (x, y, text_anchor, baseline) = match position {
            Position::Anchor(Anchor::TopLeft) => (padding, padding, "start", "hanging"),
            Position::Anchor(Anchor::TopRight) => (width - padding, padding, "end", "hanging"),
            Position::Anchor(Anchor::BottomLeft) => (padding, height - padding, "start", "text-after-edge"),
            Position::Anchor(Anchor::BottomRight) => (width - padding, height - padding, "end", "text-after-edge"),
            Position::Anchor(Anchor::Center) => (width / 2.0, height / 2.0, "middle", "central"),
            Position::Ratio { x_ratio, y_ratio } => {
                (x_ratio.clamp(0.0, 1.0) * width, y_ratio.clamp(0.0, 1.0) * height, "middle", "central")
            },
        };

        Self {
            font_size,
            x,
            y,
            text_anchor,
            baseline,
            angle: options.angle.unwrap_or(defaults.angle),
            color: options.color.clone().unwrap_or_else(|| defaults.color.clone()),
        }
    }

    /// An SVG document the size of the image with the text placed on it.
    fn render(&self, dimensions: Dimensions, text: &str) -> String {
        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = dimensions.width,
            h = dimensions.height,
        );
        let _ = write!(
            svg,
            r#"<text x="{x}" y="{y}" font-family="sans-serif" font-size="{size}" fill="{fill}" text-anchor="{anchor}" dominant-baseline="{baseline}" transform="rotate({angle} {x} {y})">{text}</text>"#,
            x = self.x,
            y = self.y,
            size = self.font_size,
            fill = escape(&self.color),
            anchor = self.text_anchor,
            baseline = self.baseline,
            angle = self.angle,
            text = escape(text),
        );
        svg.push_str("</svg>");
        svg
    }
}

/// `factor` of the shorter side, rounded, but never below `floor`.
fn scaled(short: f64, factor: f64, floor: u32) -> u32 {
    // Image sides are u32, so the product always fits.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let value = (short * factor).round() as u32;
    value.max(floor)
}

/// Escape text for use in SVG character data and attribute values.
fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::{default_engine, engine, touch};
    use rstest::rstest;
    use shears_codec::MockCodec;

    fn layout(dimensions: Dimensions, options: WatermarkOptions) -> Layout {
        Layout::new(dimensions, &options, &WatermarkDefaults::default())
    }

    #[rstest]
    #[case(Dimensions::new(1000, 800), 40, 24.0)]
    #[case(Dimensions::new(4000, 3000), 150, 90.0)]
    #[case(Dimensions::new(100, 100), 16, 10.0)]
    fn test_sizes_scale_with_shorter_side(#[case] dimensions: Dimensions, #[case] font: u32, #[case] padding: f64) {
        let layout = layout(dimensions, WatermarkOptions::default());
        assert_eq!(layout.font_size, font);
        // Default anchor is bottom-right, inset by the padding.
        assert_eq!(layout.x, f64::from(dimensions.width) - padding);
        assert_eq!(layout.y, f64::from(dimensions.height) - padding);
        assert_eq!((layout.text_anchor, layout.baseline), ("end", "text-after-edge"));
    }

    #[rstest]
    #[case(Anchor::TopLeft, 24.0, 24.0, "start")]
    #[case(Anchor::TopRight, 976.0, 24.0, "end")]
    #[case(Anchor::BottomLeft, 24.0, 776.0, "start")]
    #[case(Anchor::Center, 500.0, 400.0, "middle")]
    fn test_named_anchors(#[case] anchor: Anchor, #[case] x: f64, #[case] y: f64, #[case] text_anchor: &str) {
        let options = WatermarkOptions { position: Some(anchor.into()), ..WatermarkOptions::default() };
        let layout = layout(Dimensions::new(1000, 800), options);
        assert_eq!((layout.x, layout.y, layout.text_anchor), (x, y, text_anchor));
    }

    #[rstest]
    #[case(0.25, 0.5, 250.0, 400.0)]
    #[case(-0.5, 1.5, 0.0, 800.0)]
    fn test_ratio_position_is_clamped(#[case] x_ratio: f64, #[case] y_ratio: f64, #[case] x: f64, #[case] y: f64) {
        let options = WatermarkOptions {
            position: Some(Position::Ratio { x_ratio, y_ratio }),
            ..WatermarkOptions::default()
        };
        let layout = layout(Dimensions::new(1000, 800), options);
        assert_eq!((layout.x, layout.y), (x, y));
        assert_eq!((layout.text_anchor, layout.baseline), ("middle", "central"));
    }

    #[test]
    fn test_explicit_options_win() {
        let options = WatermarkOptions {
            font_size: Some(12),
            color: Some("#ff0000".to_string()),
            angle: Some(-30.0),
            position: None,
        };
        let layout = layout(Dimensions::new(1000, 800), options);
        assert_eq!(layout.font_size, 12);
        assert_eq!(layout.color, "#ff0000");
        assert_eq!(layout.angle, -30.0);
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a&b> "c" 'd'"#), "&lt;a&amp;b&gt; &quot;c&quot; &apos;d&apos;");
        assert_eq!(escape("水印"), "水印");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("elevenchars")]
    fn test_invalid_text(#[case] text: &str) {
        let err = validate(text, &WatermarkOptions::default()).unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidParameter(_)));
    }

    #[test]
    fn test_text_length_counts_characters() {
        // Ten characters, thirty bytes.
        validate("水印水印水印水印水印", &WatermarkOptions::default()).unwrap();
    }

    #[tokio::test]
    async fn test_watermark_composites_escaped_overlay() {
        let source = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let input = touch(source.path(), "photo.jpg");
        let (engine, codec) = default_engine();

        let batch = engine.add_watermark(&[&input], "<b>&co", out.path(), WatermarkOptions::default()).await;
        assert!(batch.success, "{:?}", batch.results);
        assert_eq!(batch.results[0].output_path, out.path().canonicalize().unwrap().join("photo_水印.jpg"));

        let overlays = codec.overlays();
        assert_eq!(overlays.len(), 1);
        assert!(overlays[0].contains(r#"width="1000" height="800""#));
        assert!(overlays[0].contains("&lt;b&gt;&amp;co"));
        assert!(overlays[0].contains(r#"fill="rgba(255,255,255,0.5)""#));
        assert!(overlays[0].contains(r#"transform="rotate(0 976 776)""#));
    }

    #[tokio::test]
    async fn test_long_text_fails_every_item_and_writes_nothing() {
        let out = tempfile::tempdir().unwrap();
        let inputs = [touch(out.path(), "a.jpg"), touch(out.path(), "b.jpg")];
        let (engine, codec) = default_engine();

        let batch = engine.add_watermark(&inputs, "elevenchars", out.path(), WatermarkOptions::default()).await;
        assert!(!batch.success);
        assert_eq!(batch.results.len(), 2);
        assert!(batch.results.iter().all(|r| !r.success && r.output_path.as_os_str().is_empty()));
        assert_eq!(codec.calls(), 0);
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_more_than_one_file_rejected() {
        let out = tempfile::tempdir().unwrap();
        let inputs = [touch(out.path(), "a.jpg"), touch(out.path(), "b.jpg")];
        let (engine, codec) = default_engine();
        let batch = engine.add_watermark(&inputs, "ok", out.path(), WatermarkOptions::default()).await;
        assert!(!batch.success);
        assert!(batch.results.iter().all(|r| r.error.as_deref().unwrap().contains("exactly one file")));
        assert_eq!(codec.calls(), 0);
    }

    #[tokio::test]
    async fn test_codec_failure_surfaces() {
        let out = tempfile::tempdir().unwrap();
        let input = touch(out.path(), "broken.png");
        let (engine, _) = engine(MockCodec::default().failing_on("broken.png"));
        let batch = engine.add_watermark(&[&input], "ok", out.path(), WatermarkOptions::default()).await;
        assert!(!batch.success);
        assert_eq!(batch.results[0].error.as_deref(), Some("failed to decode image: mock failure for broken.png"));
    }
}
