//! Tasks submitted to the engine and the results it reports.

use crate::error::{Error, ErrorKind};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use shears_codec::{ImageFormat, Rect};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Markers embedded in generated file names, identifying the operation that
/// produced the file.
pub mod tags {
    pub const COMPRESS: &str = "压缩";
    pub const CONVERT: &str = "转换";
    pub const CROP: &str = "裁剪";
    pub const WATERMARK: &str = "水印";
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[display("compress")]
    Compress,
    #[display("convert")]
    Convert,
    #[display("crop")]
    Crop,
    #[display("watermark")]
    Watermark,
    #[display("rename")]
    Rename,
    #[display("delete")]
    Delete,
}
impl OperationKind {
    /// The name marker for operations that generate new files.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::Compress => Some(tags::COMPRESS),
            Self::Convert => Some(tags::CONVERT),
            Self::Crop => Some(tags::CROP),
            Self::Watermark => Some(tags::WATERMARK),
            Self::Rename | Self::Delete => None,
        }
    }
}

/// Target formats offered by the convert operation.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvertFormat {
    #[display("jpg")]
    Jpg,
    #[display("png")]
    Png,
    #[display("bmp")]
    Bmp,
}
impl ConvertFormat {
    pub fn extension(&self) -> &'static str {
        self.image_format().extension()
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            Self::Jpg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Bmp => ImageFormat::Bmp,
        }
    }
}
impl FromStr for ConvertFormat {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            "bmp" => Ok(Self::Bmp),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}

/// One of the five named watermark positions.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    #[display("top-left")]
    TopLeft,
    #[display("top-right")]
    TopRight,
    #[display("bottom-left")]
    BottomLeft,
    #[default]
    #[display("bottom-right")]
    BottomRight,
    #[display("center")]
    Center,
}
impl FromStr for Anchor {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-right" => Ok(Self::BottomRight),
            "center" | "centre" => Ok(Self::Center),
            _ => exn::bail!(ErrorKind::InvalidParameter(format!("unknown position: {s}"))),
        }
    }
}

/// Where a watermark goes: a named anchor inset by the padding, or a point
/// given as fractions of the image size measured from the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    Anchor(Anchor),
    #[serde(rename_all = "camelCase")]
    Ratio { x_ratio: f64, y_ratio: f64 },
}
impl From<Anchor> for Position {
    fn from(anchor: Anchor) -> Self {
        Self::Anchor(anchor)
    }
}

/// Per-request watermark settings. Anything left unset falls back to the
/// engine's [`WatermarkDefaults`](crate::options::WatermarkDefaults), then to
/// values derived from the image size.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatermarkOptions {
    pub font_size: Option<u32>,
    pub color: Option<String>,
    /// Rotation in degrees, clockwise, about the anchor point.
    pub angle: Option<f64>,
    pub position: Option<Position>,
}

/// Operation-specific parameters of a [`FileTask`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum OperationParams {
    /// Quality 1-100; anything else falls back to the configured default.
    Compress { quality: Option<i64> },
    Convert { target: ConvertFormat },
    Crop { rect: CropArea },
    Watermark { text: String, options: WatermarkOptions },
    Rename { new_name: String },
    Delete,
}
impl OperationParams {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Compress { .. } => OperationKind::Compress,
            Self::Convert { .. } => OperationKind::Convert,
            Self::Crop { .. } => OperationKind::Crop,
            Self::Watermark { .. } => OperationKind::Watermark,
            Self::Rename { .. } => OperationKind::Rename,
            Self::Delete => OperationKind::Delete,
        }
    }
}

/// Serializable mirror of [`Rect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropArea {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}
impl From<CropArea> for Rect {
    fn from(area: CropArea) -> Self {
        Rect::new(area.left, area.top, area.width, area.height)
    }
}
impl From<Rect> for CropArea {
    fn from(rect: Rect) -> Self {
        Self {
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
        }
    }
}

/// One unit of work. Immutable once submitted.
#[derive(Clone, Debug, PartialEq)]
pub struct FileTask {
    pub input_path: PathBuf,
    pub params: OperationParams,
}
impl FileTask {
    pub fn new(input_path: impl Into<PathBuf>, params: OperationParams) -> Self {
        Self { input_path: input_path.into(), params }
    }

    pub fn operation(&self) -> OperationKind {
        self.params.kind()
    }
}

/// Outcome of one task. `output_path` is empty unless the task succeeded
/// and produced a file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
impl ItemResult {
    pub fn succeeded(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(input_path: impl Into<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: PathBuf::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Outcome of a batch: one [`ItemResult`] per submitted task, in submission
/// order. `success` holds only if every item succeeded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success: bool,
    pub results: Vec<ItemResult>,
}
impl Default for BatchResult {
    fn default() -> Self {
        Self { success: true, results: Vec::new() }
    }
}
impl BatchResult {
    pub fn from_results(results: Vec<ItemResult>) -> Self {
        Self { success: results.iter().all(|r| r.success), results }
    }

    /// Fail every input with the same message, without running anything.
    pub fn failed_all<'a>(inputs: impl IntoIterator<Item = &'a Path>, error: &str) -> Self {
        Self::from_results(inputs.into_iter().map(|input| ItemResult::failed(input, error)).collect())
    }

    /// Number of items that succeeded.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }
}
