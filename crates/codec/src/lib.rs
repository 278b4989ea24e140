//! Image codec capability consumed by the batch engine.
//!
//! The engine never touches pixels itself. It talks to a [`Codec`], which
//! can:
//!
//! - **Inspect** an image's [`Dimensions`] without decoding pixel data
//!   ([`Codec::metadata`])
//! - **Re-encode** an image at a given quality, keeping its format
//!   ([`Codec::reencode`])
//! - **Convert** between the supported [`ImageFormat`]s ([`Codec::convert`])
//! - **Crop** a [`Rect`] out of an image ([`Codec::crop`])
//! - **Composite** an SVG [`Overlay`] on top of an image ([`Codec::composite`])
//!
//! All methods are blocking; async callers are expected to run them inside
//! [`spawn_blocking`](https://docs.rs/tokio/latest/tokio/task/fn.spawn_blocking.html).
//! [`ImageCodec`] is the default implementation, backed by the `image` crate
//! for encoding and `resvg` for overlay rasterisation. Outputs are written to
//! a temporary file next to the destination and only moved into place once
//! encoding succeeds, so a failed call never leaves a half-written file under
//! the final name.

mod construct;
pub mod error;
mod geometry;
#[cfg(feature = "mock")]
mod mock;
mod ops;
mod overlay;
mod util;

use crate::error::Result;
pub use crate::geometry::{Dimensions, Rect};
#[cfg(feature = "mock")]
pub use crate::mock::{MOCK_OUTPUT, MockCodec};
pub use crate::ops::ImageCodec;
pub use crate::overlay::Overlay;
use std::path::Path;
use std::sync::Arc;

pub type CodecHandle = Arc<dyn Codec + Send + Sync>;

/// A supported image format.
///
/// Parsed from user input or file extensions via [`FromStr`](std::str::FromStr)
/// and [`ImageFormat::from_path`]. `jpg` and `jpeg` (and `tif`/`tiff`) are the
/// same format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// JPEG (.jpg, .jpeg)
    Jpeg,
    /// PNG (.png)
    Png,
    /// Windows bitmap (.bmp)
    Bmp,
    /// WebP (.webp)
    Webp,
    /// TIFF (.tif, .tiff)
    Tiff,
    /// AVIF (.avif)
    Avif,
}

/// The pixel-level capability behind every transform operation.
///
/// Implementations must treat writes as atomic-on-success: if a method
/// returns an error, nothing may be left at `output`.
pub trait Codec: Send + Sync {
    /// Read the width and height of the image at `path`.
    fn metadata(&self, path: &Path) -> Result<Dimensions>;

    /// Re-encode `input` into `output` using `format` at `quality` (1-100).
    fn reencode(&self, input: &Path, output: &Path, format: ImageFormat, quality: u8) -> Result<()>;

    /// Decode `input` and encode it as `format` into `output`.
    fn convert(&self, input: &Path, output: &Path, format: ImageFormat) -> Result<()>;

    /// Extract `rect` from `input` into `output`. The output format is taken
    /// from the extension of `output`, falling back to the input's format.
    ///
    /// A rectangle that does not fit inside the image is an
    /// [`OutOfBounds`](crate::error::ErrorKind::OutOfBounds) error.
    fn crop(&self, input: &Path, output: &Path, rect: Rect) -> Result<()>;

    /// Rasterise `overlay` at the size of `input` and alpha-composite it on
    /// top, writing the result into `output`.
    fn composite(&self, input: &Path, output: &Path, overlay: &Overlay) -> Result<()>;
}
