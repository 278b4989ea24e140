//! In-process codec for testing.

use crate::error::{ErrorKind, Result};
use crate::{Codec, Dimensions, ImageFormat, Overlay, Rect};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bytes written to every output so that later runs observe it on disk.
pub const MOCK_OUTPUT: &[u8] = b"mock";

/// Codec that never decodes anything.
///
/// Every input reports the same configurable [`Dimensions`]. Writes place
/// [`MOCK_OUTPUT`] at the output path, so naming and collision logic can be
/// tested against a real directory without generating images. Inputs can be
/// marked as failing by file name to exercise per-item error reporting.
///
/// # Examples
///
/// ```
/// use shears_codec::{Dimensions, MockCodec};
///
/// let codec = MockCodec::new(Dimensions::new(800, 600)).failing_on("broken.jpg");
/// assert_eq!(codec.calls(), 0);
/// ```
#[derive(Debug)]
pub struct MockCodec {
    dimensions: Dimensions,
    failing: HashSet<String>,
    calls: AtomicUsize,
    qualities: Mutex<Vec<u8>>,
    overlays: Mutex<Vec<String>>,
}

impl Default for MockCodec {
    fn default() -> Self {
        Self::new(Dimensions::new(1000, 1000))
    }
}

impl MockCodec {
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
            qualities: Mutex::new(Vec::new()),
            overlays: Mutex::new(Vec::new()),
        }
    }

    /// Make every call whose input file is named `name` fail with a decode
    /// error.
    #[must_use]
    pub fn failing_on(mut self, name: impl Into<String>) -> Self {
        self.failing.insert(name.into());
        self
    }

    /// Number of codec calls made so far, across all methods.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every quality passed to [`Codec::reencode`], in call order.
    pub fn qualities(&self) -> Vec<u8> {
        self.qualities.lock().map(|q| q.clone()).unwrap_or_default()
    }

    /// The SVG markup of every overlay passed to [`Codec::composite`], in
    /// call order.
    pub fn overlays(&self) -> Vec<String> {
        self.overlays.lock().map(|o| o.clone()).unwrap_or_default()
    }

    fn enter(&self, input: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if self.failing.contains(&name) {
            exn::bail!(ErrorKind::Decode(format!("mock failure for {name}")));
        }
        Ok(())
    }

    fn write(output: &Path) -> Result<()> {
        std::fs::write(output, MOCK_OUTPUT).map_err(|e| ErrorKind::Io(e.to_string()))?;
        Ok(())
    }
}

impl Codec for MockCodec {
    fn metadata(&self, path: &Path) -> Result<Dimensions> {
        self.enter(path)?;
        Ok(self.dimensions)
    }

    fn reencode(&self, input: &Path, output: &Path, _format: ImageFormat, quality: u8) -> Result<()> {
        self.enter(input)?;
        if let Ok(mut qualities) = self.qualities.lock() {
            qualities.push(quality);
        }
        Self::write(output)
    }

    fn convert(&self, input: &Path, output: &Path, _format: ImageFormat) -> Result<()> {
        self.enter(input)?;
        Self::write(output)
    }

    fn crop(&self, input: &Path, output: &Path, rect: Rect) -> Result<()> {
        self.enter(input)?;
        if !rect.fits_within(self.dimensions) {
            exn::bail!(ErrorKind::OutOfBounds {
                left: rect.left,
                top: rect.top,
                width: rect.width,
                height: rect.height,
                image_width: self.dimensions.width,
                image_height: self.dimensions.height,
            });
        }
        Self::write(output)
    }

    fn composite(&self, input: &Path, output: &Path, overlay: &Overlay) -> Result<()> {
        self.enter(input)?;
        if let Ok(mut overlays) = self.overlays.lock() {
            overlays.push(overlay.as_str().to_string());
        }
        Self::write(output)
    }
}
