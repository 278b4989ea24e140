//! SVG overlays rasterised with `resvg`.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use image::{Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};
use std::sync::{Arc, LazyLock};

/// System fonts are loaded once per process; scanning font directories is
/// far more expensive than rendering a line of text.
static FONTS: LazyLock<Arc<usvg::fontdb::Database>> = LazyLock::new(|| {
    let mut database = usvg::fontdb::Database::new();
    database.load_system_fonts();
    tracing::debug!(faces = database.len(), "Loaded system fonts for overlays");
    Arc::new(database)
});

/// An overlay description: an SVG document sized to the target image.
///
/// Callers are responsible for escaping any user-provided text before
/// embedding it in the markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overlay {
    svg: String,
}
impl Overlay {
    pub fn svg(markup: impl Into<String>) -> Self {
        Self { svg: markup.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.svg
    }

    /// Render the overlay into a transparent RGBA layer of the given size.
    ///
    /// Text renders with whatever fonts are installed; on a system with no
    /// fonts the layer is simply empty.
    pub(crate) fn rasterise(&self, width: u32, height: u32) -> Result<RgbaImage> {
        let options = usvg::Options { fontdb: Arc::clone(&FONTS), ..usvg::Options::default() };
        let tree = usvg::Tree::from_str(&self.svg, &options).map_err(|e| ErrorKind::Overlay(e.to_string()))?;
        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_raise(|| ErrorKind::Overlay(format!("cannot allocate a {width}x{height} layer")))?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        let mut layer = RgbaImage::new(width, height);
        for (pixel, source) in layer.pixels_mut().zip(pixmap.pixels()) {
            // tiny-skia stores premultiplied alpha; `image` expects straight alpha.
            let color = source.demultiply();
            *pixel = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
        }
        Ok(layer)
    }
}
