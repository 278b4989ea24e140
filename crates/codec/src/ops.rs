//! Codec Operations backed by the `image` crate.

use crate::error::{ErrorKind, Result};
use crate::{Codec, Dimensions, ImageFormat, Overlay, Rect};
use exn::OptionExt;
use image::codecs::avif::AvifEncoder;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, GenericImageView, ImageReader, imageops};
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::instrument;

/// Quality used when an operation re-encodes without an explicit setting
/// (crop, composite, convert).
const DEFAULT_QUALITY: u8 = 90;
/// rav1e speed preset: 1 is slowest/best, 10 is fastest.
const AVIF_SPEED: u8 = 6;
/// PNG quality at or above which encoding favours speed over size.
const PNG_FAST_THRESHOLD: u8 = 90;

/// Default [`Codec`] implementation.
///
/// Stateless; cheap to clone and share behind a
/// [`CodecHandle`](crate::CodecHandle).
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }

    /// Decode an image, sniffing the format from its content and falling back
    /// to the file extension when the content is ambiguous.
    fn open(path: &Path) -> Result<DynamicImage> {
        let mut reader = ImageReader::open(path)
            .map_err(|e| ErrorKind::Io(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| ErrorKind::Io(e.to_string()))?;
        if reader.format().is_none()
            && let Some(format) = ImageFormat::from_path(path)
        {
            reader.set_format(format.to_image_format());
        }
        Ok(reader.decode().map_err(|e| ErrorKind::Decode(e.to_string()))?)
    }

    fn output_format(input: &Path, output: &Path) -> Result<ImageFormat> {
        ImageFormat::from_path(output)
            .or_else(|| ImageFormat::from_path(input))
            .ok_or_raise(|| ErrorKind::UnsupportedFormat(output.display().to_string()))
    }

    /// Encode into a temporary file beside `output`, then move it into place.
    ///
    /// The temporary file is removed on drop if anything fails, so a failed
    /// save never leaves a partial file at `output`.
    fn save(image: &DynamicImage, output: &Path, format: ImageFormat, quality: u8) -> Result<()> {
        let directory = output.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let mut temporary = NamedTempFile::new_in(directory).map_err(|e| ErrorKind::Io(e.to_string()))?;
        {
            let mut writer = BufWriter::new(temporary.as_file_mut());
            encode(image, &mut writer, format, quality)?;
            writer.flush().map_err(|e| ErrorKind::Io(e.to_string()))?;
        }
        temporary.persist(output).map_err(|e| ErrorKind::Io(e.error.to_string()))?;
        Ok(())
    }
}

/// Encode `image` as `format` into `writer`.
///
/// Formats without an alpha channel (JPEG) are flattened to RGB first; the
/// remaining encoders receive 8-bit RGBA so that 16-bit and grayscale
/// sources don't trip over per-encoder colour type restrictions.
fn encode<W: Write + Seek>(image: &DynamicImage, writer: &mut W, format: ImageFormat, quality: u8) -> Result<()> {
    let quality = quality.clamp(1, 100);
    let encoded = match format {
        ImageFormat::Jpeg => {
            let flattened = DynamicImage::ImageRgb8(image.to_rgb8());
            flattened.write_with_encoder(JpegEncoder::new_with_quality(writer, quality))
        },
        ImageFormat::Png => {
            let compression = match quality >= PNG_FAST_THRESHOLD {
                true => CompressionType::Fast,
                false => CompressionType::Best,
            };
            image.write_with_encoder(PngEncoder::new_with_quality(writer, compression, FilterType::Adaptive))
        },
        ImageFormat::Bmp => DynamicImage::ImageRgba8(image.to_rgba8()).write_with_encoder(BmpEncoder::new(writer)),
        ImageFormat::Webp => {
            DynamicImage::ImageRgba8(image.to_rgba8()).write_with_encoder(WebPEncoder::new_lossless(writer))
        },
        ImageFormat::Tiff => DynamicImage::ImageRgba8(image.to_rgba8()).write_with_encoder(TiffEncoder::new(writer)),
        ImageFormat::Avif => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_with_encoder(AvifEncoder::new_with_speed_quality(writer, AVIF_SPEED, quality)),
    };
    encoded.map_err(|e| ErrorKind::Encode(format!("{format}: {e}")))?;
    Ok(())
}

impl Codec for ImageCodec {
    #[instrument(skip(self), fields(path = %path.display()))]
    fn metadata(&self, path: &Path) -> Result<Dimensions> {
        let (width, height) = image::image_dimensions(path).map_err(|e| ErrorKind::Decode(e.to_string()))?;
        Ok(Dimensions::new(width, height))
    }

    #[instrument(skip(self), fields(input = %input.display(), output = %output.display()))]
    fn reencode(&self, input: &Path, output: &Path, format: ImageFormat, quality: u8) -> Result<()> {
        let image = Self::open(input)?;
        Self::save(&image, output, format, quality)
    }

    #[instrument(skip(self), fields(input = %input.display(), output = %output.display()))]
    fn convert(&self, input: &Path, output: &Path, format: ImageFormat) -> Result<()> {
        let image = Self::open(input)?;
        Self::save(&image, output, format, DEFAULT_QUALITY)
    }

    #[instrument(skip(self), fields(input = %input.display(), output = %output.display()))]
    fn crop(&self, input: &Path, output: &Path, rect: Rect) -> Result<()> {
        let format = Self::output_format(input, output)?;
        let image = Self::open(input)?;
        let (image_width, image_height) = image.dimensions();
        if !rect.fits_within(Dimensions::new(image_width, image_height)) {
            exn::bail!(ErrorKind::OutOfBounds {
                left: rect.left,
                top: rect.top,
                width: rect.width,
                height: rect.height,
                image_width,
                image_height,
            });
        }
        let cropped = image.crop_imm(rect.left, rect.top, rect.width, rect.height);
        Self::save(&cropped, output, format, DEFAULT_QUALITY)
    }

    #[instrument(skip(self, overlay), fields(input = %input.display(), output = %output.display()))]
    fn composite(&self, input: &Path, output: &Path, overlay: &Overlay) -> Result<()> {
        let format = Self::output_format(input, output)?;
        let image = Self::open(input)?;
        let (width, height) = image.dimensions();
        let layer = overlay.rasterise(width, height)?;
        let mut base = image.to_rgba8();
        imageops::overlay(&mut base, &layer, 0, 0);
        Self::save(&DynamicImage::ImageRgba8(base), output, format, DEFAULT_QUALITY)
    }
}
