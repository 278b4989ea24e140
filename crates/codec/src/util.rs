use crate::ImageFormat;
use std::fmt::{Display, Formatter, Result as FmtResult};

impl Display for ImageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl ImageFormat {
    /// Returns the canonical file extension for this format (without the dot).
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Webp => "webp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Avif => "avif",
        }
    }

    /// Returns the short name for displaying to the user.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Webp => "webp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Avif => "avif",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ImageFormat;
    use rstest::rstest;

    #[rstest]
    #[case(ImageFormat::Jpeg, "jpg")]
    #[case(ImageFormat::Png, "png")]
    #[case(ImageFormat::Tiff, "tiff")]
    fn test_extension_parses_back(#[case] format: ImageFormat, #[case] extension: &str) {
        assert_eq!(format.extension(), extension);
        assert_eq!(format.extension().parse::<ImageFormat>().unwrap(), format);
    }

    #[test]
    fn test_display() {
        assert_eq!(ImageFormat::Jpeg.to_string(), "jpeg");
        assert_eq!(ImageFormat::Webp.to_string(), "webp");
    }
}
