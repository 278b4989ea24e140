//! Engine-wide defaults.

use crate::error::{ErrorKind, Result};
use crate::model::Anchor;
use serde::{Deserialize, Serialize};

pub const DEFAULT_QUALITY: u8 = 80;
/// Maximum number of items of one batch being processed at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;
pub const DEFAULT_WATERMARK_COLOR: &str = "rgba(255,255,255,0.5)";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Compression quality used when a request gives none (or an invalid one).
    pub quality: u8,
    pub max_concurrency: usize,
    pub watermark: WatermarkDefaults,
}
impl Default for Options {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            watermark: WatermarkDefaults::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkDefaults {
    /// Fixed font size in pixels; derived from the image size when unset.
    pub font_size: Option<u32>,
    pub color: String,
    pub angle: f64,
    pub anchor: Anchor,
}
impl Default for WatermarkDefaults {
    fn default() -> Self {
        Self {
            font_size: None,
            color: DEFAULT_WATERMARK_COLOR.to_string(),
            angle: 0.0,
            anchor: Anchor::default(),
        }
    }
}

impl Options {
    /// The quality to compress with: `requested` if it lies within 1-100,
    /// otherwise the configured default.
    pub fn effective_quality(&self, requested: Option<i64>) -> u8 {
        requested
            .filter(|q| (1..=100).contains(q))
            .and_then(|q| u8::try_from(q).ok())
            .unwrap_or(self.quality)
    }

    /// Reject settings that no request could work with.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            exn::bail!(ErrorKind::InvalidParameter(format!("quality must be 1-100, got {}", self.quality)));
        }
        if self.max_concurrency == 0 {
            exn::bail!(ErrorKind::InvalidParameter("max_concurrency must be at least 1".to_string()));
        }
        if self.watermark.color.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidParameter("watermark color must not be empty".to_string()));
        }
        if self.watermark.font_size == Some(0) {
            exn::bail!(ErrorKind::InvalidParameter("watermark font size must be positive".to_string()));
        }
        if !self.watermark.angle.is_finite() {
            exn::bail!(ErrorKind::InvalidParameter("watermark angle must be a finite number".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, 80)]
    #[case(Some(50), 50)]
    #[case(Some(1), 1)]
    #[case(Some(100), 100)]
    #[case(Some(0), 80)]
    #[case(Some(101), 80)]
    #[case(Some(-20), 80)]
    #[case(Some(i64::MAX), 80)]
    fn test_effective_quality(#[case] requested: Option<i64>, #[case] expected: u8) {
        assert_eq!(Options::default().effective_quality(requested), expected);
    }

    #[test]
    fn test_defaults_are_valid() {
        let options = Options::default();
        options.validate().unwrap();
        assert_eq!(options.watermark.anchor, Anchor::BottomRight);
        assert_eq!(options.max_concurrency, 64);
    }

    #[rstest]
    #[case(Options { quality: 0, ..Options::default() })]
    #[case(Options { max_concurrency: 0, ..Options::default() })]
    #[case(Options { watermark: WatermarkDefaults { color: " ".to_string(), ..WatermarkDefaults::default() }, ..Options::default() })]
    #[case(Options { watermark: WatermarkDefaults { angle: f64::NAN, ..WatermarkDefaults::default() }, ..Options::default() })]
    fn test_invalid(#[case] options: Options) {
        let err = options.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidParameter(_)));
    }
}
