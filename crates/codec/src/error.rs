//! Codec Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Decoder and encoder messages are carried verbatim so
//! the engine can report them to the user unchanged.

use derive_more::{Display, Error};

/// A codec error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input could not be decoded. Don't retry with the same input.
    #[display("failed to decode image: {_0}")]
    Decode(#[error(not(source))] String),
    /// Output could not be encoded.
    #[display("failed to encode image: {_0}")]
    Encode(#[error(not(source))] String),
    /// The requested format is not supported.
    #[display("unsupported format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// The SVG overlay could not be parsed or rasterised.
    #[display("invalid overlay: {_0}")]
    Overlay(#[error(not(source))] String),
    /// A crop rectangle extends past the edge of the image.
    #[display(
        "crop area {left},{top} {width}x{height} exceeds image bounds {image_width}x{image_height}"
    )]
    OutOfBounds {
        left: u32,
        top: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
    /// An I/O operation failed while reading the input or persisting the output.
    #[display("I/O error: {_0}")]
    Io(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io(_))
    }
}
