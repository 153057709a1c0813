//! Transform types shared by the raster and PDF pipelines

use std::fmt;
use std::str::FromStr;

// ============================================================================
// Constants
// ============================================================================

/// Default JPEG quality for `/compress`
pub const DEFAULT_COMPRESS_QUALITY: u8 = 50;

/// Accepted JPEG quality range for `/compress`
pub const MIN_COMPRESS_QUALITY: u8 = 10;
pub const MAX_COMPRESS_QUALITY: u8 = 90;

/// Quality used when `/convert` targets JPEG
pub const CONVERT_JPEG_QUALITY: u8 = 80;

/// Largest width or height accepted by `/resize`
pub const MAX_DIMENSION: u32 = 10_000;

// ============================================================================
// Operation
// ============================================================================

/// The operations the server exposes. Each one produces a single artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Convert,
    Compress,
    ToPdf,
    Resize,
}

impl Operation {
    /// Prefix used for artifact file names
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Operation::Convert => "converted",
            Operation::Compress => "compressed",
            Operation::ToPdf => "doc",
            Operation::Resize => "resized",
        }
    }

    /// Client-facing message when the operation fails server-side
    pub fn failure_message(&self) -> &'static str {
        match self {
            Operation::Convert => "Conversion Failed",
            Operation::Compress => "Compression Failed",
            Operation::ToPdf => "PDF Generation Failed",
            Operation::Resize => "Resize Failed",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Convert => "convert",
            Operation::Compress => "compress",
            Operation::ToPdf => "to-pdf",
            Operation::Resize => "resize",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Output Format
// ============================================================================

/// Raster formats `/convert` can produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Webp => image::ImageFormat::WebP,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(TransformError::UnsupportedFormat(other.to_string())),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Transform timed out after {0}s")]
    TimedOut(u64),

    #[error("Transform worker failed: {0}")]
    Worker(String),
}
