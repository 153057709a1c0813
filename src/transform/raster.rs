//! Raster transforms backed by the `image` crate
//!
//! All functions are synchronous and CPU-bound; callers run them on the
//! blocking pool (see [`super::run_blocking`]).

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use super::types::{
    OutputFormat, TransformError, CONVERT_JPEG_QUALITY, MAX_COMPRESS_QUALITY,
    MIN_COMPRESS_QUALITY,
};

/// Decode an uploaded buffer, whatever its format
pub fn decode(data: &[u8]) -> Result<DynamicImage, TransformError> {
    Ok(image::load_from_memory(data)?)
}

/// Transcode an image into `format`
pub fn convert(data: &[u8], format: OutputFormat) -> Result<Vec<u8>, TransformError> {
    let img = decode(data)?;
    encode(&img, format)
}

/// Re-encode an image as JPEG at `quality` (clamped to the accepted range)
pub fn compress(data: &[u8], quality: u8) -> Result<Vec<u8>, TransformError> {
    let img = decode(data)?;
    encode_jpeg(&img, clamp_quality(quality))
}

/// Resize to exactly `width` x `height` and encode as PNG.
///
/// The aspect ratio is not preserved; the image is stretched to fill.
pub fn resize(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, TransformError> {
    let img = decode(data)?;
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);
    encode(&resized, OutputFormat::Png)
}

pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_COMPRESS_QUALITY, MAX_COMPRESS_QUALITY)
}

pub(crate) fn encode(img: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, TransformError> {
    match format {
        OutputFormat::Jpeg => encode_jpeg(img, CONVERT_JPEG_QUALITY),
        // The WebP encoder only takes 8-bit RGB(A)
        OutputFormat::Webp => write_image(
            &DynamicImage::ImageRgba8(img.to_rgba8()),
            format.image_format(),
        ),
        OutputFormat::Png => write_image(img, format.image_format()),
    }
}

pub(crate) fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    let rgb = flatten_alpha(img);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;
    Ok(out)
}

/// Composite any alpha channel over white. JPEG has no alpha, and dropping
/// it outright turns transparent regions black.
pub(crate) fn flatten_alpha(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

fn write_image(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, TransformError> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, format)?;
    Ok(cursor.into_inner())
}
