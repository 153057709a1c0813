//! Single-page image-to-PDF generation
//!
//! The image is embedded as a DCTDecode (JPEG) XObject and placed on a US
//! Letter page, scaled to fit a fixed box and centered inside it.

use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation as PdfOp};
use lopdf::{dictionary, Document, Object, Stream};

use super::raster::{decode, flatten_alpha};
use super::types::TransformError;

/// US Letter in points
pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

/// Page margin; the fit box is anchored at the top-left margin corner
pub const PAGE_MARGIN: f32 = 72.0;

/// Area the image is fitted into
pub const FIT_WIDTH: f32 = 500.0;
pub const FIT_HEIGHT: f32 = 700.0;

/// Quality of the embedded JPEG
const EMBED_JPEG_QUALITY: u8 = 90;

/// Placement of the image on the page, in PDF user space (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scale `image_width` x `image_height` to fit the fit box, preserving the
/// aspect ratio, and center it inside the box.
pub fn fit_to_page(image_width: u32, image_height: u32) -> Placement {
    let (iw, ih) = (image_width.max(1) as f32, image_height.max(1) as f32);
    let scale = (FIT_WIDTH / iw).min(FIT_HEIGHT / ih);
    let (width, height) = (iw * scale, ih * scale);

    let box_left = PAGE_MARGIN;
    let box_bottom = PAGE_HEIGHT - PAGE_MARGIN - FIT_HEIGHT;

    Placement {
        x: box_left + (FIT_WIDTH - width) / 2.0,
        y: box_bottom + (FIT_HEIGHT - height) / 2.0,
        width,
        height,
    }
}

/// Build a one-page PDF containing the uploaded image
pub fn image_to_pdf(data: &[u8]) -> Result<Vec<u8>, TransformError> {
    let img = decode(data)?;
    let rgb = flatten_alpha(&img);
    let (width, height) = rgb.dimensions();

    let mut jpeg_bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_bytes, EMBED_JPEG_QUALITY).encode_image(&rgb)?;

    let mut image_dict = lopdf::Dictionary::new();
    image_dict.set("Type", Object::Name(b"XObject".to_vec()));
    image_dict.set("Subtype", Object::Name(b"Image".to_vec()));
    image_dict.set("Width", Object::Integer(width as i64));
    image_dict.set("Height", Object::Integer(height as i64));
    image_dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    image_dict.set("BitsPerComponent", Object::Integer(8));
    image_dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    image_dict.set("Length", Object::Integer(jpeg_bytes.len() as i64));

    let placement = fit_to_page(width, height);
    let content = Content {
        operations: vec![
            PdfOp::new("q", vec![]),
            PdfOp::new(
                "cm",
                vec![
                    placement.width.into(),
                    0.into(),
                    0.into(),
                    placement.height.into(),
                    placement.x.into(),
                    placement.y.into(),
                ],
            ),
            PdfOp::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            PdfOp::new("Q", vec![]),
        ],
    };

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(image_dict, jpeg_bytes));
    let content_bytes = content
        .encode()
        .map_err(|e| TransformError::Pdf(format!("Failed to encode page content: {}", e)))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| TransformError::Pdf(format!("Failed to write PDF: {}", e)))?;
    Ok(output)
}
