//! Multipart form handling shared by the tool endpoints

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::{AppError, Result};
use crate::transform::{
    DEFAULT_COMPRESS_QUALITY, MAX_COMPRESS_QUALITY, MAX_DIMENSION, MIN_COMPRESS_QUALITY,
};

/// Name of the multipart field carrying the upload
pub const IMAGE_FIELD: &str = "image";

/// A parsed tool form: the uploaded image plus any text fields
#[derive(Debug, Default)]
pub struct ImageForm {
    image: Option<Bytes>,
    fields: HashMap<String, String>,
}

impl ImageForm {
    /// Drain a multipart body into memory
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = ImageForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();

            if name == IMAGE_FIELD {
                let data = field.bytes().await?;
                tracing::debug!(
                    bytes = data.len(),
                    "Received image upload"
                );
                if !data.is_empty() {
                    form.image = Some(data);
                }
            } else if !name.is_empty() {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// A text field, trimmed; blank values count as absent
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Take the uploaded image, failing with 400 when none was sent
    pub fn take_image(&mut self) -> Result<Bytes> {
        self.image
            .take()
            .ok_or_else(|| AppError::bad_request("No file uploaded"))
    }

    /// JPEG quality for `/compress`: defaults when absent, clamped into range
    pub fn quality(&self) -> Result<u8> {
        match self.field("quality") {
            None => Ok(DEFAULT_COMPRESS_QUALITY),
            Some(raw) => {
                let quality: i64 = raw
                    .parse()
                    .map_err(|_| AppError::bad_request("Quality must be an integer"))?;
                Ok(quality.clamp(MIN_COMPRESS_QUALITY as i64, MAX_COMPRESS_QUALITY as i64) as u8)
            }
        }
    }

    /// Target dimensions for `/resize`
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        let (Some(width), Some(height)) = (self.field("width"), self.field("height")) else {
            return Err(AppError::bad_request("Width and height are required"));
        };

        Ok((parse_dimension(width)?, parse_dimension(height)?))
    }
}

fn parse_dimension(raw: &str) -> Result<u32> {
    let value: u32 = raw
        .parse()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| AppError::bad_request("Width and height must be positive integers"))?;

    if value > MAX_DIMENSION {
        return Err(AppError::bad_request(format!(
            "Width and height must not exceed {}",
            MAX_DIMENSION
        )));
    }

    Ok(value)
}
