// src/services/image_processor.rs
use crate::errors::RedesignError;
use crate::models::NormalizedImage;
use image::{DynamicImage, GenericImageView, ImageFormat as ImgFormat};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Decodes the upload, drops alpha/palette data and caps the longest side
    /// at `max_dimension`. Always re-encodes as PNG.
    pub fn normalize(
        &self,
        data: &[u8],
        max_dimension: u32,
    ) -> Result<NormalizedImage, RedesignError> {
        let img = image::load_from_memory(data)
            .map_err(|e| RedesignError::UnsupportedImageFormat(e.to_string()))?;

        let (width, height) = img.dimensions();
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

        let rgb = match scaled_dimensions(width, height, max_dimension) {
            Some((new_width, new_height)) => {
                log::debug!(
                    "Resizing upload from {}x{} to {}x{}",
                    width,
                    height,
                    new_width,
                    new_height
                );
                rgb.resize_exact(
                    new_width,
                    new_height,
                    image::imageops::FilterType::Lanczos3,
                )
            }
            None => rgb,
        };

        let (width, height) = rgb.dimensions();
        let data = encode_png(&rgb)
            .map_err(|e| RedesignError::Internal(format!("Failed to encode image: {}", e)))?;

        Ok(NormalizedImage {
            data,
            width,
            height,
            mime_type: "image/png",
        })
    }

    /// Decodes arbitrary provider output and re-encodes it as PNG.
    pub fn reencode_png(&self, data: &[u8]) -> Result<Vec<u8>, image::ImageError> {
        let img = image::load_from_memory(data)?;
        encode_png(&img)
    }

    /// MIME type from the magic bytes, for the formats providers accept.
    pub fn sniff_mime(&self, data: &[u8]) -> Option<&'static str> {
        match image::guess_format(data).ok()? {
            ImgFormat::Png => Some("image/png"),
            ImgFormat::Jpeg => Some("image/jpeg"),
            ImgFormat::WebP => Some("image/webp"),
            ImgFormat::Gif => Some("image/gif"),
            ImgFormat::Bmp => Some("image/bmp"),
            ImgFormat::Tiff => Some("image/tiff"),
            _ => None,
        }
    }
}

/// `None` when the image already fits.
fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    if longest <= max_dimension || max_dimension == 0 {
        return None;
    }

    let ratio = max_dimension as f64 / longest as f64;
    let scale = |side: u32| {
        if side == longest {
            max_dimension
        } else {
            ((side as f64 * ratio).round() as u32).max(1)
        }
    };

    Some((scale(width), scale(height)))
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), ImgFormat::Png)?;
    Ok(output)
}
