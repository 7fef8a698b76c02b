// src/services/image_processor.rs
use crate::errors::UxLensError;
use crate::models::{PreparedImage, Screenshot};
use crate::services::llm_service::Provider;
use image::{DynamicImage, GenericImageView, ImageFormat as ImgFormat};
use log::debug;
use std::io::Cursor;

// Anthropic has a 5MB limit for base64 encoded images.
// Base64 encoding increases size by ~33%, so we need to keep raw image under ~3.75MB
const ANTHROPIC_MAX_BYTES: usize = 3_750_000;
const MIN_SIDE: u32 = 256;

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Reads width and height from the image header without decoding pixels.
    pub fn dimensions(&self, data: &[u8]) -> Result<(u32, u32), UxLensError> {
        image::io::Reader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| UxLensError::ImageProcessing(format!("Failed to read image: {}", e)))?
            .into_dimensions()
            .map_err(|e| UxLensError::ImageProcessing(format!("Invalid image: {}", e)))
    }

    pub fn prepare_for(
        &self,
        provider: Provider,
        screenshot: &Screenshot,
    ) -> Result<PreparedImage, UxLensError> {
        let (width, height) = self.dimensions(&screenshot.data)?;

        match provider {
            Provider::Anthropic if screenshot.data.len() > ANTHROPIC_MAX_BYTES => {
                self.shrink_to_fit(&screenshot.data, ANTHROPIC_MAX_BYTES)
            }
            _ => Ok(PreparedImage {
                media_type: screenshot.media_type.clone(),
                data: screenshot.data.clone(),
                width,
                height,
            }),
        }
    }

    fn shrink_to_fit(&self, data: &[u8], max_bytes: usize) -> Result<PreparedImage, UxLensError> {
        let img = image::load_from_memory(data)
            .map_err(|e| UxLensError::ImageProcessing(format!("Failed to load image: {}", e)))?;

        let (width, height) = img.dimensions();

        // Calculate scale factor to reduce file size
        let scale_factor = ((max_bytes as f64 / data.len() as f64).sqrt() * 0.9) as f32;
        let new_width = ((width as f32 * scale_factor) as u32).max(MIN_SIDE);
        let new_height = ((height as f32 * scale_factor) as u32).max(MIN_SIDE);

        let resized = img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);
        let resized = DynamicImage::ImageRgb8(resized.to_rgb8());

        let mut output = Vec::new();
        resized
            .write_to(&mut Cursor::new(&mut output), ImgFormat::Jpeg)
            .map_err(|e| {
                UxLensError::ImageProcessing(format!("Failed to encode resized image: {}", e))
            })?;

        let (out_width, out_height) = resized.dimensions();
        debug!(
            "Downscaled {}x{} ({} bytes) to {}x{} ({} bytes)",
            width,
            height,
            data.len(),
            out_width,
            out_height,
            output.len()
        );

        Ok(PreparedImage {
            media_type: "image/jpeg".to_string(),
            data: output,
            width: out_width,
            height: out_height,
        })
    }
}
