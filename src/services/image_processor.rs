// src/services/image_processor.rs
use crate::errors::PredictorError;
use base64::{Engine as _, engine::general_purpose};
use image::{GenericImageView, ImageFormat as ImgFormat};

/// Validates and downscales uploaded parent photos before they are sent to
/// the vision provider.
pub struct ImageProcessor {
    max_dimension: u32,
    max_payload_bytes: usize,
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self {
            max_dimension: 2048,
            // Vision payload budget: base64 inflates size by ~33%, so keep
            // the raw image under ~3.75MB to stay below a 5MB request cap.
            max_payload_bytes: 3_750_000,
        }
    }
}

impl ImageProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a base64 photo (with or without a `data:` URL prefix),
    /// verifies it decodes to a real image, downscales it when oversized,
    /// and returns clean base64 JPEG ready for the vision call.
    pub fn prepare_base64(&self, input: &str) -> Result<String, PredictorError> {
        let stripped = strip_data_url_prefix(input.trim());

        let raw = general_purpose::STANDARD
            .decode(stripped)
            .map_err(|e| PredictorError::Validation(format!("invalid base64 image: {}", e)))?;

        let img = image::load_from_memory(&raw)
            .map_err(|e| PredictorError::Validation(format!("not a valid image: {}", e)))?;

        let (width, height) = img.dimensions();
        let needs_resize = width > self.max_dimension
            || height > self.max_dimension
            || raw.len() > self.max_payload_bytes;

        if !needs_resize {
            return Ok(general_purpose::STANDARD.encode(&raw));
        }

        let dimension_ratio =
            (self.max_dimension as f32 / width.max(height) as f32).min(1.0);
        let payload_ratio = if raw.len() > self.max_payload_bytes {
            ((self.max_payload_bytes as f64 / raw.len() as f64).sqrt() * 0.9) as f32
        } else {
            1.0
        };
        let ratio = dimension_ratio.min(payload_ratio);

        let new_width = ((width as f32 * ratio) as u32).max(256);
        let new_height = ((height as f32 * ratio) as u32).max(256);

        let resized = img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);

        let mut output = Vec::new();
        resized
            .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Jpeg)
            .map_err(|e| {
                PredictorError::Validation(format!("failed to encode resized image: {}", e))
            })?;

        Ok(general_purpose::STANDARD.encode(&output))
    }
}

fn strip_data_url_prefix(input: &str) -> &str {
    match input.split_once("base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn png_base64(width: u32, height: u32) -> String {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 90, 60]),
        ));
        let mut buffer = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buffer), ImgFormat::Png)
            .unwrap();
        general_purpose::STANDARD.encode(&buffer)
    }

    #[test]
    fn accepts_a_plain_base64_image() {
        let processor = ImageProcessor::new();
        assert!(processor.prepare_base64(&png_base64(64, 64)).is_ok());
    }

    #[test]
    fn strips_a_data_url_prefix() {
        let processor = ImageProcessor::new();
        let with_prefix = format!("data:image/png;base64,{}", png_base64(32, 32));
        assert!(processor.prepare_base64(&with_prefix).is_ok());
    }

    #[test]
    fn rejects_non_base64_input() {
        let processor = ImageProcessor::new();
        let err = processor.prepare_base64("!!not-base64!!").unwrap_err();
        assert!(matches!(err, PredictorError::Validation(_)));
    }

    #[test]
    fn rejects_base64_that_is_not_an_image() {
        let processor = ImageProcessor::new();
        let garbage = general_purpose::STANDARD.encode(b"hello world");
        let err = processor.prepare_base64(&garbage).unwrap_err();
        assert!(matches!(err, PredictorError::Validation(_)));
    }

    #[test]
    fn oversized_images_are_downscaled() {
        let processor = ImageProcessor {
            max_dimension: 100,
            max_payload_bytes: 3_750_000,
        };
        let prepared = processor.prepare_base64(&png_base64(400, 200)).unwrap();
        let decoded = general_purpose::STANDARD.decode(prepared).unwrap();
        let img = image::load_from_memory(&decoded).unwrap();
        assert!(img.dimensions().0 <= 256);
    }
}
