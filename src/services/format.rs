//! Output encoding service
//!
//! Serializes processed images into the configured output format.

use crate::{
    config::OutputFormat,
    error::{ProcessingError, Result},
};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Service for turning processed images into file bytes
pub struct OutputEncoder;

impl OutputEncoder {
    /// Encode `image` as `format`
    ///
    /// JPEG is written from an RGB copy at the given `quality` (1-100). The
    /// other formats are lossless and ignore `quality`.
    ///
    /// # Examples
    /// ```rust
    /// use product_image_processor::{services::OutputEncoder, OutputFormat};
    /// use image::DynamicImage;
    ///
    /// let bytes = OutputEncoder::encode(&DynamicImage::new_rgb8(4, 4), OutputFormat::Png, 95)?;
    /// assert!(bytes.starts_with(b"\x89PNG"));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    ///
    /// # Errors
    /// - Codec rejects the image (unsupported color type, encoder failure)
    pub fn encode(image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());

        match format {
            OutputFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
                DynamicImage::ImageRgb8(image.to_rgb8())
                    .write_with_encoder(encoder)
                    .map_err(|e| encode_error(format, &e))?;
            },
            OutputFormat::Png | OutputFormat::WebP | OutputFormat::Tiff | OutputFormat::Bmp => {
                image
                    .write_to(&mut buffer, Self::image_format(format))
                    .map_err(|e| encode_error(format, &e))?;
            },
        }

        Ok(buffer.into_inner())
    }

    /// Map to the `image` crate's format identifier
    #[must_use]
    pub fn image_format(format: OutputFormat) -> ImageFormat {
        match format {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::WebP => ImageFormat::WebP,
            OutputFormat::Tiff => ImageFormat::Tiff,
            OutputFormat::Bmp => ImageFormat::Bmp,
        }
    }
}

fn encode_error(format: OutputFormat, error: &image::ImageError) -> ProcessingError {
    ProcessingError::encode(format!("Failed to encode {format}: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> RgbImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 8) as u8, (y * 8) as u8, ((x + y) * 4) as u8])
        })
    }

    #[test]
    fn test_png_round_trip_is_exact() {
        let original = gradient(24, 16);
        let bytes =
            OutputEncoder::encode(&DynamicImage::ImageRgb8(original.clone()), OutputFormat::Png, 95)
                .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_jpeg_max_quality_error_is_bounded() {
        let original = gradient(32, 32);
        let bytes = OutputEncoder::encode(
            &DynamicImage::ImageRgb8(original.clone()),
            OutputFormat::Jpeg,
            100,
        )
        .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();

        assert_eq!(decoded.dimensions(), original.dimensions());
        let max_diff = decoded
            .pixels()
            .zip(original.pixels())
            .flat_map(|(a, b)| a.0.iter().zip(b.0).map(|(x, y)| x.abs_diff(y)).collect::<Vec<_>>())
            .max()
            .unwrap();
        assert!(max_diff <= 32, "max channel difference {max_diff}");
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let rgba = DynamicImage::new_rgba8(8, 8);
        let bytes = OutputEncoder::encode(&rgba, OutputFormat::Jpeg, 80).unwrap();
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_lossless_formats_identify_correctly() {
        let image = DynamicImage::ImageRgb8(gradient(8, 8));
        for format in [OutputFormat::Png, OutputFormat::WebP, OutputFormat::Tiff, OutputFormat::Bmp] {
            let bytes = OutputEncoder::encode(&image, format, 50).unwrap();
            assert_eq!(
                image::guess_format(&bytes).unwrap(),
                OutputEncoder::image_format(format),
                "{format}"
            );
        }
    }
}
