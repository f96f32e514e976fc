//! Core types shared between the pipeline and segmentation backends

use crate::error::{ProcessingError, Result};
use crate::utils::ContainFit;
use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};
use ndarray::Array4;

/// Foreground mask aligned with an image, one byte per pixel (255 = subject)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Mask data as grayscale values (0-255), row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a new segmentation mask
    ///
    /// # Errors
    /// - `data` length does not match `dimensions`
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let expected = dimensions.0 as usize * dimensions.1 as usize;
        if data.len() != expected {
            return Err(ProcessingError::segmentation(format!(
                "Mask has {} values, expected {} for {}x{}",
                data.len(),
                expected,
                dimensions.0,
                dimensions.1
            )));
        }
        Ok(Self { data, dimensions })
    }

    /// Map a `[1, 1, S, S]` model output back onto an image of `original_dimensions`
    ///
    /// The model input was a contain-fit of the original centered on an S×S
    /// canvas; this inverts that placement. Values are clamped to 0..1.
    ///
    /// # Errors
    /// - Tensor is not a single-batch, single-channel mask
    pub fn from_tensor(tensor: &Array4<f32>, original_dimensions: (u32, u32)) -> Result<Self> {
        let shape = tensor.shape();
        let (batch, channels, mask_height, mask_width) = match shape {
            [b, c, h, w] => (*b, *c, *h, *w),
            _ => return Err(ProcessingError::segmentation("Invalid output tensor shape")),
        };
        if batch != 1 || channels != 1 || mask_width == 0 || mask_height == 0 {
            return Err(ProcessingError::segmentation(format!(
                "Expected a [1, 1, H, W] mask tensor, got {:?}",
                shape
            )));
        }

        let (orig_width, orig_height) = original_dimensions;
        let fit = ContainFit::compute(original_dimensions, (mask_width as u32, mask_height as u32));
        let mut data = Vec::with_capacity(orig_width as usize * orig_height as usize);

        for y in 0..orig_height {
            for x in 0..orig_width {
                let tensor_x = (f64::from(x) * fit.scale).round() as usize + fit.offset_x as usize;
                let tensor_y = (f64::from(y) * fit.scale).round() as usize + fit.offset_y as usize;
                let value = tensor
                    .get([0, 0, tensor_y.min(mask_height - 1), tensor_x.min(mask_width - 1)])
                    .copied()
                    .unwrap_or(0.0);
                data.push((value.clamp(0.0, 1.0) * 255.0).round() as u8);
            }
        }

        Self::new(data, original_dimensions)
    }

    /// Attach the mask to `image` as its alpha channel
    ///
    /// # Errors
    /// - Mask and image dimensions differ
    pub fn apply_as_alpha(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let rgb = image.to_rgb8();
        if rgb.dimensions() != self.dimensions {
            return Err(ProcessingError::segmentation(format!(
                "Mask is {}x{} but image is {}x{}",
                self.dimensions.0,
                self.dimensions.1,
                rgb.width(),
                rgb.height()
            )));
        }

        let width = rgb.width() as usize;
        Ok(ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
            let pixel = rgb.get_pixel(x, y);
            let alpha = self
                .data
                .get(y as usize * width + x as usize)
                .copied()
                .unwrap_or(0);
            Rgba([pixel.0[0], pixel.0[1], pixel.0[2], alpha])
        }))
    }

    /// Fraction of pixels considered foreground (alpha >= 128)
    #[must_use]
    pub fn foreground_ratio(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let foreground = self.data.iter().filter(|&&value| value >= 128).count();
        foreground as f32 / self.data.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_new_checks_length() {
        assert!(SegmentationMask::new(vec![0; 6], (3, 2)).is_ok());
        assert!(SegmentationMask::new(vec![0; 5], (3, 2)).is_err());
    }

    #[test]
    fn test_from_tensor_maps_letterboxed_region() {
        // 8x8 model output: top half foreground. Original is 8x4, so it
        // occupies rows 2..6 of the model canvas.
        let mut tensor = Array4::<f32>::zeros((1, 1, 8, 8));
        for y in 0..4 {
            for x in 0..8 {
                tensor[[0, 0, y, x]] = 1.0;
            }
        }

        let mask = SegmentationMask::from_tensor(&tensor, (8, 4)).unwrap();
        assert_eq!(mask.dimensions, (8, 4));
        assert_eq!(mask.data[0], 255); // original row 0 -> canvas row 2
        assert_eq!(mask.data[8 * 3], 0); // original row 3 -> canvas row 5
    }

    #[test]
    fn test_from_tensor_rejects_multichannel() {
        let tensor = Array4::<f32>::zeros((1, 3, 8, 8));
        assert!(SegmentationMask::from_tensor(&tensor, (8, 8)).is_err());
    }

    #[test]
    fn test_apply_as_alpha() {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(2, 1, Rgb([10, 20, 30])));
        let mask = SegmentationMask::new(vec![255, 0], (2, 1)).unwrap();
        let rgba = mask.apply_as_alpha(&image).unwrap();
        assert_eq!(*rgba.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
        assert_eq!(*rgba.get_pixel(1, 0), Rgba([10, 20, 30, 0]));
        assert!((mask.foreground_ratio() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_apply_as_alpha_dimension_mismatch() {
        let image = DynamicImage::new_rgb8(3, 3);
        let mask = SegmentationMask::new(vec![0; 4], (2, 2)).unwrap();
        assert!(mask.apply_as_alpha(&image).is_err());
    }
}
