//! Shared geometry and tensor preprocessing utilities
//!
//! Contain-fit placement backs both the pipeline's resize stage (shrink only,
//! like a thumbnail) and the segmentation model's input preparation (scales
//! either way).

use crate::{
    config::{BackgroundColor, SegmentationConfig},
    error::{ProcessingError, Result},
};
use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, RgbImage};
use ndarray::Array4;

/// Model input preparation settings
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Square edge length of the model input
    pub target_size: u32,
    pub normalization_mean: [f32; 3],
    pub normalization_std: [f32; 3],
}

impl From<&SegmentationConfig> for PreprocessingConfig {
    fn from(config: &SegmentationConfig) -> Self {
        Self {
            target_size: config.input_size,
            normalization_mean: config.normalization_mean,
            normalization_std: config.normalization_std,
        }
    }
}

/// Scale factor and placement of a contain-fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainFit {
    pub scale: f64,
    pub width: u32,
    pub height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl ContainFit {
    /// Fit `source` inside `target` preserving aspect ratio, centered
    ///
    /// Small sources are scaled up to touch the target edges.
    #[must_use]
    pub fn compute(source: (u32, u32), target: (u32, u32)) -> Self {
        Self::with_max_scale(source, target, f64::INFINITY)
    }

    /// Like [`Self::compute`] but never enlarges `source`
    #[must_use]
    pub fn compute_shrink_only(source: (u32, u32), target: (u32, u32)) -> Self {
        Self::with_max_scale(source, target, 1.0)
    }

    // Offsets round up: an odd pixel of padding lands on the left/top edge
    fn with_max_scale(source: (u32, u32), target: (u32, u32), max_scale: f64) -> Self {
        let (src_w, src_h) = (f64::from(source.0.max(1)), f64::from(source.1.max(1)));
        let (dst_w, dst_h) = target;
        let scale = (f64::from(dst_w) / src_w)
            .min(f64::from(dst_h) / src_h)
            .min(max_scale);

        let width = ((src_w * scale).round() as u32).clamp(1, dst_w.max(1));
        let height = ((src_h * scale).round() as u32).clamp(1, dst_h.max(1));

        Self {
            scale,
            width,
            height,
            offset_x: dst_w.saturating_sub(width).div_ceil(2),
            offset_y: dst_h.saturating_sub(height).div_ceil(2),
        }
    }
}

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Scale `image` to fit inside `width`x`height` and center it on a canvas
    /// of exactly that size filled with `fill`
    #[must_use]
    pub fn letterbox(
        image: &RgbImage,
        width: u32,
        height: u32,
        fill: BackgroundColor,
        filter: FilterType,
    ) -> RgbImage {
        let fit = ContainFit::compute(image.dimensions(), (width, height));
        Self::place(image, fit, width, height, fill, filter)
    }

    /// Shrink `image` (never enlarge) to fit inside `width`x`height` and
    /// center it on a `fill` canvas of exactly that size
    #[must_use]
    pub fn contain(
        image: &RgbImage,
        width: u32,
        height: u32,
        fill: BackgroundColor,
        filter: FilterType,
    ) -> RgbImage {
        let fit = ContainFit::compute_shrink_only(image.dimensions(), (width, height));
        Self::place(image, fit, width, height, fill, filter)
    }

    fn place(
        image: &RgbImage,
        fit: ContainFit,
        width: u32,
        height: u32,
        fill: BackgroundColor,
        filter: FilterType,
    ) -> RgbImage {
        let resized = if (fit.width, fit.height) == image.dimensions() {
            image.clone()
        } else {
            image::imageops::resize(image, fit.width, fit.height, filter)
        };

        let mut canvas = ImageBuffer::from_pixel(width, height, fill.to_rgb());
        image::imageops::replace(
            &mut canvas,
            &resized,
            i64::from(fit.offset_x),
            i64::from(fit.offset_y),
        );
        canvas
    }

    /// Preprocess image for model inference
    ///
    /// This function handles:
    /// - RGB conversion
    /// - Aspect ratio preserving resize onto a white square canvas
    /// - Normalization to tensor format (NCHW)
    pub fn preprocess_for_inference(
        image: &DynamicImage,
        config: &PreprocessingConfig,
    ) -> Result<Array4<f32>> {
        if config.target_size == 0 {
            return Err(ProcessingError::segmentation(
                "Model input size must be greater than zero",
            ));
        }

        let canvas = Self::letterbox(
            &image.to_rgb8(),
            config.target_size,
            config.target_size,
            BackgroundColor::white(),
            FilterType::Triangle,
        );

        let size = usize::try_from(config.target_size).map_err(|_| {
            ProcessingError::segmentation("Target size too large for tensor allocation")
        })?;

        Ok(Self::canvas_to_tensor(&canvas, config, size))
    }

    /// Convert canvas to normalized tensor
    fn canvas_to_tensor(canvas: &RgbImage, config: &PreprocessingConfig, size: usize) -> Array4<f32> {
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

        for (x, y, pixel) in canvas.enumerate_pixels() {
            for channel in 0..3 {
                let normalized = (f32::from(pixel.0[channel]) / 255.0
                    - config.normalization_mean[channel])
                    / config.normalization_std[channel];
                if let Some(slot) = tensor.get_mut([0, channel, y as usize, x as usize]) {
                    *slot = normalized;
                }
            }
        }

        tensor
    }
}
