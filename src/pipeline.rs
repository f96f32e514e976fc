//! Per-image processing pipeline
//!
//! [`ImagePipeline`] runs one decoded image through the configured stages:
//! normalize, contain-resize, background removal, enhancement and a final
//! normalize. Every stage consumes its input and returns a new image, and the
//! result is always 8-bit RGB.

use crate::{
    config::{BackgroundColor, ProcessorConfig},
    error::Result,
    inference::BackgroundRemover,
    utils::{enhance, ImagePreprocessor},
};
use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage, RgbaImage};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, instrument, span, Level};

/// Stages of the per-image pipeline, used for log context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Convert to 8-bit RGB
    Normalize,
    /// Contain-fit into the configured box
    Resize,
    /// Segment and composite over the background color
    BackgroundRemoval,
    /// Contrast, brightness and sharpness
    Enhance,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Normalize => "normalize",
            Self::Resize => "resize",
            Self::BackgroundRemoval => "background_removal",
            Self::Enhance => "enhance",
        };
        write!(f, "{name}")
    }
}

/// Sequential image pipeline around a shared [`BackgroundRemover`]
#[derive(Clone)]
pub struct ImagePipeline {
    remover: Arc<dyn BackgroundRemover>,
}

impl std::fmt::Debug for ImagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePipeline")
            .field("remover", &self.remover.name())
            .finish()
    }
}

impl ImagePipeline {
    #[must_use]
    pub fn new(remover: Arc<dyn BackgroundRemover>) -> Self {
        Self { remover }
    }

    /// Name of the configured background remover
    #[must_use]
    pub fn remover_name(&self) -> &str {
        self.remover.name()
    }

    /// Run `image` through every stage enabled in `config`
    ///
    /// # Errors
    /// - Background removal failure (the only fallible stage)
    #[instrument(
        skip(self, image, config),
        fields(
            dimensions = %format!("{}x{}", image.width(), image.height()),
            resize = config.operations.resize,
            remove_background = config.operations.remove_background,
            enhance = config.operations.enhance
        )
    )]
    pub fn process(&self, image: DynamicImage, config: &ProcessorConfig) -> Result<DynamicImage> {
        let start = Instant::now();
        let operations = config.operations;
        let fill = config.backgrounds.default_color;

        let mut image = {
            let _span = span!(Level::DEBUG, "stage", stage = %PipelineStage::Normalize).entered();
            normalize(image)
        };

        if operations.resize {
            let _span = span!(Level::DEBUG, "stage", stage = %PipelineStage::Resize).entered();
            image = resize(&image, config);
        }

        if operations.remove_background {
            let _span = span!(
                Level::DEBUG,
                "stage",
                stage = %PipelineStage::BackgroundRemoval,
                remover = %self.remover.name()
            )
            .entered();
            image = self.remove_background(&image, fill).map_err(|e| {
                error!(stage = %PipelineStage::BackgroundRemoval, error = %e, "Pipeline stage failed");
                e
            })?;
        }

        if operations.enhance {
            let _span = span!(Level::DEBUG, "stage", stage = %PipelineStage::Enhance).entered();
            image = DynamicImage::ImageRgb8(enhance::enhance(&image.to_rgb8()));
        }

        if operations.watermark {
            debug!("Watermark requested but no watermark stage is implemented; skipping");
        }

        let image = normalize(image);
        debug!(
            width = image.width(),
            height = image.height(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pipeline finished"
        );
        Ok(image)
    }

    fn remove_background(&self, image: &DynamicImage, fill: BackgroundColor) -> Result<DynamicImage> {
        let removed = self.remover.remove(image)?;
        if removed.color().has_alpha() {
            Ok(DynamicImage::ImageRgb8(composite_over(&removed.to_rgba8(), fill)))
        } else {
            debug!("Remover returned an image without alpha; passing it through");
            Ok(removed)
        }
    }
}

/// Convert any color mode to 8-bit RGB; RGB8 input is returned untouched
#[must_use]
pub fn normalize(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) => image,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Contain-fit into the configured box (shrink only), padded with the background color
fn resize(image: &DynamicImage, config: &ProcessorConfig) -> DynamicImage {
    let rgb = image.to_rgb8();
    DynamicImage::ImageRgb8(ImagePreprocessor::contain(
        &rgb,
        config.dimensions.width,
        config.dimensions.height,
        config.backgrounds.default_color,
        FilterType::Lanczos3,
    ))
}

/// Blend `foreground` over a flat `fill` canvas using its alpha channel
#[must_use]
pub fn composite_over(foreground: &RgbaImage, fill: BackgroundColor) -> RgbImage {
    let background = [u32::from(fill.r), u32::from(fill.g), u32::from(fill.b)];
    ImageBuffer::from_fn(foreground.width(), foreground.height(), |x, y| {
        let [r, g, b, a] = foreground.get_pixel(x, y).0;
        let alpha = u32::from(a);
        let mix = |fg: u8, bg: u32| ((u32::from(fg) * alpha + bg * (255 - alpha) + 127) / 255) as u8;
        Rgb([
            mix(r, background[0]),
            mix(g, background[1]),
            mix(b, background[2]),
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::{MockBehavior, MockRemover};
    use crate::config::{Dimensions, Operations};
    use image::{GrayAlphaImage, LumaA, Rgba};

    fn config(resize: bool, remove_background: bool, enhance: bool) -> ProcessorConfig {
        ProcessorConfig {
            dimensions: Dimensions {
                width: 40,
                height: 30,
            },
            operations: Operations {
                resize,
                remove_background,
                enhance,
                watermark: false,
            },
            ..ProcessorConfig::default()
        }
    }

    fn pipeline(behavior: MockBehavior) -> (ImagePipeline, Arc<MockRemover>) {
        let remover = Arc::new(MockRemover::new(behavior));
        (ImagePipeline::new(remover.clone()), remover)
    }

    #[test]
    fn test_resize_hits_exact_dimensions() {
        let (pipeline, _) = pipeline(MockBehavior::Opaque);
        for (w, h) in [(400, 100), (10, 90), (40, 30), (1, 1), (1000, 1)] {
            let out = pipeline
                .process(DynamicImage::new_rgb8(w, h), &config(true, false, false))
                .unwrap();
            assert_eq!((out.width(), out.height()), (40, 30), "source {w}x{h}");
        }
    }

    #[test]
    fn test_output_is_always_rgb8() {
        let (pipeline, _) = pipeline(MockBehavior::LeftHalfForeground);
        let input = DynamicImage::ImageLumaA8(GrayAlphaImage::from_pixel(12, 8, LumaA([90, 128])));

        for mask in 0..8u8 {
            let cfg = config(mask & 1 != 0, mask & 2 != 0, mask & 4 != 0);
            let out = pipeline.process(input.clone(), &cfg).unwrap();
            assert!(matches!(out, DynamicImage::ImageRgb8(_)), "operations {mask:03b}");
        }
    }

    #[test]
    fn test_normalize_is_idempotent_on_rgb() {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(3, 3, Rgb([1, 2, 3])));
        let once = normalize(image.clone());
        assert_eq!(once, image);
        assert_eq!(normalize(once.clone()), once);
    }

    #[test]
    fn test_remover_not_consulted_when_disabled() {
        let (pipeline, remover) = pipeline(MockBehavior::Fail);
        let out = pipeline.process(DynamicImage::new_rgb8(8, 8), &config(true, false, true));
        assert!(out.is_ok());
        assert_eq!(remover.call_count(), 0);
    }

    #[test]
    fn test_removal_failure_propagates() {
        let (pipeline, remover) = pipeline(MockBehavior::Fail);
        let out = pipeline.process(DynamicImage::new_rgb8(8, 8), &config(false, true, false));
        assert!(out.is_err());
        assert_eq!(remover.call_count(), 1);
    }

    #[test]
    fn test_removed_background_takes_fill_color() {
        let (pipeline, _) = pipeline(MockBehavior::LeftHalfForeground);
        let mut cfg = config(false, true, false);
        cfg.backgrounds.default_color = BackgroundColor::new(0, 0, 255);

        let input = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(4, 2, Rgb([200, 10, 10])));
        let out = pipeline.process(input, &cfg).unwrap().to_rgb8();
        assert_eq!(*out.get_pixel(0, 0), Rgb([200, 10, 10]));
        assert_eq!(*out.get_pixel(3, 1), Rgb([0, 0, 255]));
    }

    #[test]
    fn test_opaque_removal_result_passes_through() {
        let (pipeline, remover) = pipeline(MockBehavior::Opaque);
        let input = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(4, 4, Rgb([7, 8, 9])));
        let out = pipeline.process(input.clone(), &config(false, true, false)).unwrap();
        assert_eq!(out, input);
        assert_eq!(remover.call_count(), 1);
    }

    #[test]
    fn test_composite_half_alpha() {
        let fg = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 128]));
        let out = composite_over(&fg, BackgroundColor::new(0, 0, 0));
        assert_eq!(*out.get_pixel(0, 0), Rgb([128, 128, 128]));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(PipelineStage::BackgroundRemoval.to_string(), "background_removal");
    }
}
