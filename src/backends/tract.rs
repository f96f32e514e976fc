//! Tract backend for foreground segmentation models
//!
//! Runs an ONNX segmentation model (ISNet/U2Net style: RGB NCHW input,
//! single-channel mask output) with Tract, a pure Rust inference engine.

use crate::config::SegmentationConfig;
use crate::error::{ProcessingError, Result};
use crate::inference::BackgroundRemover;
use crate::types::SegmentationMask;
use crate::utils::{ImagePreprocessor, PreprocessingConfig};
use image::DynamicImage;
use ndarray::Array4;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tract-backed [`BackgroundRemover`]
pub struct TractRemover {
    model: Mutex<TractModel>,
    model_path: PathBuf,
    preprocessing: PreprocessingConfig,
}

impl std::fmt::Debug for TractRemover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TractRemover")
            .field("model_path", &self.model_path)
            .field("preprocessing", &self.preprocessing)
            .finish_non_exhaustive()
    }
}

impl TractRemover {
    /// Load and optimize the model at `model_path`
    ///
    /// # Errors
    /// - Model file missing or unreadable
    /// - Model cannot be optimized for the configured input size
    pub fn load(model_path: &Path, config: &SegmentationConfig) -> Result<Self> {
        let load_start = Instant::now();

        if !model_path.exists() {
            return Err(ProcessingError::segmentation(format!(
                "Segmentation model not found: {}",
                model_path.display()
            )));
        }

        let preprocessing = PreprocessingConfig::from(config);
        let size = preprocessing.target_size as usize;

        let model = onnx()
            .model_for_path(model_path)
            .map_err(|e| ProcessingError::segmentation(format!("Failed to load ONNX model: {e}")))?
            .with_input_fact(0, f32::fact([1, 3, size, size]).into())
            .map_err(|e| ProcessingError::segmentation(format!("Failed to set input shape: {e}")))?
            .into_optimized()
            .map_err(|e| ProcessingError::segmentation(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| {
                ProcessingError::segmentation(format!("Failed to create runnable model: {e}"))
            })?;

        info!(
            model = %model_path.display(),
            input_size = size,
            load_ms = load_start.elapsed().as_millis() as u64,
            "Tract segmentation model ready"
        );

        Ok(Self {
            model: Mutex::new(model),
            model_path: model_path.to_path_buf(),
            preprocessing,
        })
    }

    /// Run the model on a preprocessed NCHW tensor
    fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let input_data = input
            .as_slice()
            .ok_or_else(|| ProcessingError::segmentation("Input tensor is not contiguous"))?;
        let input_tensor = Tensor::from_shape(input.shape(), input_data).map_err(|e| {
            ProcessingError::segmentation(format!("Failed to build input tensor: {e}"))
        })?;

        let outputs = {
            let model = self
                .model
                .lock()
                .map_err(|_| ProcessingError::internal("Tract model lock poisoned"))?;
            model
                .run(tvec![input_tensor.into()])
                .map_err(|e| ProcessingError::segmentation(format!("Tract inference failed: {e}")))?
        };

        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| ProcessingError::segmentation("No output tensor found"))?;
        let view = output.to_array_view::<f32>().map_err(|e| {
            ProcessingError::segmentation(format!("Failed to read output tensor: {e}"))
        })?;

        let dims = match view.shape() {
            [b, c, h, w] => (*b, *c, *h, *w),
            [b, h, w] => (*b, 1, *h, *w),
            other => {
                return Err(ProcessingError::segmentation(format!(
                    "Unexpected output tensor rank {}",
                    other.len()
                )))
            },
        };

        Array4::from_shape_vec(dims, view.iter().copied().collect()).map_err(|e| {
            ProcessingError::segmentation(format!("Failed to reshape output tensor: {e}"))
        })
    }
}

impl BackgroundRemover for TractRemover {
    fn name(&self) -> &str {
        "tract"
    }

    fn remove(&self, image: &DynamicImage) -> Result<DynamicImage> {
        let start = Instant::now();
        let dimensions = (image.width(), image.height());

        let input = ImagePreprocessor::preprocess_for_inference(image, &self.preprocessing)?;
        let output = self.infer(&input)?;
        let mask = SegmentationMask::from_tensor(&output, dimensions)?;
        let result = mask.apply_as_alpha(image)?;

        debug!(
            width = dimensions.0,
            height = dimensions.1,
            foreground_ratio = mask.foreground_ratio(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Background segmented"
        );

        Ok(DynamicImage::ImageRgba8(result))
    }
}
