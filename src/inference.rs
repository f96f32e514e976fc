//! Background removal abstraction
//!
//! The segmentation model is a black box behind [`BackgroundRemover`]. The
//! pipeline only relies on the returned image carrying an alpha channel that
//! marks the foreground.

use crate::config::SegmentationConfig;
use crate::error::{ProcessingError, Result};
use image::DynamicImage;
use std::sync::Arc;
use tracing::info;

/// Trait for foreground segmentation backends
pub trait BackgroundRemover: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Return `image` with its background marked transparent
    ///
    /// # Errors
    /// - Model unavailable or inference failure
    fn remove(&self, image: &DynamicImage) -> Result<DynamicImage>;
}

/// Remover used when no segmentation model is configured; always fails
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRemover;

impl BackgroundRemover for DisabledRemover {
    fn name(&self) -> &str {
        "disabled"
    }

    fn remove(&self, _image: &DynamicImage) -> Result<DynamicImage> {
        Err(ProcessingError::segmentation(
            "no segmentation model configured",
        ))
    }
}

/// Build the remover described by the configuration
///
/// Falls back to [`DisabledRemover`] when no model path is set, or when the
/// crate was built without the `tract` feature.
///
/// # Errors
/// - Configured model cannot be loaded
pub fn build_remover(config: &SegmentationConfig) -> Result<Arc<dyn BackgroundRemover>> {
    let Some(model_path) = config.model_path.as_deref() else {
        info!("No segmentation model configured; background removal requests will fail per file");
        return Ok(Arc::new(DisabledRemover));
    };

    #[cfg(feature = "tract")]
    {
        let remover = crate::backends::TractRemover::load(model_path, config)?;
        Ok(Arc::new(remover))
    }

    #[cfg(not(feature = "tract"))]
    {
        tracing::warn!(
            model = %model_path.display(),
            "Segmentation model configured but the tract feature is disabled"
        );
        Ok(Arc::new(DisabledRemover))
    }
}
