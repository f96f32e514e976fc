#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Product Image Processor
//!
//! Batch processing of product photos for catalogue use: uploads are
//! normalized to RGB, contain-resized onto a fixed canvas, optionally cut out
//! with a foreground segmentation model, enhanced, encoded and returned as a
//! zip archive.
//!
//! ## Features
//!
//! - **Configurable pipeline**: resize, background removal and enhancement
//!   switched per request, over process-wide defaults loaded from JSON or TOML
//! - **Segmentation backends**: pure Rust ONNX inference with Tract behind the
//!   [`BackgroundRemover`] trait
//! - **Formats**: JPEG (with quality), PNG, WebP, TIFF and BMP output
//! - **HTTP service**: upload form and multipart batch endpoint (axum)
//! - **CLI Integration**: `serve` and offline `process` commands (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use product_image_processor::{process_image_bytes, OutputFormat, ProcessorConfig};
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut config = ProcessorConfig::load(Some("config.json".as_ref()))?;
//! config.output_format = OutputFormat::Png;
//!
//! let input = std::fs::read("shoe.jpg")?;
//! let output = process_image_bytes(&input, &config)?;
//! std::fs::write("shoe.png", output)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `tract` (default): Tract segmentation backend
//! - `cli` (default): command-line interface, log file output and progress bars

pub mod backends;
pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod server;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
#[cfg(feature = "tract")]
pub use backends::TractRemover;
pub use batch::{BatchOutcome, BatchProcessor, BatchReport, FileReport, FileStatus, Upload};
pub use config::{
    BackgroundColor, Dimensions, OperationOverrides, Operations, OutputFormat, ProcessorConfig,
    SegmentationConfig, ServerConfig,
};
pub use error::{ProcessingError, Result};
pub use inference::{build_remover, BackgroundRemover, DisabledRemover};
pub use pipeline::ImagePipeline;
pub use server::{build_router, AppState};
pub use services::{ArchiveBuilder, OutputEncoder};
pub use types::SegmentationMask;

/// Decode, process and encode a single image with `config`
///
/// Builds the background remover from `config.segmentation` on every call;
/// use [`ImagePipeline`] directly to reuse a loaded model.
///
/// # Errors
/// - Undecodable input
/// - Segmentation model load or inference failure
/// - Encoder failure
pub fn process_image_bytes(bytes: &[u8], config: &ProcessorConfig) -> Result<Vec<u8>> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| ProcessingError::decode(format!("Failed to decode image from bytes: {e}")))?;

    let pipeline = ImagePipeline::new(build_remover(&config.segmentation)?);
    let processed = pipeline.process(image, config)?;
    OutputEncoder::encode(&processed, config.output_format, config.quality)
}
