//! Utility modules shared by the pipeline and the segmentation backends

pub mod color;
pub mod enhance;
pub mod preprocessing;

pub use color::ColorParser;
pub use preprocessing::{ContainFit, ImagePreprocessor, PreprocessingConfig};
