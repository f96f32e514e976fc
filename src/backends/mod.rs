//! Segmentation backends
//!
//! - Tract backend (pure Rust ONNX inference, feature `tract`)

#[cfg(feature = "tract")]
pub mod tract;

// Mock removers for pipeline and batch tests
#[cfg(test)]
pub mod test_utils;

#[cfg(feature = "tract")]
pub use self::tract::TractRemover;
