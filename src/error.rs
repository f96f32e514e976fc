//! Error types for image processing operations

use thiserror::Error;

/// Result type alias for image processing operations
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Error types for configuration, pipeline, encoding and archive operations
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors raised by the `image` crate codecs and operations
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Malformed or invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Upload bytes could not be decoded into an image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Foreground segmentation failed or is unavailable
    #[error("Segmentation error: {0}")]
    Segmentation(String),

    /// Serializing a processed image failed
    #[error("Encode error: {0}")]
    Encode(String),

    /// Building the output archive failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProcessingError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new segmentation error
    pub fn segmentation<S: Into<String>>(msg: S) -> Self {
        Self::Segmentation(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new archive error
    pub fn archive<S: Into<String>>(msg: S) -> Self {
        Self::Archive(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        Self::Io(std::io::Error::new(
            error.kind(),
            format!(
                "Failed to {} '{}': {}",
                operation,
                path.as_ref().display(),
                error
            ),
        ))
    }

    /// Create configuration error naming the valid range
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::Config(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Short category label, safe to expose outside the process
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Image(_) => "image",
            Self::Config(_) => "config",
            Self::Decode(_) => "decode",
            Self::Segmentation(_) => "segmentation",
            Self::Encode(_) => "encode",
            Self::Archive(_) => "archive",
            Self::Internal(_) => "internal",
        }
    }
}
