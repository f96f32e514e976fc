//! Configuration types for product image processing
//!
//! A [`ProcessorConfig`] is built once at startup from hardcoded defaults and
//! an optional override file. Requests never mutate it: per-request operation
//! flags are applied with [`ProcessorConfig::with_overrides`], which returns a
//! request-scoped snapshot.

use crate::error::{ProcessingError, Result};
use crate::utils::ColorParser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Top-level keys recognised in an override file
const KNOWN_KEYS: &[&str] = &[
    "dimensions",
    "output_format",
    "quality",
    "operations",
    "backgrounds",
    "segmentation",
    "server",
];

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    /// JPEG (lossy, no transparency)
    #[serde(alias = "jpeg", alias = "JPG", alias = "jpg")]
    Jpeg,
    /// PNG (lossless)
    #[serde(alias = "png")]
    Png,
    /// WebP (lossless encoder)
    #[serde(alias = "webp")]
    WebP,
    /// TIFF (lossless)
    #[serde(alias = "tiff")]
    Tiff,
    /// Windows bitmap
    #[serde(alias = "bmp")]
    Bmp,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Jpeg
    }
}

impl OutputFormat {
    /// File extension (without the dot)
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Tiff => "tiff",
            Self::Bmp => "bmp",
        }
    }

    /// MIME type of the encoded output
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
        }
    }

    /// Whether the encoder honours a quality setting
    #[must_use]
    pub fn uses_quality(self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jpeg => write!(f, "JPEG"),
            Self::Png => write!(f, "PNG"),
            Self::WebP => write!(f, "WEBP"),
            Self::Tiff => write!(f, "TIFF"),
            Self::Bmp => write!(f, "BMP"),
        }
    }
}

/// Opaque RGB fill color used for letterboxing and compositing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BackgroundColor {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[must_use]
    pub const fn white() -> Self {
        Self::new(255, 255, 255)
    }

    #[must_use]
    pub fn to_rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.r, self.g, self.b])
    }
}

impl Default for BackgroundColor {
    fn default() -> Self {
        Self::white()
    }
}

impl TryFrom<String> for BackgroundColor {
    type Error = ProcessingError;

    fn try_from(value: String) -> Result<Self> {
        ColorParser::parse(&value)
    }
}

impl From<BackgroundColor> for String {
    fn from(color: BackgroundColor) -> Self {
        ColorParser::to_hex(&color)
    }
}

/// Target box for the resize stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 1200,
        }
    }
}

/// Pipeline stages that can be switched on or off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Operations {
    pub resize: bool,
    pub remove_background: bool,
    pub enhance: bool,
    /// Accepted for configuration compatibility; no watermark stage exists
    pub watermark: bool,
}

impl Default for Operations {
    fn default() -> Self {
        Self {
            resize: true,
            remove_background: false,
            enhance: true,
            watermark: false,
        }
    }
}

/// Background fill settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Backgrounds {
    pub default_color: BackgroundColor,
    /// Accepted for configuration compatibility; fills are always flat
    pub gradient: bool,
}

/// Foreground segmentation model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Path to an ONNX segmentation model; background removal fails without one
    pub model_path: Option<PathBuf>,
    /// Square model input edge in pixels
    pub input_size: u32,
    pub normalization_mean: [f32; 3],
    pub normalization_std: [f32; 3],
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_size: 1024,
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted multipart body size in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Per-request switches for the optional pipeline stages
///
/// Mirrors checkbox semantics: every flag is explicit, so a missing
/// checkbox disables its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperationOverrides {
    pub resize: bool,
    pub remove_background: bool,
    pub enhance: bool,
}

/// Configuration for the processing pipeline and its hosting service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub dimensions: Dimensions,
    pub output_format: OutputFormat,
    /// Encoder quality (1-100, only used by lossy formats)
    pub quality: u8,
    pub operations: Operations,
    pub backgrounds: Backgrounds,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            dimensions: Dimensions::default(),
            output_format: OutputFormat::default(),
            quality: 95,
            operations: Operations::default(),
            backgrounds: Backgrounds::default(),
            segmentation: SegmentationConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Override file syntax, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFileFormat {
    Json,
    Yaml,
    Toml,
}

impl ConfigFileFormat {
    fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Self::Yaml,
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

impl ProcessorConfig {
    /// Load configuration from defaults and an optional override file
    ///
    /// Top-level keys in the file replace the default value for that key
    /// wholesale; nested sections are not deep-merged. A missing file (or no
    /// path) yields the defaults. The syntax follows the extension: `.yaml` or
    /// `.yml` for YAML, `.toml` for TOML, JSON otherwise.
    ///
    /// # Errors
    /// - Unreadable or malformed override file
    /// - Values outside their valid ranges
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("No configuration file given, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!(path = %path.display(), "Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProcessingError::file_io_error("read configuration file", path, &e))?;
        let parse_error = |e: &dyn std::fmt::Display| {
            ProcessingError::config(format!("Failed to parse {}: {}", path.display(), e))
        };

        let overrides: serde_json::Value = match ConfigFileFormat::from_path(path) {
            ConfigFileFormat::Json => serde_json::from_str(&contents).map_err(|e| parse_error(&e))?,
            ConfigFileFormat::Yaml => serde_yaml::from_str(&contents).map_err(|e| parse_error(&e))?,
            ConfigFileFormat::Toml => toml::from_str(&contents).map_err(|e| parse_error(&e))?,
        };

        let config = Self::merged_with(overrides)?;
        info!(path = %path.display(), "Loaded configuration overrides");
        Ok(config)
    }

    /// Apply a parsed override document on top of the defaults (one level deep)
    ///
    /// # Errors
    /// - Override document is not a key-value mapping
    /// - Merged document does not describe a valid configuration
    pub fn merged_with(overrides: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(overrides) = overrides else {
            return Err(ProcessingError::config(
                "Configuration file must contain a key-value mapping at the top level",
            ));
        };

        let mut merged = match serde_json::to_value(Self::default()) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => {
                return Err(ProcessingError::internal(
                    "Default configuration did not serialize to a mapping",
                ))
            },
            Err(e) => return Err(ProcessingError::internal(e.to_string())),
        };

        for (key, value) in overrides {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                warn!(key = %key, "Ignoring unknown configuration key");
                continue;
            }
            merged.insert(key, value);
        }

        let config: Self = serde_json::from_value(serde_json::Value::Object(merged))
            .map_err(|e| ProcessingError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Quality outside 1-100
    /// - Zero target width or height
    /// - Zero segmentation input size or zero normalization std
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(ProcessingError::config_value_error(
                "quality",
                self.quality,
                "1-100",
            ));
        }

        if self.dimensions.width == 0 || self.dimensions.height == 0 {
            return Err(ProcessingError::config(format!(
                "Invalid dimensions: {}x{} (both must be greater than zero)",
                self.dimensions.width, self.dimensions.height
            )));
        }

        if self.segmentation.input_size == 0 {
            return Err(ProcessingError::config_value_error(
                "segmentation input size",
                self.segmentation.input_size,
                "1 or more",
            ));
        }

        if self.segmentation.normalization_std.contains(&0.0) {
            return Err(ProcessingError::config(
                "Segmentation normalization std must not contain zero",
            ));
        }

        Ok(())
    }

    /// Request-scoped copy with the given operation flags applied
    #[must_use]
    pub fn with_overrides(&self, overrides: OperationOverrides) -> Self {
        let mut snapshot = self.clone();
        snapshot.operations.resize = overrides.resize;
        snapshot.operations.remove_background = overrides.remove_background;
        snapshot.operations.enhance = overrides.enhance;
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = ProcessorConfig::default();
        assert_eq!(config.dimensions, Dimensions { width: 1200, height: 1200 });
        assert_eq!(config.output_format, OutputFormat::Jpeg);
        assert_eq!(config.quality, 95);
        assert!(config.operations.resize);
        assert!(!config.operations.remove_background);
        assert!(config.operations.enhance);
        assert!(!config.operations.watermark);
        assert_eq!(config.backgrounds.default_color, BackgroundColor::white());
        assert!(!config.backgrounds.gradient);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_format_follows_extension() {
        assert_eq!(ConfigFileFormat::from_path(Path::new("c.yaml")), ConfigFileFormat::Yaml);
        assert_eq!(ConfigFileFormat::from_path(Path::new("c.YML")), ConfigFileFormat::Yaml);
        assert_eq!(ConfigFileFormat::from_path(Path::new("c.toml")), ConfigFileFormat::Toml);
        assert_eq!(ConfigFileFormat::from_path(Path::new("c.json")), ConfigFileFormat::Json);
        assert_eq!(ConfigFileFormat::from_path(Path::new("config")), ConfigFileFormat::Json);
    }

    #[test]
    fn test_shallow_merge_replaces_whole_sections() {
        let config = ProcessorConfig::merged_with(json!({
            "quality": 80,
            "dimensions": { "width": 640, "height": 480 }
        }))
        .unwrap();

        assert_eq!(config.quality, 80);
        assert_eq!(config.dimensions.width, 640);
        assert_eq!(config.dimensions.height, 480);
        assert_eq!(config.operations, Operations::default());
    }

    #[test]
    fn test_partial_nested_section_is_not_deep_merged() {
        let result = ProcessorConfig::merged_with(json!({
            "dimensions": { "width": 640 }
        }));
        assert!(matches!(result, Err(ProcessingError::Config(_))));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = ProcessorConfig::merged_with(json!({ "colour": "blue" })).unwrap();
        assert_eq!(config, ProcessorConfig::default());
    }

    #[test]
    fn test_non_mapping_document_is_rejected() {
        let result = ProcessorConfig::merged_with(json!([1, 2, 3]));
        assert!(matches!(result, Err(ProcessingError::Config(_))));
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let mut config = ProcessorConfig::default();
        config.quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality"));

        let mut config = ProcessorConfig::default();
        config.quality = 101;
        assert!(config.validate().is_err());

        let mut config = ProcessorConfig::default();
        config.dimensions.height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_format_names() {
        let config = ProcessorConfig::merged_with(json!({ "output_format": "png" })).unwrap();
        assert_eq!(config.output_format, OutputFormat::Png);

        let config = ProcessorConfig::merged_with(json!({ "output_format": "WEBP" })).unwrap();
        assert_eq!(config.output_format, OutputFormat::WebP);
        assert_eq!(config.output_format.extension(), "webp");
        assert!(!config.output_format.uses_quality());
        assert!(OutputFormat::Jpeg.uses_quality());
    }

    #[test]
    fn test_background_color_round_trips_as_hex() {
        let config = ProcessorConfig::merged_with(json!({
            "backgrounds": { "default_color": "#102030", "gradient": false }
        }))
        .unwrap();
        assert_eq!(config.backgrounds.default_color, BackgroundColor::new(16, 32, 48));

        let value = serde_json::to_value(config.backgrounds).unwrap();
        assert_eq!(value["default_color"], "#102030");
    }

    #[test]
    fn test_overrides_produce_snapshot_without_mutating_source() {
        let shared = ProcessorConfig::default();
        let snapshot = shared.with_overrides(OperationOverrides {
            resize: false,
            remove_background: true,
            enhance: false,
        });

        assert!(!snapshot.operations.resize);
        assert!(snapshot.operations.remove_background);
        assert!(!snapshot.operations.enhance);
        assert_eq!(shared, ProcessorConfig::default());
    }
}
