//! Color parsing and conversion utilities

use crate::{config::BackgroundColor, error::ProcessingError, error::Result};

/// Named colors accepted alongside hex notation
const NAMED_COLORS: &[(&str, BackgroundColor)] = &[
    ("white", BackgroundColor::new(255, 255, 255)),
    ("black", BackgroundColor::new(0, 0, 0)),
    ("gray", BackgroundColor::new(128, 128, 128)),
    ("grey", BackgroundColor::new(128, 128, 128)),
    ("red", BackgroundColor::new(255, 0, 0)),
    ("green", BackgroundColor::new(0, 128, 0)),
    ("blue", BackgroundColor::new(0, 0, 255)),
];

/// Utility for parsing and formatting fill colors
pub struct ColorParser;

impl ColorParser {
    /// Parse a color given as `#RRGGBB`, `#RGB` or a simple color name
    ///
    /// # Examples
    /// ```rust
    /// use product_image_processor::utils::ColorParser;
    ///
    /// let white = ColorParser::parse("#FFFFFF").unwrap();
    /// let red = ColorParser::parse("#f00").unwrap();
    /// let black = ColorParser::parse("black").unwrap();
    /// assert_eq!((white.r, red.r, black.r), (255, 255, 0));
    /// ```
    pub fn parse(value: &str) -> Result<BackgroundColor> {
        let trimmed = value.trim();

        if let Some((_, color)) = NAMED_COLORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
        {
            return Ok(*color);
        }

        Self::parse_hex(trimmed)
    }

    /// Parse a hex color string (with or without `#` prefix)
    pub fn parse_hex(hex: &str) -> Result<BackgroundColor> {
        let hex = hex.trim_start_matches('#');
        // from_str_radix alone would accept a sign prefix such as "+f"
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Self::invalid(hex));
        }

        match hex.len() {
            6 => {
                let component = |range: std::ops::Range<usize>| {
                    hex.get(range)
                        .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                        .ok_or_else(|| Self::invalid(hex))
                };
                Ok(BackgroundColor::new(
                    component(0..2)?,
                    component(2..4)?,
                    component(4..6)?,
                ))
            },
            3 => {
                // #RGB expands each digit to a doubled pair
                let component = |index: usize| {
                    hex.get(index..=index)
                        .and_then(|digit| u8::from_str_radix(digit, 16).ok())
                        .map(|value| value * 17)
                        .ok_or_else(|| Self::invalid(hex))
                };
                Ok(BackgroundColor::new(component(0)?, component(1)?, component(2)?))
            },
            _ => Err(Self::invalid(hex)),
        }
    }

    /// Format a color as `#RRGGBB`
    #[must_use]
    pub fn to_hex(color: &BackgroundColor) -> String {
        format!("#{:02X}{:02X}{:02X}", color.r, color.g, color.b)
    }

    fn invalid(value: &str) -> ProcessingError {
        ProcessingError::config(format!(
            "Invalid color '{value}': expected #RRGGBB, #RGB or a color name"
        ))
    }
}
