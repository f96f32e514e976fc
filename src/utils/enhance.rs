//! Linear image enhancements
//!
//! Each enhancement blends the image against a "degenerate" version of
//! itself: `out = degenerate + factor * (image - degenerate)`. A factor of
//! 1.0 returns the input unchanged.

use image::{ImageBuffer, Rgb, RgbImage};

/// Contrast multiplier applied by the enhance stage
pub const CONTRAST_FACTOR: f32 = 1.2;
/// Brightness multiplier applied by the enhance stage
pub const BRIGHTNESS_FACTOR: f32 = 1.1;
/// Sharpness multiplier applied by the enhance stage
pub const SHARPNESS_FACTOR: f32 = 1.1;

/// 3x3 smoothing kernel used as the sharpness baseline
const SMOOTH_KERNEL: [[u32; 3]; 3] = [[1, 1, 1], [1, 5, 1], [1, 1, 1]];
const SMOOTH_SCALE: u32 = 13;

/// Apply the standard enhancement chain: contrast, then brightness, then
/// sharpness, each computed from the previous step's output
#[must_use]
pub fn enhance(image: &RgbImage) -> RgbImage {
    let image = adjust_contrast(image, CONTRAST_FACTOR);
    let image = adjust_brightness(&image, BRIGHTNESS_FACTOR);
    adjust_sharpness(&image, SHARPNESS_FACTOR)
}

/// Scale distance from the mean luma
#[must_use]
pub fn adjust_contrast(image: &RgbImage, factor: f32) -> RgbImage {
    let mean = mean_luma(image);
    let degenerate = ImageBuffer::from_pixel(image.width(), image.height(), Rgb([mean, mean, mean]));
    blend(&degenerate, image, factor)
}

/// Scale distance from black
#[must_use]
pub fn adjust_brightness(image: &RgbImage, factor: f32) -> RgbImage {
    let degenerate = ImageBuffer::from_pixel(image.width(), image.height(), Rgb([0, 0, 0]));
    blend(&degenerate, image, factor)
}

/// Scale distance from a smoothed copy
#[must_use]
pub fn adjust_sharpness(image: &RgbImage, factor: f32) -> RgbImage {
    let degenerate = smooth(image);
    blend(&degenerate, image, factor)
}

/// Rounded mean of ITU-R 601 luma over the whole image
///
/// Each pixel's luma is rounded in 16-bit fixed point before averaging.
fn mean_luma(image: &RgbImage) -> u8 {
    let pixel_count = u64::from(image.width()) * u64::from(image.height());
    if pixel_count == 0 {
        return 0;
    }

    let total: u64 = image
        .pixels()
        .map(|p| luma(p.0))
        .sum();

    (total as f64 / pixel_count as f64).round().clamp(0.0, 255.0) as u8
}

fn luma([r, g, b]: [u8; 3]) -> u64 {
    (19_595 * u64::from(r) + 38_470 * u64::from(g) + 7_471 * u64::from(b) + 0x8000) >> 16
}

/// Apply the smoothing kernel to interior pixels; the one-pixel border is
/// copied unchanged
fn smooth(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut output = image.clone();
    if width < 3 || height < 3 {
        return output;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut sums = [0u32; 3];
            for (ky, row) in SMOOTH_KERNEL.iter().enumerate() {
                for (kx, weight) in row.iter().enumerate() {
                    let neighbour = image.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1);
                    for (sum, value) in sums.iter_mut().zip(neighbour.0) {
                        *sum += weight * u32::from(value);
                    }
                }
            }
            let smoothed = sums.map(|sum| ((sum + SMOOTH_SCALE / 2) / SMOOTH_SCALE).min(255) as u8);
            output.put_pixel(x, y, Rgb(smoothed));
        }
    }

    output
}

/// Interpolate (or extrapolate, for factor > 1) from `degenerate` toward `image`
fn blend(degenerate: &RgbImage, image: &RgbImage, factor: f32) -> RgbImage {
    let mut output = image.clone();
    for ((out, base), src) in output.pixels_mut().zip(degenerate.pixels()).zip(image.pixels()) {
        for channel in 0..3 {
            let base_value = f32::from(base.0[channel]);
            let value = base_value + factor * (f32::from(src.0[channel]) - base_value);
            out.0[channel] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    output
}
