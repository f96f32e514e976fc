//! Mock removers for testing the pipeline without model files

use crate::{
    error::{ProcessingError, Result},
    inference::BackgroundRemover,
};
use image::{DynamicImage, ImageBuffer, Rgba};
use std::sync::atomic::{AtomicUsize, Ordering};

/// What a [`MockRemover`] returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Left half foreground, right half fully transparent
    LeftHalfForeground,
    /// Returns the input converted to RGB (no alpha channel)
    Opaque,
    /// Always fails with a segmentation error
    Fail,
}

/// Mock remover that records how often it was consulted
#[derive(Debug)]
pub struct MockRemover {
    behavior: MockBehavior,
    calls: AtomicUsize,
}

impl MockRemover {
    #[must_use]
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `remove` calls so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BackgroundRemover for MockRemover {
    fn name(&self) -> &str {
        "mock"
    }

    fn remove(&self, image: &DynamicImage) -> Result<DynamicImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::LeftHalfForeground => {
                let rgb = image.to_rgb8();
                let half = rgb.width() / 2;
                Ok(DynamicImage::ImageRgba8(ImageBuffer::from_fn(
                    rgb.width(),
                    rgb.height(),
                    |x, y| {
                        let [r, g, b] = rgb.get_pixel(x, y).0;
                        Rgba([r, g, b, if x < half { 255 } else { 0 }])
                    },
                )))
            },
            MockBehavior::Opaque => Ok(DynamicImage::ImageRgb8(image.to_rgb8())),
            MockBehavior::Fail => Err(ProcessingError::segmentation("mock segmentation failure")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_counts_calls() {
        let remover = MockRemover::new(MockBehavior::Opaque);
        let image = DynamicImage::new_rgb8(4, 4);
        remover.remove(&image).unwrap();
        remover.remove(&image).unwrap();
        assert_eq!(remover.call_count(), 2);
    }

    #[test]
    fn test_mock_left_half_alpha() {
        let remover = MockRemover::new(MockBehavior::LeftHalfForeground);
        let result = remover.remove(&DynamicImage::new_rgb8(4, 2)).unwrap();
        let rgba = result.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0[3], 255);
        assert_eq!(rgba.get_pixel(3, 1).0[3], 0);
    }

    #[test]
    fn test_mock_failure() {
        let remover = MockRemover::new(MockBehavior::Fail);
        assert!(remover.remove(&DynamicImage::new_rgb8(1, 1)).is_err());
        assert_eq!(remover.call_count(), 1);
    }
}
