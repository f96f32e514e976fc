//! Shared helpers for integration tests

#![allow(dead_code)]

use image::{DynamicImage, ImageBuffer, Rgb, Rgba};
use product_image_processor::{BackgroundRemover, OutputEncoder, OutputFormat, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Deterministic colorful test image
pub fn sample_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 13 + y * 3) % 256) as u8,
            ((x * 7 + y * 17) % 256) as u8,
            ((x + y) % 256) as u8,
        ])
    }))
}

/// Encoded test image in the given format
pub fn encoded(width: u32, height: u32, format: OutputFormat) -> Vec<u8> {
    OutputEncoder::encode(&sample_image(width, height), format, 90).unwrap()
}

/// Stub remover: keeps the top half, clears the bottom half
#[derive(Debug, Default)]
pub struct TopHalfRemover {
    calls: AtomicUsize,
}

impl TopHalfRemover {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BackgroundRemover for TopHalfRemover {
    fn name(&self) -> &str {
        "top-half"
    }

    fn remove(&self, image: &DynamicImage) -> Result<DynamicImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rgb = image.to_rgb8();
        let half = rgb.height() / 2;
        Ok(DynamicImage::ImageRgba8(ImageBuffer::from_fn(
            rgb.width(),
            rgb.height(),
            |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                Rgba([r, g, b, if y < half { 255 } else { 0 }])
            },
        )))
    }
}

/// Entry names of a zip archive, in archive order
pub fn archive_entries(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Read one archive entry's bytes
pub fn archive_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    data
}

/// In-memory log sink for asserting on emitted tracing events
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Plain-text subscriber writing every event at DEBUG and above into this sink
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let sink = self.clone();
        tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::DEBUG)
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }

    /// Captured lines emitted at ERROR level
    pub fn errors(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.trim_start().starts_with("ERROR"))
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
