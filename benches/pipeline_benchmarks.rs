//! Pipeline and encoder throughput benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, ImageBuffer, Rgb};
use product_image_processor::{
    utils::enhance, DisabledRemover, ImagePipeline, OperationOverrides, OutputEncoder,
    OutputFormat, ProcessorConfig,
};
use std::sync::Arc;

fn sample_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }))
}

fn bench_pipeline(c: &mut Criterion) {
    let pipeline = ImagePipeline::new(Arc::new(DisabledRemover));
    let config = ProcessorConfig::default().with_overrides(OperationOverrides {
        resize: true,
        remove_background: false,
        enhance: true,
    });

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    for (width, height) in [(640, 480), (1920, 1080)] {
        let image = sample_image(width, height);
        group.bench_with_input(
            BenchmarkId::new("resize_enhance", format!("{width}x{height}")),
            &image,
            |b, image| b.iter(|| pipeline.process(black_box(image.clone()), &config)),
        );
    }
    group.finish();
}

fn bench_enhance(c: &mut Criterion) {
    let image = sample_image(1200, 1200).to_rgb8();
    c.bench_function("enhance_1200x1200", |b| {
        b.iter(|| enhance::enhance(black_box(&image)));
    });
}

fn bench_encode(c: &mut Criterion) {
    let image = sample_image(1200, 1200);
    let mut group = c.benchmark_group("encode");
    group.sample_size(10);
    for format in [OutputFormat::Jpeg, OutputFormat::Png] {
        group.bench_with_input(BenchmarkId::from_parameter(format), &format, |b, &format| {
            b.iter(|| OutputEncoder::encode(black_box(&image), format, 95));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_enhance, bench_encode);
criterion_main!(benches);
