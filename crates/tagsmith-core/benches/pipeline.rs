//! Benchmarks for the Tagsmith prediction pipeline.
//!
//! Run with: cargo bench -p tagsmith-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tagsmith_core::config::LimitsConfig;
use tagsmith_core::{partition, LabelVocabulary, Thresholds};

/// Roughly the size of the DeepDanbooru v3 general vocabulary.
const LABELS: usize = 9000;

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

fn benchmark_preprocess(c: &mut Criterion) {
    let img = gradient(1920, 1080);

    c.bench_function("preprocess_1080p_to_512", |b| {
        b.iter(|| {
            let _ = tagsmith_core::pipeline::preprocess(black_box(&img), (512, 512));
        })
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let mut bytes = Vec::new();
    gradient(1024, 768)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();

    let decoder = tagsmith_core::pipeline::ImageDecoder::new(LimitsConfig::default());
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("decode_png_1024", |b| {
        b.iter(|| {
            let _ = rt.block_on(
                decoder.decode_from_bytes(black_box(bytes.clone()), Path::new("bench.png")),
            );
        })
    });
}

fn benchmark_partition(c: &mut Criterion) {
    let vocab = LabelVocabulary::from_parts(
        (0..LABELS).map(|i| format!("label_{i}")),
        (0..LABELS).step_by(10).map(|i| format!("label_{i}")),
    );
    // Deterministic pseudo-random scores, mostly low like real sigmoid output
    let probabilities: Vec<f32> = (0..LABELS + 3)
        .map(|i| ((i * 7919) % 1000) as f32 / 1000.0)
        .map(|p| p * p * p)
        .collect();

    c.bench_function("partition_9000_labels", |b| {
        b.iter(|| {
            let _ = partition(
                black_box(&probabilities),
                black_box(&vocab),
                Thresholds::default(),
            );
        })
    });
}

criterion_group!(
    benches,
    benchmark_preprocess,
    benchmark_decode,
    benchmark_partition,
);
criterion_main!(benches);
