//! Detection benchmarks.
//!
//! Measures single detections per fallback mix, batch throughput, the cost
//! of streamed loading with warm and cold caches, signature-count scaling,
//! and trie walks.

mod common;

use common::{generate_dataset, generate_exact_inputs, generate_inputs, BenchmarkConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use device_detection::{
    CacheConfig, Dataset, DetectionConfig, LoadMode, PatternProvider, TrieProvider,
};
use std::io::Write;
use std::sync::Arc;

fn resident_provider(config: &BenchmarkConfig) -> PatternProvider {
    let dataset = Dataset::from_bytes(generate_dataset(config)).unwrap();
    PatternProvider::new(Arc::new(dataset)).unwrap()
}

fn bench_single_detection(c: &mut Criterion) {
    let config = BenchmarkConfig::new();
    let provider = resident_provider(&config);
    let exact = generate_exact_inputs(&config);
    let mixed = generate_inputs(&config);

    let mut group = c.benchmark_group("single_detection");
    group.bench_function("exact", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % exact.len();
            black_box(provider.detect(black_box(&exact[i])).unwrap())
        })
    });
    group.bench_function("mixed_tiers", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % mixed.len();
            black_box(provider.detect(black_box(&mixed[i])).unwrap())
        })
    });
    group.bench_function("property_lookup", |b| {
        let result = provider.detect(&exact[0]).unwrap();
        b.iter(|| black_box(result.values(black_box("ScreenPixelsWidth")).unwrap()))
    });
    group.finish();
}

fn bench_batch_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_detection");
    for input_count in [10, 100, 1_000] {
        let config = BenchmarkConfig::new().with_input_count(input_count);
        let provider = resident_provider(&config);
        let inputs = generate_inputs(&config);

        group.throughput(Throughput::Elements(input_count as u64));
        group.bench_with_input(
            BenchmarkId::new("detect_batch", input_count),
            &inputs,
            |b, inputs| b.iter(|| black_box(provider.detect_batch(inputs))),
        );
    }
    group.finish();
}

fn bench_streamed_caches(c: &mut Criterion) {
    let config = BenchmarkConfig::new();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&generate_dataset(&config)).unwrap();
    file.flush().unwrap();
    let inputs = generate_inputs(&config);

    let mut group = c.benchmark_group("streamed_detection");
    for (name, cache) in [
        ("no_cache", CacheConfig::disabled()),
        ("default_cache", CacheConfig::default()),
    ] {
        let detection = DetectionConfig::new()
            .with_load_mode(LoadMode::Streamed)
            .with_cache(cache);
        let dataset = Arc::new(Dataset::open(file.path(), &detection).unwrap());
        let provider = PatternProvider::new(dataset).unwrap();

        group.bench_function(name, |b| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % inputs.len();
                black_box(provider.detect(black_box(&inputs[i])).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_signature_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("signature_scaling");
    for signature_count in [100, 1_000, BenchmarkConfig::scaling().signature_count] {
        let config = BenchmarkConfig::scaling().with_signature_count(signature_count);
        let provider = resident_provider(&config);
        let inputs = generate_inputs(&config);

        group.bench_with_input(
            BenchmarkId::new("mixed_tiers", signature_count),
            &inputs,
            |b, inputs| {
                let mut i = 0;
                b.iter(|| {
                    i = (i + 1) % inputs.len();
                    black_box(provider.detect(&inputs[i]).unwrap())
                })
            },
        );
    }
    group.finish();
}

fn bench_trie(c: &mut Criterion) {
    let config = BenchmarkConfig::new();
    let dataset = Arc::new(Dataset::from_bytes(generate_dataset(&config)).unwrap());
    let trie = TrieProvider::new(dataset).unwrap();
    let inputs = generate_inputs(&config);

    c.bench_function("trie_device_index", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % inputs.len();
            let device = trie.device_index(black_box(&inputs[i])).unwrap();
            black_box(trie.property_value(device, "ScreenPixelsWidth").unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_single_detection,
    bench_batch_detection,
    bench_streamed_caches,
    bench_signature_scaling,
    bench_trie
);
criterion_main!(benches);
