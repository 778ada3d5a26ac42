// In voxpipe-core/benches/pipeline_bench.rs

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use voxpipe::{ElementType, Pipeline};

// --- Mock Data Generation ---

/// A smooth 16-bit volume: neighbouring voxels differ by a few counts.
fn generate_smooth_volume(n: usize) -> Vec<u8> {
    (0..n)
        .map(|i| (1000 + (i % 64) + (i / 4096) * 3) as u16)
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

/// A volume with a repeating, byte-level pattern and little structure.
fn generate_noisy_volume(n: usize) -> Vec<u8> {
    (0..n)
        .map(|i| ((i as u32).wrapping_mul(2_654_435_761) >> 16) as u16)
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

// --- Benchmark Suite ---

const SHAPE: [usize; 3] = [16, 64, 64];
const PIPELINES: [&str; 4] = [
    "lz4",
    "bitswap1->lz4",
    "delta->bitswap4->zstd",
    "delta->bitswap1->lz4(blocksize_kb=64)->xor_delta",
];

fn bench_pipelines(c: &mut Criterion) {
    let n: usize = SHAPE.iter().product();
    let smooth = generate_smooth_volume(n);
    let noisy = generate_noisy_volume(n);

    let mut group = c.benchmark_group("Pipeline Comparison");
    group.throughput(criterion::Throughput::Bytes(smooth.len() as u64));

    for description in PIPELINES {
        let mut pipeline = Pipeline::parse(description, ElementType::UInt16).unwrap();
        let encoded_smooth = pipeline.encode_to_vec(&smooth, &SHAPE).unwrap();
        let mut out = vec![0u8; pipeline.max_encoded_size(smooth.len())];

        group.bench_function(format!("Encode {} (Smooth)", description), |b| {
            b.iter(|| black_box(pipeline.encode(black_box(&smooth), &mut out, &SHAPE)))
        });
        group.bench_function(format!("Encode {} (Noisy)", description), |b| {
            b.iter(|| black_box(pipeline.encode(black_box(&noisy), &mut out, &SHAPE)))
        });

        let mut decoded = vec![0u8; smooth.len()];
        group.bench_function(format!("Decode {} (Smooth)", description), |b| {
            b.iter(|| black_box(pipeline.decode(black_box(&encoded_smooth), &mut decoded)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipelines);
criterion_main!(benches);
