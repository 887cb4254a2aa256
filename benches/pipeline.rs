//! Benchmarks for chunking, delta encoding and payload replay.
//!
//! Run: cargo bench --bench pipeline

use cdelta::{ChunkerConfig, DeltaPayload, ShrinkPolicy, encode_chunk, split};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

fn create_test_data(size: usize, change_rate: usize) -> (Vec<u8>, Vec<u8>) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut base = vec![0u8; size];
    rng.fill(&mut base[..]);

    let mut new = base.clone();
    for i in (0..size).step_by(change_rate) {
        new[i] = new[i].wrapping_add(1);
    }

    (base, new)
}

fn benchmark_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunking");
    let config = ChunkerConfig::default();

    for size in [256 * 1024, 1024 * 1024, 4 * 1024 * 1024].iter() {
        let (data, _) = create_test_data(*size, 100);

        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| split(black_box(&data), config))
        });
    }

    group.finish();
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let size = 64 * 1024;

    for change_rate in [5, 50, 500, 5000].iter() {
        let (base, new) = create_test_data(size, *change_rate);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(change_rate),
            change_rate,
            |b, _| {
                b.iter(|| {
                    encode_chunk(
                        0,
                        Some(black_box(base.as_slice())),
                        black_box(&new),
                        ShrinkPolicy::Full,
                    )
                })
            },
        );
    }

    group.finish();
}

fn benchmark_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply");
    let size = 64 * 1024;

    for change_rate in [5, 50, 500, 5000].iter() {
        let (base, new) = create_test_data(size, *change_rate);
        let record = encode_chunk(0, Some(&base), &new, ShrinkPolicy::Full);
        let wire = record.payload.serialize();
        let mode = record.mode();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::new(mode.prefix(), change_rate),
            change_rate,
            |b, _| {
                b.iter(|| {
                    DeltaPayload::parse(mode, black_box(wire.clone()))
                        .apply(Some(black_box(base.as_slice())))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_chunking, benchmark_encode, benchmark_apply);
criterion_main!(benches);
