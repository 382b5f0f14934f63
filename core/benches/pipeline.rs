//! Benchmarks for the line pipeline.
//!
//! Run with: `cargo bench -p linepipe-core`
//! View reports in: `target/criterion/report/index.html`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::io;

use linepipe_core::stream::{
    Accumulator, MemoryLines, PipelineConfig, collapse_pairs, normalize_line, run_pipeline,
};

fn sample_lines(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("line {i:05} with a++b pairs +++ and a trailing marker+\n"))
        .collect()
}

/// Benchmark the per-line rewrites
fn bench_transforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("transforms");
    let line = "he++llo wo+rld ++++ and\r\n".repeat(8);
    group.throughput(Throughput::Bytes(line.len() as u64));

    group.bench_function("normalize_line", |b| {
        b.iter(|| black_box(normalize_line(black_box(line.clone()))));
    });

    group.bench_function("collapse_pairs", |b| {
        b.iter(|| black_box(collapse_pairs(black_box(&line), '+', '^')));
    });

    group.finish();
}

/// Benchmark record cutting alone
fn bench_accumulator(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulator");
    let lines = sample_lines(1_000);
    let bytes: usize = lines.iter().map(String::len).sum();
    group.throughput(Throughput::Bytes(bytes as u64));

    for width in [16usize, 80, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                let mut acc = Accumulator::new(width);
                let mut records = 0;
                for line in &lines {
                    acc.push_str(line);
                    while acc.next_record().is_some() {
                        records += 1;
                    }
                }
                black_box((records, acc.take_residue()))
            });
        });
    }

    group.finish();
}

/// Benchmark a whole four-thread run at several queue capacities
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);
    let lines = sample_lines(10_000);
    let bytes: usize = lines.iter().map(String::len).sum();
    group.throughput(Throughput::Bytes(bytes as u64));

    for capacity in [1usize, 8, 50, 512] {
        let config = PipelineConfig::default()
            .with_queue_capacity(capacity)
            .with_max_input_lines(lines.len());
        group.bench_with_input(BenchmarkId::new("queue_capacity", capacity), &config, |b, config| {
            b.iter(|| {
                let source = MemoryLines::new(lines.iter().cloned());
                black_box(run_pipeline(source, io::sink(), config))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_transforms, bench_accumulator, bench_pipeline);
criterion_main!(benches);
