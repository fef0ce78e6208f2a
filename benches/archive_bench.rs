//! Benchmarks for archive write throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use diag_collector::utils::archive::{ArchiveWriter, StorageMode};
use diag_collector::utils::collection_log::NullSink;
use std::fs;
use tempfile::TempDir;

/// Benchmark streaming a single file at different sizes
fn bench_file_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_file_sizes");

    let sizes: Vec<usize> = vec![64 * 1024, 1024 * 1024, 8 * 1024 * 1024];

    for size in sizes {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.txt");
        let data: Vec<u8> = (0..size).map(|i| b"abcdefgh\n"[i % 9]).collect();
        fs::write(&source, data).unwrap();
        let zip_path = temp_dir.path().join("out.zip");

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut archive = ArchiveWriter::create(&zip_path).unwrap();
                archive
                    .write_file("diag/source.txt", black_box(&source), None, &mut NullSink)
                    .unwrap();
                archive.finish().unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark stored against deflated entries
fn bench_storage_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_storage_modes");

    let temp_dir = TempDir::new().unwrap();
    let zip_path = temp_dir.path().join("out.zip");
    let data: Vec<u8> = (0..1024 * 1024).map(|i| (i % 251) as u8).collect();

    for mode in [StorageMode::Stored, StorageMode::Deflated] {
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(mode), &mode, |b, mode| {
            b.iter(|| {
                let mut archive = ArchiveWriter::create(&zip_path).unwrap();
                archive
                    .write_bytes("diag/payload.bin", black_box(&data), Some(*mode), &mut NullSink)
                    .unwrap();
                archive.finish().unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark many small entries, as from a sysfs tree
fn bench_many_small_entries(c: &mut Criterion) {
    c.bench_function("archive_500_small_entries", |b| {
        let temp_dir = TempDir::new().unwrap();
        let zip_path = temp_dir.path().join("out.zip");
        b.iter(|| {
            let mut archive = ArchiveWriter::create(&zip_path).unwrap();
            for i in 0..500 {
                archive
                    .write_text(&format!("diag/sys/attr_{}", i), "1500\n", None, &mut NullSink)
                    .unwrap();
            }
            archive.finish().unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_file_sizes,
    bench_storage_modes,
    bench_many_small_entries
);
criterion_main!(benches);
