//! Benchmarks for SMBIOS dump synthesis.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use diag_collector::utils::smbios::{checksum, synthesize_dump};

fn legacy_entry_point(table_len: u16) -> Vec<u8> {
    let mut ep = vec![0u8; 0x1F];
    ep[..4].copy_from_slice(b"_SM_");
    ep[0x05] = 0x1F;
    ep[0x10..0x15].copy_from_slice(b"_DMI_");
    ep[0x16..0x18].copy_from_slice(&table_len.to_le_bytes());
    ep[0x15] = checksum(&ep[0x10..0x1F]);
    ep[0x04] = checksum(&ep);
    ep
}

/// Benchmark synthesis across typical table sizes
fn bench_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("smbios_synthesize");

    for table_len in [1024u16, 8192, 65535] {
        let entry_point = legacy_entry_point(table_len);
        let table = vec![0x5Au8; usize::from(table_len)];
        group.bench_with_input(BenchmarkId::from_parameter(table_len), &table_len, |b, _| {
            b.iter(|| synthesize_dump(black_box(&entry_point), black_box(&table)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_synthesize);
criterion_main!(benches);
