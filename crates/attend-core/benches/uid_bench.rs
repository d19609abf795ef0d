//! Criterion benchmarks for card UID normalization and dispatch resolution.
//!
//! Both run once per card tap or frontend request, so they should stay well
//! under a microsecond.
//!
//! Run with:
//! ```bash
//! cargo bench --package attend-core --bench uid_bench
//! ```

use attend_core::{format_uid, DispatchTarget};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_format_uid(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_uid");
    // 4-byte (MIFARE Classic), 7-byte (NTAG), 10-byte (triple-size) UIDs.
    for len in [4usize, 7, 10] {
        let uid: Vec<u8> = (0..len as u8).collect();
        group.bench_with_input(BenchmarkId::from_parameter(len), &uid, |b, uid| {
            b.iter(|| format_uid(black_box(uid)))
        });
    }
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    c.bench_function("resolve/member.findByUid", |b| {
        b.iter(|| DispatchTarget::resolve(black_box("member"), black_box("findByUid")))
    });
    c.bench_function("resolve/unknown_model", |b| {
        b.iter(|| DispatchTarget::resolve(black_box("invoice"), black_box("create")))
    });
}

criterion_group!(benches, bench_format_uid, bench_resolve);
criterion_main!(benches);
