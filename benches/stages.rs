//! Host-side stage benchmarks.
//!
//! Times the rayon filter, the host per-group reference count and the
//! emulated work-group kernel at multiple sample sizes, so the device
//! numbers from `stages_device` have a host baseline to compare against.
//!
//! All groups enforce warm_up_time(2s) + measurement_time(5s) + sample_size(10)
//! to keep total runtime bounded.

#[path = "stages_common.rs"]
mod stages_common;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use filterbench::device::Accelerator;
use filterbench::emulator::Emulator;
use filterbench::host;
use filterbench::kernel::{CountVariant, GroupConfig, DEFAULT_LOCAL_SIZE};
use stages_common::{cap, get_test_data, pass_bytes, LOCAL_SIZES, SIZES_ALL};

fn bench_host_filter(c: &mut Criterion) {
    let single = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap();

    let mut group = c.benchmark_group("host_filter");
    cap(&mut group);
    for &size in SIZES_ALL {
        let data = get_test_data(size);
        group.throughput(Throughput::Bytes(pass_bytes(size)));

        group.bench_with_input(BenchmarkId::new("parallel", size), &data, |b, data| {
            b.iter(|| host::filter_positive(data.as_slice()));
        });

        // Single worker, for the parallel speedup.
        group.bench_with_input(BenchmarkId::new("one_thread", size), &data, |b, data| {
            b.iter(|| single.install(|| host::filter_positive(data.as_slice())));
        });
    }
    group.finish();
}

fn bench_host_group_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("host_group_counts");
    cap(&mut group);
    for &size in SIZES_ALL {
        let data = get_test_data(size);
        group.throughput(Throughput::Bytes((size * 4) as u64));
        group.bench_with_input(BenchmarkId::new("count", size), &data, |b, data| {
            b.iter(|| host::count_positive_per_group(data.as_slice(), DEFAULT_LOCAL_SIZE));
        });
    }
    group.finish();
}

fn bench_emulated_kernel(c: &mut Criterion) {
    let emulator = Emulator::new();
    let size = 1_048_576;
    let data = get_test_data(size);

    let mut group = c.benchmark_group("emulated_kernel");
    cap(&mut group);
    group.throughput(Throughput::Bytes((size * 4) as u64));
    for variant in [CountVariant::Single, CountVariant::Tree] {
        for &local in LOCAL_SIZES {
            let config = match GroupConfig::new(size, local, variant) {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprintln!("stages: skipping {variant:?}/{local}: {e}");
                    continue;
                }
            };
            let id = format!("{}/{local}", variant.entry_point());
            group.bench_with_input(BenchmarkId::new(id, size), &data, |b, data| {
                b.iter(|| emulator.count_positive(data.as_slice(), &config).unwrap());
            });
        }
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_host_filter,
    bench_host_group_counts,
    bench_emulated_kernel
);
criterion_main!(benches);
