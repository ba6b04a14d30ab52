#![allow(dead_code)]

use criterion::measurement::WallTime;
use criterion::BenchmarkGroup;
use filterbench::workload::{Sample, DEFAULT_SEED};
use std::time::Duration;

/// Sizes for host and emulated paths.
pub const SIZES_ALL: &[usize] = &[65_536, 1_048_576, 4_194_304];
/// Device sizes: below the crossover, the default, and well above it.
pub const SIZES_DEVICE: &[usize] = &[262_144, 1_048_576, 16_777_216];
/// Local sizes swept for the counting kernel.
pub const LOCAL_SIZES: &[usize] = &[64, 256, 1024];

pub fn cap(group: &mut BenchmarkGroup<'_, WallTime>) {
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(10);
}

pub fn get_test_data(size: usize) -> Sample {
    Sample::random(size, DEFAULT_SEED)
}

/// Bytes touched by one filter pass: read the sample, write the
/// filtered copy and the counts.
pub fn pass_bytes(size: usize) -> u64 {
    3 * (size * std::mem::size_of::<f32>()) as u64
}
