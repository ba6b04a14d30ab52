use super::*;

use crate::device::Accelerator;
use crate::emulator::Emulator;
use crate::kernel::{GroupConfig, LOCAL_CAPACITY};
use crate::pipeline::profile_filter;
use crate::workload::Sample;

fn session() -> Option<WebGpuSession> {
    match WebGpuSession::new() {
        Ok(s) => Some(s),
        Err(BenchError::NoDevice) => None,
        Err(e) => panic!("Unexpected error: {:?}", e),
    }
}

#[test]
fn test_probe_devices_does_not_panic() {
    let devices = probe_devices();
    let _ = devices;
}

#[test]
fn test_kernel_source_specialization() {
    let src = kernel_source(128);
    assert!(src.contains("const WG_SIZE: u32 = 128u;"));
    assert!(!src.contains(WG_SIZE_PLACEHOLDER));
    let capacity = format!("const BUFFSIZE: u32 = {LOCAL_CAPACITY}u;");
    assert!(src.contains(&capacity));
    for variant in [CountVariant::Single, CountVariant::Tree] {
        assert!(src.contains(&format!("fn {}(", variant.entry_point())));
    }
}

#[test]
fn test_gpu_counts_match_emulator() {
    let Some(s) = session() else { return };
    let sample = Sample::random(64 * 1024, 21);
    for variant in [CountVariant::Single, CountVariant::Tree] {
        for local in [64, 128, 256] {
            if local > s.max_work_group_size() {
                continue;
            }
            let cfg = GroupConfig::new(sample.len(), local, variant).unwrap();
            let gpu = s.count_positive(sample.as_slice(), &cfg).unwrap();
            let emu = Emulator::new().count_positive(sample.as_slice(), &cfg).unwrap();
            assert_eq!(gpu, emu, "variant {variant:?}, local {local}");
        }
    }
}

#[test]
fn test_gpu_all_positive() {
    let Some(s) = session() else { return };
    let cfg = GroupConfig::new(64 * 32, 64, CountVariant::Single).unwrap();
    let ones = vec![0.5f32; 64 * 32];
    assert_eq!(s.count_positive(&ones, &cfg).unwrap(), vec![64; 32]);
}

#[test]
fn test_gpu_empty_sample() {
    let Some(s) = session() else { return };
    let cfg = GroupConfig::new(0, 64, CountVariant::Single).unwrap();
    assert!(s.count_positive(&[], &cfg).unwrap().is_empty());
}

#[test]
fn test_gpu_profile_filter() {
    let Some(s) = session() else { return };
    let local = 256.min(s.max_work_group_size());
    let sample = Sample::random(local * 1024, 42);
    let cfg = GroupConfig::new(sample.len(), local, CountVariant::Single).unwrap();
    let prepared = s.prepare(&cfg).unwrap();
    let outcome = profile_filter(&sample, &cfg, &s, &prepared, None).unwrap();
    assert!(outcome.verified);
}

#[test]
fn test_prepared_kernel_reused_across_round_trips() {
    let Some(s) = session() else { return };
    let local = 64.min(s.max_work_group_size());
    let cfg = GroupConfig::new(local * 8, local, CountVariant::Single).unwrap();
    let prepared = s.prepare(&cfg).unwrap();
    for (value, expected) in [(1.0f32, local as i32), (-1.0, 0), (0.5, local as i32)] {
        let sample = Sample::from_vec(vec![value; local * 8]);
        let outcome = profile_filter(&sample, &cfg, &s, &prepared, None).unwrap();
        assert!(outcome.verified);
        assert_eq!(outcome.counts, vec![expected; 8]);
    }
}
