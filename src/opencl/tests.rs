use super::*;

use crate::device::Accelerator;
use crate::emulator::Emulator;
use crate::kernel::{CountVariant, GroupConfig, LOCAL_CAPACITY};
use crate::pipeline::profile_filter;
use crate::workload::Sample;

/// Session for device tests, or `None` when no OpenCL device is present.
fn session() -> Option<OpenClSession> {
    match OpenClSession::new() {
        Ok(s) => Some(s),
        Err(BenchError::NoPlatform) | Err(BenchError::NoDevice) => None,
        Err(e) => panic!("Unexpected error: {:?}", e),
    }
}

#[test]
fn test_probe_devices_does_not_panic() {
    // This should never panic, even without OpenCL runtime
    let devices = probe_devices();
    let _ = devices;
}

#[test]
fn test_cl_err_keeps_operation_and_code() {
    let err = cl_err("clEnqueueWriteBuffer")(ClError(-5));
    assert_eq!(
        err,
        BenchError::OpenCl {
            op: "clEnqueueWriteBuffer",
            code: -5
        }
    );
    assert_eq!(err.to_string(), "OpenCL error in clEnqueueWriteBuffer(-5)");
    assert_eq!(err.code(), Some(-5));
}

#[test]
fn test_mapped_error_report_names_call_and_code() {
    let err = cl_err("clCreateBuffer")(ClError(-61));
    let mut out = Vec::new();
    crate::report::write_error(&mut out, &err).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("clCreateBuffer(-61)"), "{text}");
    assert!(text.contains("error code (-61)"), "{text}");
    assert!(text.trim_end().ends_with(crate::CL_ERROR_CODES_URL), "{text}");
}

#[test]
fn test_kernel_source_capacity_matches() {
    let define = format!("#define BUFFSIZE {LOCAL_CAPACITY}");
    assert!(COUNT_KERNEL_SOURCE.contains(&define));
    for entry in ["filter", "count_positive", "count_positive_tree"] {
        assert!(COUNT_KERNEL_SOURCE.contains(&format!("kernel void {entry}(")));
    }
}

// Integration tests that require an actual OpenCL device.
// These are gated on the device being available at runtime.

#[test]
fn test_session_creation() {
    let Some(s) = session() else { return };
    assert!(!s.device_name().is_empty());
    assert!(s.max_work_group_size() > 0);
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
fn test_gpu_all_positive_and_none_positive() {
    let Some(s) = session() else { return };
    let local = 64.min(s.max_work_group_size());
    let cfg = GroupConfig::new(local * 16, local, CountVariant::Single).unwrap();
    let ones = vec![1.0f32; local * 16];
    assert_eq!(s.count_positive(&ones, &cfg).unwrap(), vec![local as i32; 16]);
    let negatives = vec![-1.0f32; local * 16];
    assert_eq!(s.count_positive(&negatives, &cfg).unwrap(), vec![0; 16]);
}

#[test]
fn test_gpu_empty_sample() {
    let Some(s) = session() else { return };
    let cfg = GroupConfig::new(0, 64, CountVariant::Single).unwrap();
    assert!(s.count_positive(&[], &cfg).unwrap().is_empty());
}

#[test]
fn test_gpu_rejects_oversized_group() {
    let Some(s) = session() else { return };
    let too_big = s.max_work_group_size() * 2;
    if too_big > LOCAL_CAPACITY {
        // Capacity check fires first in GroupConfig::new
        return;
    }
    let cfg = GroupConfig::new(too_big * 2, too_big, CountVariant::Single).unwrap();
    assert!(matches!(
        s.count_positive(&vec![1.0; too_big * 2], &cfg),
        Err(BenchError::Config(_))
    ));
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
    assert_eq!(outcome.counts.len(), 1024);
}

#[test]
fn test_filter_stub_records_global_size() {
    let Some(s) = session() else { return };
    assert_eq!(s.filter_stub_work_size(4096).unwrap(), 4096);
    assert!(s.filter_stub_work_size(0).is_err());
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
