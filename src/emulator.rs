//! Host simulation of the counting kernel.
//!
//! Reproduces the work-group structure of `kernels/count_positive.cl`
//! step by step: each group stages its slice into a `LOCAL_CAPACITY`
//! array, crosses the barrier, and then a single designated work-item (or
//! the tree reduction) produces the group's count. Groups run in parallel
//! on the rayon pool, mirroring independent work-groups on a device.
//!
//! The emulator is the always-available backend and the reference every
//! device backend is checked against.

use rayon::prelude::*;

use crate::device::Accelerator;
use crate::host::is_positive;
use crate::kernel::{CountVariant, GroupConfig, LOCAL_CAPACITY};
use crate::BenchResult;

/// Work-group limit reported by the emulator. Matches the staging
/// capacity so every valid `GroupConfig` can be launched.
const EMULATED_MAX_WORK_GROUP_SIZE: usize = LOCAL_CAPACITY;

/// Emulated device session.
#[derive(Debug, Clone, Default)]
pub struct Emulator {
    _private: (),
}

/// "Device" buffers for one emulated call.
#[derive(Debug)]
pub struct EmulatedStaged {
    input: Vec<f32>,
    counts: Vec<i32>,
    config: GroupConfig,
}

impl Emulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Accelerator for Emulator {
    type Prepared = ();
    type Staged = EmulatedStaged;

    fn label(&self) -> &str {
        "emulated"
    }

    fn device_name(&self) -> &str {
        "host emulator"
    }

    fn max_work_group_size(&self) -> usize {
        EMULATED_MAX_WORK_GROUP_SIZE
    }

    fn prepare(&self, config: &GroupConfig) -> BenchResult<()> {
        config.check_device_limit(self.max_work_group_size())
    }

    fn copy_in(
        &self,
        _prepared: &(),
        sample: &[f32],
        config: &GroupConfig,
    ) -> BenchResult<EmulatedStaged> {
        Ok(EmulatedStaged {
            input: sample.to_vec(),
            counts: vec![0; config.groups()],
            config: *config,
        })
    }

    fn launch(&self, _prepared: &(), staged: &mut EmulatedStaged) -> BenchResult<()> {
        let local_size = staged.config.local_size();
        let variant = staged.config.variant();
        staged
            .input
            .par_chunks_exact(local_size)
            .zip(staged.counts.par_iter_mut())
            .for_each(|(group, slot)| *slot = run_group(group, variant));
        Ok(())
    }

    fn copy_out(&self, staged: EmulatedStaged) -> BenchResult<Vec<i32>> {
        Ok(staged.counts)
    }
}

/// Execute one work-group of the counting kernel.
///
/// `group.len()` is the local size and never exceeds `LOCAL_CAPACITY`.
fn run_group(group: &[f32], variant: CountVariant) -> i32 {
    let m = group.len();
    let mut buff = [0.0f32; LOCAL_CAPACITY];

    // Every work-item t stores its element into local memory.
    for (t, &x) in group.iter().enumerate() {
        buff[t] = x;
    }

    // Barrier: all stores above are visible to every work-item below.

    match variant {
        CountVariant::Single => {
            // Work-item 0 scans the staged group.
            let mut cnt = 0;
            for &x in &buff[..m] {
                if is_positive(x) {
                    cnt += 1;
                }
            }
            cnt
        }
        CountVariant::Tree => {
            let mut flags = [0i32; LOCAL_CAPACITY];
            for t in 0..m {
                flags[t] = i32::from(is_positive(buff[t]));
            }
            // Each round halves the active work-items; a barrier separates
            // rounds on the device.
            let mut stride = m / 2;
            while stride > 0 {
                for t in 0..stride {
                    flags[t] += flags[t + stride];
                }
                stride /= 2;
            }
            flags[0]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::count_positive_per_group;
    use crate::workload::Sample;

    fn run(sample: &[f32], local_size: usize, variant: CountVariant) -> Vec<i32> {
        let cfg = GroupConfig::new(sample.len(), local_size, variant).unwrap();
        Emulator::new().count_positive(sample, &cfg).unwrap()
    }

    #[test]
    fn test_sum_matches_host_count() {
        let sample = Sample::random(16 * 1024, 11);
        let expected = sample.as_slice().iter().filter(|&&x| x > 0.0).count() as i32;
        for variant in [CountVariant::Single, CountVariant::Tree] {
            let counts = run(sample.as_slice(), 256, variant);
            assert_eq!(counts.len(), 64);
            assert_eq!(counts.iter().sum::<i32>(), expected);
        }
    }

    #[test]
    fn test_matches_host_per_group() {
        let sample = Sample::random(8 * 1024, 5);
        for local in [1, 2, 64, 256, 1024] {
            let host = count_positive_per_group(sample.as_slice(), local);
            assert_eq!(run(sample.as_slice(), local, CountVariant::Single), host);
            assert_eq!(run(sample.as_slice(), local, CountVariant::Tree), host);
        }
    }

    #[test]
    fn test_aggregate_independent_of_local_size() {
        let sample = Sample::random(3 * 1024, 9);
        let totals: Vec<i32> = [1, 3, 8, 96, 512, 1024]
            .iter()
            .map(|&l| run(sample.as_slice(), l, CountVariant::Single).iter().sum())
            .collect();
        assert!(totals.windows(2).all(|w| w[0] == w[1]), "{totals:?}");
    }

    #[test]
    fn test_no_positive_elements() {
        let sample = vec![-1.0f32; 1024];
        let counts = run(&sample, 128, CountVariant::Single);
        assert!(counts.iter().all(|&c| c == 0));
        let zeros = vec![0.0f32; 1024];
        let counts = run(&zeros, 128, CountVariant::Tree);
        assert!(counts.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_all_positive_elements() {
        let sample = vec![0.25f32; 2048];
        for variant in [CountVariant::Single, CountVariant::Tree] {
            let counts = run(&sample, 256, variant);
            assert_eq!(counts, vec![256; 8]);
        }
    }

    #[test]
    fn test_empty_sample() {
        assert!(run(&[], 256, CountVariant::Single).is_empty());
    }

    #[test]
    fn test_local_size_at_capacity() {
        let sample = vec![1.0f32; LOCAL_CAPACITY * 2];
        let counts = run(&sample, LOCAL_CAPACITY, CountVariant::Single);
        assert_eq!(counts, vec![LOCAL_CAPACITY as i32; 2]);
    }
}
