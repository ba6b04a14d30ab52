//! Work-group configuration shared by every counting-kernel backend.
//!
//! The counting kernel stages one local group of the sample into local
//! memory, barriers, and then reduces the staged values to a single count
//! of elements strictly greater than zero. The staging array has a fixed
//! capacity baked into the kernel sources, so the group size is validated
//! here before anything is submitted to a device.

use crate::{BenchError, BenchResult};

/// Capacity of the kernel's local staging array, in elements.
/// Must match `BUFFSIZE` in `kernels/count_positive.cl` and
/// `kernels/count_positive.wgsl`.
pub const LOCAL_CAPACITY: usize = 1024;

/// Default local group size used by the benchmark.
pub const DEFAULT_LOCAL_SIZE: usize = 256;

/// How each group reduces its staged values to a count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CountVariant {
    /// Local index 0 scans the whole staged group sequentially.
    #[default]
    Single,
    /// Pairwise tree reduction over the staged group. Requires a
    /// power-of-two local size.
    Tree,
}

impl CountVariant {
    /// Kernel entry point implementing this variant.
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Single => "count_positive",
            Self::Tree => "count_positive_tree",
        }
    }
}

impl std::str::FromStr for CountVariant {
    type Err = BenchError;

    fn from_str(s: &str) -> BenchResult<Self> {
        match s {
            "single" => Ok(Self::Single),
            "tree" => Ok(Self::Tree),
            other => Err(BenchError::Config(format!(
                "unknown count variant '{other}' (expected 'single' or 'tree')"
            ))),
        }
    }
}

/// Validated partitioning of a sample into local groups.
///
/// Construction is the only place the divisibility and capacity
/// invariants are checked; every backend takes a `GroupConfig` and can
/// rely on `len % local_size == 0` and `local_size <= LOCAL_CAPACITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupConfig {
    len: usize,
    local_size: usize,
    variant: CountVariant,
}

impl GroupConfig {
    /// Validate `local_size` against a sample of `len` elements.
    pub fn new(len: usize, local_size: usize, variant: CountVariant) -> BenchResult<Self> {
        if local_size == 0 {
            return Err(BenchError::Config("local size must be non-zero".into()));
        }
        if local_size > LOCAL_CAPACITY {
            return Err(BenchError::Config(format!(
                "local size {local_size} exceeds local memory capacity {LOCAL_CAPACITY}"
            )));
        }
        if len % local_size != 0 {
            return Err(BenchError::Config(format!(
                "local size {local_size} does not divide sample length {len}"
            )));
        }
        if variant == CountVariant::Tree && !local_size.is_power_of_two() {
            return Err(BenchError::Config(format!(
                "tree reduction needs a power-of-two local size, got {local_size}"
            )));
        }
        Ok(GroupConfig {
            len,
            local_size,
            variant,
        })
    }

    /// Reject group sizes the selected device cannot launch.
    pub fn check_device_limit(&self, max_work_group_size: usize) -> BenchResult<()> {
        if self.local_size > max_work_group_size {
            return Err(BenchError::Config(format!(
                "local size {} exceeds device work-group limit {max_work_group_size}",
                self.local_size
            )));
        }
        Ok(())
    }

    /// Number of work-items (one per sample element).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Work-items per local group.
    pub fn local_size(&self) -> usize {
        self.local_size
    }

    /// Number of local groups, which is also the Partial-Count Buffer length.
    pub fn groups(&self) -> usize {
        self.len / self.local_size
    }

    pub fn variant(&self) -> CountVariant {
        self.variant
    }
}
