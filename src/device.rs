//! The seam between the timed pipeline and a concrete accelerator.
//!
//! A device session is created once and borrowed by every benchmark call.
//! Each call walks the three timed stages in order; the pipeline places
//! its timestamps between them, so every stage must return only after the
//! synchronization point it promises below.

use crate::kernel::GroupConfig;
use crate::{BenchError, BenchResult};

/// A long-lived session able to run the counting kernel.
pub trait Accelerator {
    /// Compiled kernel state for one configuration (kernel object,
    /// pipeline). Created before the timed region and reused by every
    /// stage that needs it.
    type Prepared;

    /// Per-call device resources carried from one stage to the next
    /// (device buffers, bound arguments, launch geometry).
    type Staged;

    /// Short backend label used in report headers, e.g. `"OpenCL"`.
    fn label(&self) -> &str;

    /// Human-readable device name.
    fn device_name(&self) -> &str;

    /// Largest local group the device can launch.
    fn max_work_group_size(&self) -> usize;

    /// Create the kernel (or compile the pipeline) for `config`. Untimed.
    fn prepare(&self, config: &GroupConfig) -> BenchResult<Self::Prepared>;

    /// Allocate the sample copy and the Partial-Count Buffer, upload the
    /// sample, bind kernel arguments and flush the queue.
    ///
    /// The upload is complete when this returns.
    fn copy_in(
        &self,
        prepared: &Self::Prepared,
        sample: &[f32],
        config: &GroupConfig,
    ) -> BenchResult<Self::Staged>;

    /// Enqueue the counting kernel and flush. The kernel may still be
    /// running when this returns.
    fn launch(&self, prepared: &Self::Prepared, staged: &mut Self::Staged) -> BenchResult<()>;

    /// Read the Partial-Count Buffer back, blocking until the data is on
    /// the host.
    fn copy_out(&self, staged: Self::Staged) -> BenchResult<Vec<i32>>;

    /// Untimed round trip through all stages.
    fn count_positive(&self, sample: &[f32], config: &GroupConfig) -> BenchResult<Vec<i32>> {
        let prepared = self.prepare(config)?;
        let mut staged = self.copy_in(&prepared, sample, config)?;
        self.launch(&prepared, &mut staged)?;
        self.copy_out(staged)
    }
}

/// Which accelerator backend the benchmark offloads to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    /// Host simulation of the work-group kernel (always available).
    #[default]
    Emulated,
    /// OpenCL device (requires the `opencl` feature).
    #[cfg(feature = "opencl")]
    OpenCl,
    /// wgpu device (requires the `webgpu` feature).
    #[cfg(feature = "webgpu")]
    WebGpu,
}

impl Backend {
    /// Backend used when none is requested: the first compiled-in device
    /// backend, else the emulator.
    pub fn preferred() -> Self {
        #[cfg(feature = "opencl")]
        return Backend::OpenCl;
        #[cfg(all(not(feature = "opencl"), feature = "webgpu"))]
        return Backend::WebGpu;
        #[cfg(all(not(feature = "opencl"), not(feature = "webgpu")))]
        return Backend::Emulated;
    }
}

impl std::str::FromStr for Backend {
    type Err = BenchError;

    fn from_str(s: &str) -> BenchResult<Self> {
        match s {
            "emulated" | "emu" | "cpu" => Ok(Backend::Emulated),
            #[cfg(feature = "opencl")]
            "opencl" | "cl" => Ok(Backend::OpenCl),
            #[cfg(feature = "webgpu")]
            "webgpu" | "wgpu" => Ok(Backend::WebGpu),
            #[cfg(not(feature = "opencl"))]
            "opencl" | "cl" => Err(BenchError::Unsupported),
            #[cfg(not(feature = "webgpu"))]
            "webgpu" | "wgpu" => Err(BenchError::Unsupported),
            other => Err(BenchError::Config(format!("unknown backend '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse_emulated() {
        assert_eq!("emulated".parse::<Backend>().unwrap(), Backend::Emulated);
        assert_eq!("cpu".parse::<Backend>().unwrap(), Backend::Emulated);
    }

    #[test]
    fn test_backend_parse_unknown() {
        assert!(matches!(
            "cuda".parse::<Backend>(),
            Err(BenchError::Config(_))
        ));
    }

    #[cfg(not(feature = "opencl"))]
    #[test]
    fn test_backend_opencl_not_compiled() {
        assert_eq!("opencl".parse::<Backend>(), Err(BenchError::Unsupported));
    }
}
