//! Micro-benchmark harness comparing a host-parallel "filter positive
//! elements" pass against an accelerator round trip that counts positive
//! elements per local work-group.
//!
//! The accelerator path is timed in three stages (copy-in, kernel,
//! copy-out) around explicit queue synchronization points; see
//! [`pipeline::profile_filter`].

pub mod device;
pub mod emulator;
pub mod host;
pub mod kernel;
pub mod pipeline;
pub mod report;
pub mod verify;
pub mod workload;

#[cfg(feature = "opencl")]
pub mod opencl;

#[cfg(feature = "webgpu")]
pub mod webgpu;

/// Error types for filterbench operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum BenchError {
    /// Work-group configuration rejected before any device submission.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// No compute platform is installed.
    #[error("unable to find OpenCL platforms")]
    NoPlatform,
    /// A platform exists but exposes no usable device.
    #[error("unable to find a compute device")]
    NoDevice,
    /// Program compilation failed. The build log has already been written
    /// to stderr.
    #[error("program build failed ({code})")]
    Build { code: i32 },
    /// An OpenCL API call failed with a vendor error code.
    #[error("OpenCL error in {op}({code})")]
    OpenCl { op: &'static str, code: i32 },
    /// A device call without a numeric error code failed.
    #[error("GPU error in {op}: {message}")]
    Gpu { op: &'static str, message: String },
    /// The requested backend was not compiled in.
    #[error("unsupported operation")]
    Unsupported,
}

impl BenchError {
    /// Vendor error code carried by device failures, if any.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Build { code } | Self::OpenCl { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type BenchResult<T> = Result<T, BenchError>;

/// Where OpenCL error codes are documented.
pub const CL_ERROR_CODES_URL: &str =
    "https://github.com/KhronosGroup/OpenCL-Headers/blob/master/CL/cl.h";
