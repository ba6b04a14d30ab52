//! OpenCL device session.
//!
//! Owns the platform, device, context, compiled counting program and the
//! in-order command queue. Build one session at startup and borrow it for
//! every benchmark call; each call allocates its own buffers.
//!
//! # Feature Gate
//!
//! This module is only available when compiled with the `opencl` feature:
//! ```bash
//! cargo build --features opencl
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! # #[cfg(feature = "opencl")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use filterbench::device::Accelerator;
//! use filterbench::kernel::{CountVariant, GroupConfig};
//! use filterbench::opencl::OpenClSession;
//!
//! let session = OpenClSession::new()?;
//! println!("Using device: {}", session.device_name());
//!
//! let sample = vec![1.0f32, -1.0, 2.0, -2.0];
//! let config = GroupConfig::new(sample.len(), 2, CountVariant::Single)?;
//! let counts = session.count_positive(&sample, &config)?;
//! assert_eq!(counts, vec![1, 1]);
//! # Ok(())
//! # }
//! ```

use crate::{BenchError, BenchResult};

use opencl3::command_queue::{CommandQueue, CL_QUEUE_PROFILING_ENABLE};
use opencl3::context::Context;
use opencl3::device::{Device, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_GPU};
use opencl3::error_codes::ClError;
use opencl3::event::Event;
use opencl3::platform::get_platforms;
use opencl3::program::Program;
use opencl3::types::{cl_device_id, cl_device_type};

mod count;

pub use count::{OpenClKernel, OpenClStaged};

#[cfg(test)]
#[path = "tests.rs"]
mod tests;

/// Embedded OpenCL program: `filter` stub, `count_positive` and
/// `count_positive_tree`.
const COUNT_KERNEL_SOURCE: &str = include_str!("../../kernels/count_positive.cl");

/// Build options for the counting program.
const BUILD_OPTIONS: &str = "-Werror";

/// Map an OpenCL failure to a device error naming the failing call.
pub(crate) fn cl_err(op: &'static str) -> impl Fn(ClError) -> BenchError {
    move |e| BenchError::OpenCl { op, code: e.0 }
}

/// Information about a discovered OpenCL device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Name of the platform exposing the device.
    pub platform: String,
    /// Human-readable device name (e.g. "NVIDIA GeForce RTX 3080").
    pub name: String,
    /// Device vendor string.
    pub vendor: String,
    /// Whether this is a GPU device (vs CPU or accelerator).
    pub is_gpu: bool,
    /// Maximum work-group size supported by the device.
    pub max_work_group_size: usize,
    /// Global memory size in bytes.
    pub global_mem_size: u64,
}

/// Probe all available OpenCL devices without creating a session.
///
/// Returns an empty vec if no OpenCL runtime is installed or no
/// devices are found (never errors).
pub fn probe_devices() -> Vec<DeviceInfo> {
    let Ok(platforms) = get_platforms() else {
        return Vec::new();
    };

    let mut infos = Vec::new();
    for platform in platforms {
        let platform_name = platform.name().unwrap_or_default().trim().to_string();
        let ids = platform.get_devices(CL_DEVICE_TYPE_ALL).unwrap_or_default();
        for id in ids {
            let dev = Device::new(id);
            let dev_type: cl_device_type = dev.dev_type().unwrap_or(0);
            infos.push(DeviceInfo {
                platform: platform_name.clone(),
                name: dev.name().unwrap_or_default().trim().to_string(),
                vendor: dev.vendor().unwrap_or_default().trim().to_string(),
                is_gpu: (dev_type & CL_DEVICE_TYPE_GPU) != 0,
                max_work_group_size: dev.max_work_group_size().unwrap_or(1),
                global_mem_size: dev.global_mem_size().unwrap_or(0),
            });
        }
    }
    infos
}

/// OpenCL device session.
///
/// Note: `Debug` is implemented manually because the OpenCL handle
/// types from `opencl3` don't implement `Debug`.
pub struct OpenClSession {
    _device: Device,
    context: Context,
    program: Program,
    queue: CommandQueue,
    /// Platform name for diagnostics.
    platform_name: String,
    /// Device name for diagnostics.
    device_name: String,
    /// Maximum work-group size.
    max_work_group_size: usize,
    /// Whether the queue was created with `CL_QUEUE_PROFILING_ENABLE`.
    profiling: bool,
}

// SAFETY: OpenCL 1.2+ guarantees thread safety for context, command queue,
// program and memory objects. The raw pointers in opencl3 types are opaque
// handles to the OpenCL runtime, which serializes access internally.
unsafe impl Send for OpenClSession {}
unsafe impl Sync for OpenClSession {}

impl std::fmt::Debug for OpenClSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenClSession")
            .field("platform_name", &self.platform_name)
            .field("device_name", &self.device_name)
            .field("max_work_group_size", &self.max_work_group_size)
            .finish_non_exhaustive()
    }
}

impl OpenClSession {
    /// Create a session on the first platform, preferring GPU devices.
    pub fn new() -> BenchResult<Self> {
        Self::create(true, false)
    }

    /// Create a session with explicit GPU preference, optionally with a
    /// queue that records device-side timestamps.
    ///
    /// With `prefer_gpu == false` the first usable device of any type is
    /// taken. Per-command device times are logged at debug level after
    /// each copy-out when `profiling` is set.
    pub fn with_options(prefer_gpu: bool, profiling: bool) -> BenchResult<Self> {
        Self::create(prefer_gpu, profiling)
    }

    fn create(prefer_gpu: bool, profiling: bool) -> BenchResult<Self> {
        let platforms = get_platforms().map_err(|_| BenchError::NoPlatform)?;
        let platform = platforms.first().ok_or(BenchError::NoPlatform)?;
        let platform_name = platform.name().unwrap_or_default().trim().to_string();
        log::info!("Platform name: {platform_name}");

        // Candidate list: GPUs with the most global memory first (discrete
        // before integrated), then every device on the platform.
        let mut gpu_ids: Vec<cl_device_id> = if prefer_gpu {
            platform.get_devices(CL_DEVICE_TYPE_GPU).unwrap_or_default()
        } else {
            Vec::new()
        };
        gpu_ids.sort_by(|a, b| {
            let mem_a = Device::new(*a).global_mem_size().unwrap_or(0);
            let mem_b = Device::new(*b).global_mem_size().unwrap_or(0);
            mem_b.cmp(&mem_a)
        });
        let all_ids = platform.get_devices(CL_DEVICE_TYPE_ALL).unwrap_or_default();
        let candidates: Vec<cl_device_id> = gpu_ids.into_iter().chain(all_ids).collect();

        let queue_props = if profiling {
            CL_QUEUE_PROFILING_ENABLE
        } else {
            0
        };

        // Use the OpenCL 1.2 queue API; macOS only supports OpenCL 1.2.
        let mut selected = None;
        for &id in &candidates {
            let dev = Device::new(id);
            let Ok(ctx) = Context::from_device(&dev) else {
                continue;
            };
            #[allow(deprecated)]
            let Ok(q) = CommandQueue::create_default(&ctx, queue_props) else {
                continue;
            };
            selected = Some((dev, ctx, q));
            break;
        }
        let (device, context, queue) = selected.ok_or(BenchError::NoDevice)?;

        let device_name = device.name().unwrap_or_default().trim().to_string();
        let max_work_group_size = device.max_work_group_size().unwrap_or(1);
        log::info!("Device name: {device_name}");

        let program = build_program(&context)?;

        Ok(OpenClSession {
            _device: device,
            context,
            program,
            queue,
            platform_name,
            device_name,
            max_work_group_size,
            profiling,
        })
    }

    /// Return the name of the selected platform.
    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    /// Return the name of the selected compute device.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Return the maximum work-group size for the device.
    pub fn max_work_group_size(&self) -> usize {
        self.max_work_group_size
    }

    /// Extract elapsed time in milliseconds from a completed OpenCL event.
    ///
    /// Requires the command queue to have been created with
    /// `CL_QUEUE_PROFILING_ENABLE`. Returns `None` if profiling is
    /// disabled or the event doesn't have timing data.
    pub fn event_elapsed_ms(event: &Event) -> Option<f64> {
        let start = event.profiling_command_start().ok()?;
        let end = event.profiling_command_end().ok()?;
        Some((end - start) as f64 / 1_000_000.0)
    }

    /// Log device-side timing for a completed event when profiling is
    /// enabled.
    fn profile_event(&self, label: &str, event: &Event) {
        if self.profiling {
            if let Some(ms) = Self::event_elapsed_ms(event) {
                log::debug!("[opencl] {label}: {ms:.3} ms");
            }
        }
    }
}

/// Compile the counting program for every device in `context`.
///
/// On failure the build log of each device is written to stderr before
/// the error is returned.
fn build_program(context: &Context) -> BenchResult<Program> {
    let mut program = Program::create_from_source(context, COUNT_KERNEL_SOURCE)
        .map_err(cl_err("clCreateProgramWithSource"))?;
    if let Err(e) = program.build(context.devices(), BUILD_OPTIONS) {
        for &device in context.devices() {
            match program.get_build_log(device) {
                Ok(log) => eprint!("{log}"),
                Err(log_err) => eprintln!("build log unavailable ({})", log_err.0),
            }
        }
        return Err(BenchError::Build { code: e.0 });
    }
    Ok(program)
}
