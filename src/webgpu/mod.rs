//! WebGPU (wgpu) device session.
//!
//! Runs the same counting kernel as the OpenCL backend, written in WGSL,
//! on any adapter wgpu supports (Vulkan, Metal, DX12). The workgroup size
//! is a compile-time constant in WGSL, so one pipeline is compiled per
//! (local size, variant) pair on first use and cached.
//!
//! # Feature Gate
//!
//! This module is only available when compiled with the `webgpu` feature:
//! ```bash
//! cargo build --features webgpu
//! ```

use crate::kernel::CountVariant;
use crate::{BenchError, BenchResult};

use std::collections::HashMap;
use std::sync::Mutex;

use wgpu::util::DeviceExt;

mod count;

pub use count::{WebGpuPipeline, WebGpuStaged};

#[cfg(test)]
#[path = "tests.rs"]
mod tests;

/// Embedded WGSL kernel source. `{{WG_SIZE}}` is replaced with the local
/// size before compilation.
const COUNT_KERNEL_SOURCE: &str = include_str!("../../kernels/count_positive.wgsl");

/// Placeholder for the workgroup size in [`COUNT_KERNEL_SOURCE`].
const WG_SIZE_PLACEHOLDER: &str = "{{WG_SIZE}}";

/// Information about a discovered WebGPU device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Device vendor string.
    pub vendor: String,
    /// Whether this is a discrete or integrated GPU.
    pub is_gpu: bool,
    /// Maximum workgroup size.
    pub max_work_group_size: usize,
}

/// Probe all available WebGPU devices without creating a session.
pub fn probe_devices() -> Vec<DeviceInfo> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapters = instance.enumerate_adapters(wgpu::Backends::all());
    adapters
        .into_iter()
        .map(|adapter| {
            let info = adapter.get_info();
            let limits = adapter.limits();
            DeviceInfo {
                name: info.name.clone(),
                vendor: format!("{:?}", info.vendor),
                is_gpu: matches!(
                    info.device_type,
                    wgpu::DeviceType::DiscreteGpu | wgpu::DeviceType::IntegratedGpu
                ),
                max_work_group_size: workgroup_limit(&limits),
            }
        })
        .collect()
}

/// Largest 1D workgroup the limits allow.
fn workgroup_limit(limits: &wgpu::Limits) -> usize {
    limits
        .max_compute_workgroup_size_x
        .min(limits.max_compute_invocations_per_workgroup) as usize
}

/// WebGPU device session.
pub struct WebGpuSession {
    device: wgpu::Device,
    queue: wgpu::Queue,
    /// Compiled counting pipelines keyed by (local size, variant).
    pipelines: Mutex<HashMap<(usize, CountVariant), wgpu::ComputePipeline>>,
    /// Device name for diagnostics.
    device_name: String,
    /// Maximum compute workgroup size.
    max_work_group_size: usize,
    /// Maximum workgroups per dispatch dimension (typically 65535).
    max_workgroups_per_dim: u32,
}

impl std::fmt::Debug for WebGpuSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebGpuSession")
            .field("device_name", &self.device_name)
            .field("max_work_group_size", &self.max_work_group_size)
            .finish_non_exhaustive()
    }
}

impl WebGpuSession {
    /// Create a session on the highest-performance adapter.
    pub fn new() -> BenchResult<Self> {
        Self::create(true)
    }

    /// Create a session with explicit GPU preference.
    pub fn with_device_preference(prefer_gpu: bool) -> BenchResult<Self> {
        Self::create(prefer_gpu)
    }

    fn create(prefer_gpu: bool) -> BenchResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let power_pref = if prefer_gpu {
            wgpu::PowerPreference::HighPerformance
        } else {
            wgpu::PowerPreference::None
        };

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: power_pref,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .map_err(|_| BenchError::NoDevice)?;

        let info = adapter.get_info();
        let device_name = info.name.clone();
        log::info!("Adapter: {device_name} ({:?})", info.backend);

        // Software adapters are too slow to be a meaningful comparison.
        if prefer_gpu && matches!(info.device_type, wgpu::DeviceType::Cpu) {
            return Err(BenchError::NoDevice);
        }

        // Request the adapter's own limits so local sizes up to the
        // hardware maximum can be launched.
        let limits = adapter.limits();
        let max_work_group_size = workgroup_limit(&limits);
        let max_workgroups_per_dim = limits.max_compute_workgroups_per_dimension;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("filterbench-webgpu"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::Performance,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| BenchError::Gpu {
            op: "request_device",
            message: e.to_string(),
        })?;

        Ok(WebGpuSession {
            device,
            queue,
            pipelines: Mutex::new(HashMap::new()),
            device_name,
            max_work_group_size,
            max_workgroups_per_dim,
        })
    }

    /// Return the name of the selected compute device.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Return the maximum work-group size for the device.
    pub fn max_work_group_size(&self) -> usize {
        self.max_work_group_size
    }

    /// Block the host until all submitted GPU work completes.
    fn poll_wait(&self, op: &'static str) -> BenchResult<()> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| BenchError::Gpu {
                op,
                message: e.to_string(),
            })
    }

    fn create_buffer_init(
        &self,
        label: &str,
        data: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: data,
                usage,
            })
    }

    fn create_buffer(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    /// Split `workgroups` over a 2D grid when it exceeds the per-dimension
    /// dispatch limit. Returns `(x, y)` workgroup counts.
    fn tile_workgroups(&self, workgroups: u32) -> BenchResult<(u32, u32)> {
        let max = self.max_workgroups_per_dim;
        if workgroups <= max {
            Ok((workgroups, 1))
        } else {
            let wy = workgroups.div_ceil(max);
            if wy > max {
                return Err(BenchError::Config(format!(
                    "{workgroups} workgroups exceed the dispatch grid limit"
                )));
            }
            Ok((max, wy))
        }
    }

    /// Compiled counting pipeline for `local_size`, compiling on first use.
    fn pipeline(&self, local_size: usize, variant: CountVariant) -> wgpu::ComputePipeline {
        let mut cache = self
            .pipelines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cache
            .entry((local_size, variant))
            .or_insert_with(|| {
                let t0 = std::time::Instant::now();
                let source = kernel_source(local_size);
                let label = variant.entry_point();
                let module = self
                    .device
                    .create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some(label),
                        source: wgpu::ShaderSource::Wgsl(source.into()),
                    });
                let pipeline =
                    self.device
                        .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                            label: Some(label),
                            layout: None,
                            module: &module,
                            entry_point: Some(label),
                            compilation_options: Default::default(),
                            cache: None,
                        });
                log::debug!(
                    "[webgpu] compile {label} (local size {local_size}): {:.3} ms",
                    t0.elapsed().as_secs_f64() * 1000.0
                );
                pipeline
            })
            .clone()
    }
}

/// WGSL source specialized for a workgroup of `local_size` invocations.
fn kernel_source(local_size: usize) -> String {
    COUNT_KERNEL_SOURCE.replace(WG_SIZE_PLACEHOLDER, &local_size.to_string())
}
