//! Staged counting-kernel round trip on the wgpu queue.
//!
//! wgpu has no explicit flush: `Queue::submit` hands work to the device
//! and `Device::poll` with a wait is the finish point.

use super::WebGpuSession;
use crate::device::Accelerator;
use crate::kernel::GroupConfig;
use crate::{BenchError, BenchResult};

/// Counting pipeline compiled ahead of the timed stages.
pub struct WebGpuPipeline {
    pipeline: wgpu::ComputePipeline,
}

/// Device resources for one benchmark call. `bound` is `None` for an
/// empty sample.
pub struct WebGpuStaged {
    bound: Option<BoundPipeline>,
    config: GroupConfig,
}

struct BoundPipeline {
    bind_group: wgpu::BindGroup,
    counts: wgpu::Buffer,
    _input: wgpu::Buffer,
    _params: wgpu::Buffer,
    grid: (u32, u32),
}

impl Accelerator for WebGpuSession {
    type Prepared = WebGpuPipeline;
    type Staged = WebGpuStaged;

    fn label(&self) -> &str {
        "WebGPU"
    }

    fn device_name(&self) -> &str {
        WebGpuSession::device_name(self)
    }

    fn max_work_group_size(&self) -> usize {
        WebGpuSession::max_work_group_size(self)
    }

    fn prepare(&self, config: &GroupConfig) -> BenchResult<WebGpuPipeline> {
        config.check_device_limit(self.max_work_group_size)?;
        Ok(WebGpuPipeline {
            pipeline: self.pipeline(config.local_size(), config.variant()),
        })
    }

    fn copy_in(
        &self,
        prepared: &WebGpuPipeline,
        sample: &[f32],
        config: &GroupConfig,
    ) -> BenchResult<WebGpuStaged> {
        config.check_device_limit(self.max_work_group_size)?;
        if config.is_empty() {
            return Ok(WebGpuStaged {
                bound: None,
                config: *config,
            });
        }

        let groups = config.groups() as u32;
        let grid = self.tile_workgroups(groups)?;

        let input = self.create_buffer(
            "count_input",
            std::mem::size_of_val(sample) as u64,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        );
        let counts = self.create_buffer(
            "count_result",
            (config.groups() * std::mem::size_of::<i32>()) as u64,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        );
        let params = [groups, grid.0, 0, 0];
        let params_buf = self.create_buffer_init(
            "count_params",
            bytemuck::cast_slice(&params),
            wgpu::BufferUsages::UNIFORM,
        );

        self.queue
            .write_buffer(&input, 0, bytemuck::cast_slice(sample));
        // Submit the staged write and wait: the upload must land before
        // the kernel can read it.
        self.queue.submit(std::iter::empty());
        self.poll_wait("write_buffer")?;

        let bg_layout = prepared.pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("count_bg"),
            layout: &bg_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: counts.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buf.as_entire_binding(),
                },
            ],
        });

        Ok(WebGpuStaged {
            bound: Some(BoundPipeline {
                bind_group,
                counts,
                _input: input,
                _params: params_buf,
                grid,
            }),
            config: *config,
        })
    }

    fn launch(&self, prepared: &WebGpuPipeline, staged: &mut WebGpuStaged) -> BenchResult<()> {
        let Some(bound) = &staged.bound else {
            return Ok(());
        };
        let label = staged.config.variant().entry_point();
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            pass.set_pipeline(&prepared.pipeline);
            pass.set_bind_group(0, &bound.bind_group, &[]);
            pass.dispatch_workgroups(bound.grid.0, bound.grid.1, 1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn copy_out(&self, staged: WebGpuStaged) -> BenchResult<Vec<i32>> {
        let Some(bound) = &staged.bound else {
            return Ok(Vec::new());
        };
        let size = (staged.config.groups() * std::mem::size_of::<i32>()) as u64;
        let staging = self.create_buffer(
            "count_staging",
            size,
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("count_read"),
            });
        encoder.copy_buffer_to_buffer(&bound.counts, 0, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.poll_wait("map_async")?;
        rx.recv()
            .map_err(|e| BenchError::Gpu {
                op: "map_async",
                message: e.to_string(),
            })?
            .map_err(|e| BenchError::Gpu {
                op: "map_async",
                message: e.to_string(),
            })?;

        let raw = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(bytemuck::cast_slice(&raw).to_vec())
    }
}
