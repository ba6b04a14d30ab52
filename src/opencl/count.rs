//! Staged counting-kernel round trip on the OpenCL queue.

use std::ptr;

use opencl3::event::Event;
use opencl3::kernel::Kernel;
use opencl3::memory::{Buffer, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE, CL_MEM_WRITE_ONLY};
use opencl3::types::{cl_float, cl_int, CL_BLOCKING, CL_NON_BLOCKING};

use super::{cl_err, OpenClSession};
use crate::device::Accelerator;
use crate::kernel::GroupConfig;
use crate::{BenchError, BenchResult};

/// Counting kernel created ahead of the timed stages.
pub struct OpenClKernel {
    kernel: Kernel,
}

/// Device resources for one benchmark call.
///
/// `bound` is `None` for an empty sample: OpenCL cannot allocate
/// zero-sized buffers, and there is nothing to launch.
pub struct OpenClStaged {
    bound: Option<BoundKernel>,
    config: GroupConfig,
    /// Completed or in-flight commands, kept for profiling.
    events: Vec<(&'static str, Event)>,
}

struct BoundKernel {
    _input: Buffer<cl_float>,
    counts: Buffer<cl_int>,
}

impl Accelerator for OpenClSession {
    type Prepared = OpenClKernel;
    type Staged = OpenClStaged;

    fn label(&self) -> &str {
        "OpenCL"
    }

    fn device_name(&self) -> &str {
        OpenClSession::device_name(self)
    }

    fn max_work_group_size(&self) -> usize {
        OpenClSession::max_work_group_size(self)
    }

    fn prepare(&self, config: &GroupConfig) -> BenchResult<OpenClKernel> {
        config.check_device_limit(self.max_work_group_size)?;
        let kernel = Kernel::create(&self.program, config.variant().entry_point())
            .map_err(cl_err("clCreateKernel"))?;
        Ok(OpenClKernel { kernel })
    }

    fn copy_in(
        &self,
        prepared: &OpenClKernel,
        sample: &[f32],
        config: &GroupConfig,
    ) -> BenchResult<OpenClStaged> {
        config.check_device_limit(self.max_work_group_size)?;
        let mut staged = OpenClStaged {
            bound: None,
            config: *config,
            events: Vec::new(),
        };
        if config.is_empty() {
            return Ok(staged);
        }

        let mut input = unsafe {
            Buffer::<cl_float>::create(
                &self.context,
                CL_MEM_READ_ONLY,
                config.len(),
                ptr::null_mut(),
            )
            .map_err(cl_err("clCreateBuffer"))?
        };
        let counts = unsafe {
            Buffer::<cl_int>::create(
                &self.context,
                CL_MEM_READ_WRITE,
                config.groups(),
                ptr::null_mut(),
            )
            .map_err(cl_err("clCreateBuffer"))?
        };

        let write_event = unsafe {
            self.queue
                .enqueue_write_buffer(&mut input, CL_NON_BLOCKING, 0, sample, &[])
                .map_err(cl_err("clEnqueueWriteBuffer"))?
        };
        // The upload must land before the kernel can read it.
        self.queue.finish().map_err(cl_err("clFinish"))?;
        staged.events.push(("copy-in", write_event));

        let kernel = &prepared.kernel;
        unsafe {
            kernel.set_arg(0, &input).map_err(cl_err("clSetKernelArg"))?;
            kernel.set_arg(1, &counts).map_err(cl_err("clSetKernelArg"))?;
        }
        self.queue.flush().map_err(cl_err("clFlush"))?;

        staged.bound = Some(BoundKernel {
            _input: input,
            counts,
        });
        Ok(staged)
    }

    fn launch(&self, prepared: &OpenClKernel, staged: &mut OpenClStaged) -> BenchResult<()> {
        if staged.bound.is_none() {
            return Ok(());
        }
        let global = [staged.config.len()];
        let local = [staged.config.local_size()];
        let kernel_event = unsafe {
            self.queue
                .enqueue_nd_range_kernel(
                    prepared.kernel.get(),
                    1,
                    ptr::null(),
                    global.as_ptr(),
                    local.as_ptr(),
                    &[],
                )
                .map_err(cl_err("clEnqueueNDRangeKernel"))?
        };
        self.queue.flush().map_err(cl_err("clFlush"))?;
        staged.events.push(("kernel", kernel_event));
        Ok(())
    }

    fn copy_out(&self, mut staged: OpenClStaged) -> BenchResult<Vec<i32>> {
        let Some(bound) = &staged.bound else {
            return Ok(Vec::new());
        };
        let mut counts = vec![0 as cl_int; staged.config.groups()];
        // In-order queue: the blocking read also waits for the kernel.
        let read_event = unsafe {
            self.queue
                .enqueue_read_buffer(&bound.counts, CL_BLOCKING, 0, &mut counts, &[])
                .map_err(cl_err("clEnqueueReadBuffer"))?
        };
        staged.events.push(("copy-out", read_event));

        for (label, event) in &staged.events {
            self.profile_event(label, event);
        }
        Ok(counts)
    }
}

impl OpenClSession {
    /// Launch the `filter` stub over `n` work-items and return the global
    /// work size it recorded.
    ///
    /// A cheap end-to-end probe that the program was built and a kernel
    /// can write device memory.
    pub fn filter_stub_work_size(&self, n: usize) -> BenchResult<i32> {
        if n == 0 {
            return Err(BenchError::Config("filter probe needs n > 0".into()));
        }
        let kernel = Kernel::create(&self.program, "filter").map_err(cl_err("clCreateKernel"))?;
        let input = unsafe {
            Buffer::<cl_float>::create(&self.context, CL_MEM_READ_ONLY, n, ptr::null_mut())
                .map_err(cl_err("clCreateBuffer"))?
        };
        let res_size = unsafe {
            Buffer::<cl_int>::create(&self.context, CL_MEM_WRITE_ONLY, 1, ptr::null_mut())
                .map_err(cl_err("clCreateBuffer"))?
        };
        let result = unsafe {
            Buffer::<cl_float>::create(&self.context, CL_MEM_WRITE_ONLY, n, ptr::null_mut())
                .map_err(cl_err("clCreateBuffer"))?
        };
        unsafe {
            kernel.set_arg(0, &input).map_err(cl_err("clSetKernelArg"))?;
            kernel.set_arg(1, &res_size).map_err(cl_err("clSetKernelArg"))?;
            kernel.set_arg(2, &result).map_err(cl_err("clSetKernelArg"))?;
        }
        let global = [n];
        let kernel_event = unsafe {
            self.queue
                .enqueue_nd_range_kernel(
                    kernel.get(),
                    1,
                    ptr::null(),
                    global.as_ptr(),
                    ptr::null(),
                    &[],
                )
                .map_err(cl_err("clEnqueueNDRangeKernel"))?
        };
        kernel_event.wait().map_err(cl_err("clWaitForEvents"))?;

        let mut out = [0 as cl_int; 1];
        unsafe {
            self.queue
                .enqueue_read_buffer(&res_size, CL_BLOCKING, 0, &mut out, &[])
                .map_err(cl_err("clEnqueueReadBuffer"))?;
        }
        Ok(out[0])
    }
}
