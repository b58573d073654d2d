// gpu/convolve.rs — GPU convolution backend.
//
// Mirrors the scalar reference in convolve.rs: same coefficients, same
// replicate border policy, one work-item per output pixel. The pipeline is
// compiled once per run; each image pays only buffer allocation, transfer
// and dispatch.
//
// Per-image flow:
//   1. Compact the input rows into a staging Vec<f32> (stride stripped).
//   2. Upload input + kernel coefficients (storage buffers) and the
//      {width, height, kernel_size} params uniform.
//   3. Dispatch a ceiling-divided 2D grid covering every output pixel.
//   4. Block until the device finishes (map_async + poll(Wait)) and read
//      the result buffer back.
//
// There is no fallback to the scalar path on device failure and no timeout
// on the blocking wait: setup errors abort the whole run.

use wgpu::util::DeviceExt;

use crate::convolve::{ConvolveError, Convolver};
use crate::gpu::device::{GpuDevice, GpuError};
use crate::image::Image;
use crate::kernel::EdgeKernel;

/// Scalar parameters uploaded as a uniform buffer.
///
/// Layout must match `Params` in `convolve.wgsl`:
///   offset 0: width       (u32)
///   offset 4: height      (u32)
///   offset 8: kernel_size (u32)
///   offset 12: _pad       (u32)
///   total: 16 bytes
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ConvolveParams {
    width: u32,
    height: u32,
    kernel_size: u32,
    _pad: u32,
}

/// GPU-dispatched convolution backend.
///
/// Owns the device session and the compiled compute pipeline for the whole
/// run. Create once via [`GpuConvolver::new`]; every
/// [`Convolver::convolve`] call reuses the pipeline.
pub struct GpuConvolver {
    gpu: GpuDevice,
    pipeline: wgpu::ComputePipeline,
    bgl: wgpu::BindGroupLayout,
}

impl GpuConvolver {
    /// Initialize a device session and compile the convolution program.
    ///
    /// # Errors
    /// Fatal setup errors: no GPU-class adapter, device request failure,
    /// shader build failure (with the compiler's diagnostic log), pipeline
    /// creation failure.
    pub fn new() -> Result<Self, GpuError> {
        let gpu = GpuDevice::new()?;
        Self::with_device(gpu)
    }

    /// Compile the convolution program for an existing device session.
    pub fn with_device(gpu: GpuDevice) -> Result<Self, GpuError> {
        // naga does not accept `override` expressions in @workgroup_size,
        // so the workgroup dimensions are baked into the source here.
        let shader_src = include_str!("../shaders/convolve.wgsl")
            .replace("{{WG_X}}", &gpu.workgroup_size.x.to_string())
            .replace("{{WG_Y}}", &gpu.workgroup_size.y.to_string());

        // Shader compilation errors surface through wgpu's validation
        // error scope; the popped error carries naga's diagnostic log.
        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = gpu
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("convolve.wgsl"),
                source: wgpu::ShaderSource::Wgsl(shader_src.into()),
            });
        if let Some(e) = pollster::block_on(gpu.device.pop_error_scope()) {
            return Err(GpuError::ShaderBuild(e.to_string()));
        }

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);

        // Bind group layout: mirrors the @group(0) bindings in convolve.wgsl.
        let bgl = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("GpuConvolver BGL"),
                entries: &[
                    // Binding 0 — input pixels (read-only storage)
                    storage_entry(0, true),
                    // Binding 1 — output pixels (read-write storage)
                    storage_entry(1, false),
                    // Binding 2 — kernel coefficients (read-only storage)
                    storage_entry(2, true),
                    // Binding 3 — params uniform
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("GpuConvolver pipeline layout"),
                bind_group_layouts: &[&bgl],
                push_constant_ranges: &[],
            });

        let pipeline = gpu
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("convolve"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: "convolve",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });

        if let Some(e) = pollster::block_on(gpu.device.pop_error_scope()) {
            return Err(GpuError::Pipeline(e.to_string()));
        }

        Ok(GpuConvolver { gpu, pipeline, bgl })
    }

    /// The underlying device session (adapter info, workgroup size).
    pub fn device(&self) -> &GpuDevice {
        &self.gpu
    }
}

impl Convolver for GpuConvolver {
    fn convolve(
        &self,
        input: &Image<f32>,
        kernel: &EdgeKernel,
    ) -> Result<Image<f32>, ConvolveError> {
        if input.is_empty() {
            return Err(ConvolveError::EmptyInput {
                width: input.width(),
                height: input.height(),
            });
        }

        let width = input.width() as u32;
        let height = input.height() as u32;
        let pixel_count = (width * height) as usize;
        let result_bytes = (pixel_count * std::mem::size_of::<f32>()) as u64;

        // Compact rows into a contiguous staging vector; storage buffers
        // carry no stride padding.
        let mut staging: Vec<f32> = Vec::with_capacity(pixel_count);
        for y in 0..input.height() {
            staging.extend_from_slice(input.row(y));
        }

        // --- Per-image device buffers ---
        let input_buf = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("GpuConvolver::input"),
                contents: bytemuck::cast_slice(&staging),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let output_buf = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("GpuConvolver::output"),
            size: result_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let coeffs = kernel.as_flat();
        let coeffs_buf = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("GpuConvolver::coeffs"),
                contents: bytemuck::cast_slice(&coeffs),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let params = ConvolveParams {
            width,
            height,
            kernel_size: kernel.size() as u32,
            _pad: 0,
        };
        let params_buf = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("GpuConvolver::params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let readback_buf = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("GpuConvolver::readback"),
            size: result_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("GpuConvolver bind group"),
            layout: &self.bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: output_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: coeffs_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params_buf.as_entire_binding(),
                },
            ],
        });

        // --- Dispatch: one work-item per output pixel ---
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("GpuConvolver::convolve"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("convolve"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let (dx, dy) = self.gpu.dispatch_size(width, height);
            pass.dispatch_workgroups(dx, dy, 1);
        }
        encoder.copy_buffer_to_buffer(&output_buf, 0, &readback_buf, 0, result_bytes);
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        // --- Blocking wait + readback ---
        let buf_slice = readback_buf.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buf_slice.map_async(wgpu::MapMode::Read, move |r| {
            // Receiver outlives the poll below; a dropped receiver means
            // the error path already returned.
            let _ = tx.send(r);
        });
        self.gpu.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| GpuError::Readback("map callback never fired".into()))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;

        let mapped = buf_slice.get_mapped_range();
        let result: Vec<f32> = bytemuck::cast_slice(&mapped).to_vec();
        drop(mapped);
        readback_buf.unmap();

        Ok(Image::from_vec(input.width(), input.height(), result))
    }

    fn name(&self) -> &'static str {
        "gpu"
    }
}

/// Storage-buffer bind group layout entry at the given binding index.
fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
