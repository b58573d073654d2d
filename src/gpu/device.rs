// gpu/device.rs — wgpu device session.
//
// Responsibilities:
//   - Enumerate Vulkan adapters and select the first GPU-class one.
//     Software rasterizers (DeviceType::Cpu, e.g. llvmpipe) are rejected:
//     when no real GPU is visible the run fails at setup instead of
//     silently crawling through a CPU emulation of the parallel path.
//   - Hold the device + queue for the lifetime of the run.
//   - Provide `WorkgroupSize` and the ceiling-divided `dispatch_size`
//     used when launching one work-item per output pixel.

use std::fmt;

/// A workgroup size configuration for 2D compute dispatches.
///
/// The product must not exceed the device's
/// `max_compute_invocations_per_workgroup` limit; construct overrides via
/// [`GpuDevice::set_workgroup_size`], which validates this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
}

impl WorkgroupSize {
    /// Default for discrete/integrated GPUs: 16×8 = 128 invocations,
    /// 4 NVIDIA warps or 2 AMD wavefronts, with the 16-wide x dimension
    /// matching row-major image layout.
    pub const DEFAULT: WorkgroupSize = WorkgroupSize { x: 16, y: 8 };

    /// Total invocations per workgroup (x * y).
    pub fn total(&self) -> u32 {
        self.x * self.y
    }
}

impl fmt::Display for WorkgroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{} ({} invocations)", self.x, self.y, self.total())
    }
}

/// Cached adapter information for logging and error reports.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub vendor: u32,
    pub device: u32,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, {:?})",
            self.name, self.backend, self.device_type
        )
    }
}

/// The process-scoped GPU session: adapter, device, queue.
///
/// Expensive to create (Vulkan instance + device initialization); create
/// one per run and share it across all per-image dispatches.
///
/// # Field drop order
/// Rust drops struct fields in declaration order. `_instance` is declared
/// last so the `wgpu::Instance` outlives `device` and `queue`; some Vulkan
/// layers crash if the instance dies while device-level objects still hold
/// back-references to it.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: AdapterInfo,
    pub workgroup_size: WorkgroupSize,
    /// Keeps the `wgpu::Instance` alive until `device` and `queue` are
    /// dropped. Never accessed directly.
    _instance: wgpu::Instance,
}

impl GpuDevice {
    /// Create a `GpuDevice` using the first GPU-class Vulkan adapter found.
    ///
    /// # Errors
    /// `GpuError::NoSuitableAdapter` when only CPU/software adapters (or
    /// none at all) are visible; `GpuError::DeviceRequest` when the device
    /// request fails.
    pub fn new() -> Result<Self, GpuError> {
        pollster::block_on(Self::init_async())
    }

    async fn init_async() -> Result<Self, GpuError> {
        // Validation layer in debug builds for shader error feedback.
        let flags = if cfg!(debug_assertions) {
            wgpu::InstanceFlags::VALIDATION
        } else {
            wgpu::InstanceFlags::empty()
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::VULKAN,
            flags,
            ..Default::default()
        });

        // Enumerate explicitly rather than using request_adapter's power
        // heuristics, which may grab a software rasterizer. Adapter names
        // are logged so the chosen device is visible at startup.
        let adapters: Vec<wgpu::Adapter> = instance
            .enumerate_adapters(wgpu::Backends::VULKAN)
            .into_iter()
            .collect();

        for a in &adapters {
            let info = a.get_info();
            eprintln!(
                "[edgebatch] Vulkan adapter: {} ({:?}, {:?})",
                info.name, info.backend, info.device_type
            );
        }

        // GPU-class only: discrete, integrated, virtual (VM pass-through)
        // or Other. DeviceType::Cpu is never selected.
        let adapter = adapters
            .into_iter()
            .find(|a| {
                matches!(
                    a.get_info().device_type,
                    wgpu::DeviceType::DiscreteGpu
                        | wgpu::DeviceType::IntegratedGpu
                        | wgpu::DeviceType::VirtualGpu
                        | wgpu::DeviceType::Other
                )
            })
            .ok_or(GpuError::NoSuitableAdapter)?;

        let raw_info = adapter.get_info();
        let adapter_info = AdapterInfo {
            name: raw_info.name.clone(),
            vendor: raw_info.vendor,
            device: raw_info.device,
            device_type: raw_info.device_type,
            backend: raw_info.backend,
        };

        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("edgebatch"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(GpuError::DeviceRequest)?;

        Ok(GpuDevice {
            device,
            queue,
            adapter_info,
            workgroup_size: WorkgroupSize::DEFAULT,
            _instance: instance,
        })
    }

    /// Override the default workgroup size.
    ///
    /// Returns `Err` if the total invocation count (x * y) exceeds the
    /// device's `max_compute_invocations_per_workgroup`.
    pub fn set_workgroup_size(&mut self, x: u32, y: u32) -> Result<(), GpuError> {
        let total = x * y;
        let max = self.device.limits().max_compute_invocations_per_workgroup;
        if total > max {
            return Err(GpuError::WorkgroupTooLarge { total, max });
        }
        self.workgroup_size = WorkgroupSize { x, y };
        Ok(())
    }

    /// Number of workgroups needed to cover an image of the given size
    /// with the active workgroup size, per dimension.
    ///
    /// Ceiling division: every pixel is covered even when the dimensions
    /// are not workgroup multiples, and the shader guards the overhang:
    /// ```wgsl
    /// if gid.x >= width || gid.y >= height { return; }
    /// ```
    pub fn dispatch_size(&self, img_w: u32, img_h: u32) -> (u32, u32) {
        dispatch_size_for(self.workgroup_size, img_w, img_h)
    }
}

/// Ceiling-divided workgroup counts for the given image dimensions.
#[inline]
pub(crate) fn dispatch_size_for(ws: WorkgroupSize, img_w: u32, img_h: u32) -> (u32, u32) {
    let dx = (img_w + ws.x - 1) / ws.x;
    let dy = (img_h + ws.y - 1) / ws.y;
    (dx, dy)
}

impl fmt::Display for GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GpuDevice {{ adapter: {}, workgroup: {} }}",
            self.adapter_info, self.workgroup_size
        )
    }
}

// ============================================================
// Error type
// ============================================================

/// Errors from GPU session setup, program build, and readback.
///
/// Setup errors are fatal to the run: the parallel backend performs no
/// fallback to the scalar path.
#[derive(Debug)]
pub enum GpuError {
    /// No GPU-class Vulkan adapter found (only CPU/software renderers, or
    /// none). Check that Vulkan is installed and `vulkaninfo` lists a
    /// real GPU.
    NoSuitableAdapter,
    /// wgpu device request failed (driver issue, unsupported limits, ...).
    DeviceRequest(wgpu::RequestDeviceError),
    /// The convolution shader failed to compile; carries the compiler's
    /// diagnostic log.
    ShaderBuild(String),
    /// Pipeline creation or argument binding failed.
    Pipeline(String),
    /// Mapping the result buffer back to host memory failed.
    Readback(String),
    /// Requested workgroup size exceeds the device's invocation limit.
    WorkgroupTooLarge { total: u32, max: u32 },
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoSuitableAdapter => write!(
                f,
                "no GPU-class Vulkan adapter found (only CPU/software renderers \
                 visible); ensure Vulkan is installed and `vulkaninfo` lists a real GPU"
            ),
            GpuError::DeviceRequest(e) => write!(f, "device request failed: {e}"),
            GpuError::ShaderBuild(log) => {
                write!(f, "convolution shader failed to build:\n{log}")
            }
            GpuError::Pipeline(msg) => write!(f, "compute pipeline creation failed: {msg}"),
            GpuError::Readback(msg) => write!(f, "result readback failed: {msg}"),
            GpuError::WorkgroupTooLarge { total, max } => write!(
                f,
                "workgroup size {total} exceeds device limit of {max} invocations"
            ),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::DeviceRequest(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================================
// Tests
// ============================================================
