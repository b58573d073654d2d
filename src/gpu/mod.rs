// gpu/mod.rs — GPU execution backend.
//
// wgpu-based compute path for the same convolution the CPU reference in
// convolve.rs defines. The scalar implementation remains authoritative —
// the GPU kernel is validated against it pixel-for-pixel in the test
// suites.
//
// Two ownership tiers:
//   GpuDevice / GpuConvolver — process-scoped: adapter, device, queue and
//     the compiled pipeline live for the whole run.
//   Per-image buffers — created inside one convolve() call and dropped on
//     every exit path.

pub mod convolve;
pub mod device;
