// edgebatch — batch directional edge detection with dual convolution backends.
//
// A fixed 3×3 edge-detection kernel is convolved over every image in an input
// directory; results are min-max normalized to 8-bit grayscale and written to
// an output directory with per-image timing. The same numerical operation has
// two execution strategies:
//
//   ScalarConvolver — sequential CPU reference (authoritative)
//   GpuConvolver    — wgpu compute dispatch, one work-item per output pixel
//
// The CPU implementation is the reference; the GPU kernel is validated
// against it pixel-for-pixel in the test suite.

pub mod batch;
pub mod convert;
pub mod convolve;
pub mod gpu;
pub mod image;
pub mod kernel;
pub mod normalize;
