// convolve.rs — The convolution engine: border policy, CPU reference
// backend, and the trait seam both backends share.
//
// The numerical contract, identical on both backends:
//
//   result[x, y] = Σ_{ki, kj} kernel[ki, kj] * padded[x + kj - 1, y + ki - 1]
//
// where `padded` extends the input by one pixel on each side using edge
// replication. Accumulation is in f32 with no intermediate clamping —
// negative and >255 values are legal in the raw result.
//
// BORDER HANDLING: replicate (clamp to the nearest interior pixel),
// expressed through `PaddedView`. Interior pixels never touch the border
// path; the inner loop splits into border bands and an unchecked interior,
// so the hot path carries no bounds checks.

use std::fmt;

use crate::gpu::device::GpuError;
use crate::image::Image;
use crate::kernel::{EdgeKernel, KERNEL_SIZE, PAD};

// ---------------------------------------------------------------------------
// PaddedView
// ---------------------------------------------------------------------------

/// A borrowed, logically padded view of an `Image<f32>`.
///
/// Extends the image by [`PAD`] pixels on each side using edge replication:
/// any query on `[-PAD, dim + PAD)` resolves to a valid interior sample.
/// The view owns nothing and performs no copy — out-of-range coordinates
/// are clamped at lookup time.
pub struct PaddedView<'a> {
    img: &'a Image<f32>,
}

impl<'a> PaddedView<'a> {
    /// Borrow a padded view of `img`.
    ///
    /// # Panics
    /// Panics if the image is empty — there is no interior pixel to
    /// replicate.
    pub fn new(img: &'a Image<f32>) -> Self {
        assert!(!img.is_empty(), "cannot pad an empty image");
        PaddedView { img }
    }

    /// Sample at signed coordinates, replicating the nearest edge pixel
    /// for coordinates outside `[0, dim)`.
    #[inline]
    pub fn get(&self, x: isize, y: isize) -> f32 {
        debug_assert!(
            x >= -(PAD as isize) && x < (self.img.width() + PAD) as isize,
            "padded x={x} outside [-{PAD}, width+{PAD})"
        );
        debug_assert!(
            y >= -(PAD as isize) && y < (self.img.height() + PAD) as isize,
            "padded y={y} outside [-{PAD}, height+{PAD})"
        );
        let cx = x.clamp(0, (self.img.width() - 1) as isize) as usize;
        let cy = y.clamp(0, (self.img.height() - 1) as isize) as usize;
        self.img.get(cx, cy)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from a convolution backend.
#[derive(Debug)]
pub enum ConvolveError {
    /// An empty buffer reached a convolver — a contract violation on the
    /// caller's side, reported instead of silently returning nothing.
    EmptyInput { width: usize, height: usize },
    /// The GPU backend failed (device readback, setup).
    Gpu(GpuError),
}

impl fmt::Display for ConvolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvolveError::EmptyInput { width, height } => write!(
                f,
                "cannot convolve an empty image ({width}×{height}); \
                 both dimensions must be > 0"
            ),
            ConvolveError::Gpu(e) => write!(f, "GPU convolution failed: {e}"),
        }
    }
}

impl std::error::Error for ConvolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvolveError::Gpu(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GpuError> for ConvolveError {
    fn from(e: GpuError) -> Self {
        ConvolveError::Gpu(e)
    }
}

// ---------------------------------------------------------------------------
// Convolver trait
// ---------------------------------------------------------------------------

/// The backend seam: one convolution operation, two implementations.
///
/// The backend is selected once per run ([`crate::batch::Backend`]) and held
/// as a trait object by the runner, so tests can exercise both variants
/// against the same input corpus.
pub trait Convolver {
    /// Convolve `input` with `kernel`, returning the raw f32 result.
    ///
    /// The result has the same dimensions as the input and is fully
    /// populated; no clamping is applied.
    fn convolve(
        &self,
        input: &Image<f32>,
        kernel: &EdgeKernel,
    ) -> Result<Image<f32>, ConvolveError>;

    /// Short backend name for report lines.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// ScalarConvolver
// ---------------------------------------------------------------------------

/// Sequential CPU reference implementation.
///
/// Deterministic, single-threaded, O(width·height·9); the authoritative
/// definition of the operation that the GPU backend is validated against.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarConvolver;

impl ScalarConvolver {
    pub fn new() -> Self {
        ScalarConvolver
    }
}

impl Convolver for ScalarConvolver {
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

        let w = input.width();
        let h = input.height();
        let padded = PaddedView::new(input);
        let mut out = Image::<f32>::new(w, h);

        for y in 0..h {
            // Top/bottom border rows go entirely through the padded view.
            if y < PAD || y + PAD >= h {
                for x in 0..w {
                    out.set(x, y, convolve_at_padded(&padded, kernel, x, y));
                }
                continue;
            }

            // Left border columns.
            for x in 0..PAD.min(w) {
                out.set(x, y, convolve_at_padded(&padded, kernel, x, y));
            }

            // Interior: the full 3×3 neighborhood is in bounds.
            if w > 2 * PAD {
                for x in PAD..(w - PAD) {
                    // SAFETY: x ± PAD and y ± PAD are all within bounds here.
                    unsafe {
                        let acc = convolve_at_interior(input, kernel, x, y);
                        out.set_unchecked(x, y, acc);
                    }
                }
            }

            // Right border columns.
            let right_start = if w > PAD { w - PAD } else { PAD.min(w) };
            for x in right_start..w {
                out.set(x, y, convolve_at_padded(&padded, kernel, x, y));
            }
        }

        Ok(out)
    }

    fn name(&self) -> &'static str {
        "scalar"
    }
}

/// Weighted 3×3 sum at (x, y) through the replicating padded view.
#[inline]
fn convolve_at_padded(padded: &PaddedView<'_>, kernel: &EdgeKernel, x: usize, y: usize) -> f32 {
    let mut acc = 0.0f32;
    for ki in 0..KERNEL_SIZE {
        for kj in 0..KERNEL_SIZE {
            let sx = x as isize + kj as isize - PAD as isize;
            let sy = y as isize + ki as isize - PAD as isize;
            acc += kernel.get(ki, kj) * padded.get(sx, sy);
        }
    }
    acc
}

/// Weighted 3×3 sum at an interior (x, y) with unchecked access.
///
/// # Safety
/// Caller must guarantee `PAD <= x < width - PAD` and
/// `PAD <= y < height - PAD`.
#[inline(always)]
unsafe fn convolve_at_interior(
    input: &Image<f32>,
    kernel: &EdgeKernel,
    x: usize,
    y: usize,
) -> f32 {
    let mut acc = 0.0f32;
    for ki in 0..KERNEL_SIZE {
        for kj in 0..KERNEL_SIZE {
            let sx = x + kj - PAD;
            let sy = y + ki - PAD;
            acc += kernel.get(ki, kj) * input.get_unchecked(sx, sy);
        }
    }
    acc
}
