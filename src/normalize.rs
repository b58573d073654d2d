// normalize.rs — Min-max rescaling of a raw convolution result to the
// 8-bit display range.
//
// The raw result is signed and unbounded; output pixels map linearly so
// the minimum lands on 0 and the maximum on 255. A flat response
// (max == min — e.g. a blank input, which has no edges) takes an explicit
// degenerate branch producing all zeros, never a divide by zero or NaN.

use crate::image::{Image, Pixel};

/// Rescale an `Image<f32>` to `Image<u8>` over the full [0, 255] range.
///
/// Monotonic: ordering of input samples is preserved (non-strictly) in the
/// output. For a flat input every output sample is 0.
pub fn normalize_min_max(result: &Image<f32>) -> Image<u8> {
    let mut min_val = f32::INFINITY;
    let mut max_val = f32::NEG_INFINITY;
    for (_, _, v) in result.pixels() {
        min_val = min_val.min(v);
        max_val = max_val.max(v);
    }

    let mut out = Image::<u8>::new(result.width(), result.height());

    if max_val > min_val {
        let scale = 255.0 / (max_val - min_val);
        for (x, y, v) in result.pixels() {
            out.set(x, y, u8::from_f32((v - min_val) * scale));
        }
    }
    // Flat response: out stays zero-initialized — the defined degenerate
    // value.

    out
}
