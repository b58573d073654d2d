// convert.rs — Pixel type conversions at the backend boundary.
//
// Decode yields Image<u8>; both convolvers consume Image<f32>. The
// conversion is raw (u8 42 → f32 42.0), matching what the convolution
// formula expects — the 8-bit form reappears only after normalization.

use crate::image::{Image, Pixel};

/// Convert an Image<u8> to Image<f32> preserving raw intensity values.
pub fn u8_to_f32_raw(src: &Image<u8>) -> Image<f32> {
    let mut dst = Image::new(src.width(), src.height());
    for y in 0..src.height() {
        for x in 0..src.width() {
            dst.set(x, y, src.get(x, y) as f32);
        }
    }
    dst
}

/// Convert an Image<f32> with raw intensity values to Image<u8>.
/// Clamps to [0, 255] and rounds.
pub fn f32_raw_to_u8(src: &Image<f32>) -> Image<u8> {
    let mut dst = Image::new(src.width(), src.height());
    for y in 0..src.height() {
        for x in 0..src.width() {
            dst.set(x, y, u8::from_f32(src.get(x, y)));
        }
    }
    dst
}
