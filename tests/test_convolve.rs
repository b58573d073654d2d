// tests/test_convolve.rs — Integration tests for the convolution pipeline.
//
// These run with `cargo test --test test_convolve` and exercise only the
// public API: kernel → scalar convolver → normalizer, the same sequence
// the batch runner drives.

use edgebatch::convolve::{ConvolveError, Convolver, ScalarConvolver};
use edgebatch::image::Image;
use edgebatch::kernel::{EdgeKernel, VERTICAL_EDGE};
use edgebatch::normalize::normalize_min_max;

// ===== Convolution formula =====

#[test]
fn constant_image_yields_flat_zero_output() {
    // A uniform image has no edges: the raw result is all zeros, and the
    // normalizer's degenerate branch keeps the output at zero.
    let img = Image::from_vec(6, 6, vec![200.0f32; 36]);
    let raw = ScalarConvolver::new().convolve(&img, &VERTICAL_EDGE).unwrap();
    for (_, _, v) in raw.pixels() {
        assert_eq!(v, 0.0);
    }
    let out = normalize_min_max(&raw);
    for (_, _, v) in out.pixels() {
        assert_eq!(v, 0);
    }
}

#[test]
fn replicate_border_top_left_corner() {
    // Hand computation for a bright corner pixel (see unit tests for the
    // per-tap derivation): the replicated corner contributes +1 twice at
    // (0,0), giving exactly 2× the pixel value.
    let mut img: Image<f32> = Image::new(5, 5);
    img.set(0, 0, 50.0);
    let out = ScalarConvolver::new().convolve(&img, &VERTICAL_EDGE).unwrap();
    assert_eq!(out.get(0, 0), 100.0);
    assert_eq!(out.get(1, 0), 100.0);
    assert_eq!(out.get(2, 0), 0.0);
}

#[test]
fn vertical_stripe_end_to_end() {
    // 4×4 with a bright stripe at column 2 — the flanking columns carry
    // the full ±765 response, which normalization maps to 0 and 255 with
    // the zero-response columns at the midpoint.
    let mut img: Image<f32> = Image::new(4, 4);
    for y in 0..4 {
        img.set(2, y, 255.0);
    }
    let raw = ScalarConvolver::new().convolve(&img, &VERTICAL_EDGE).unwrap();
    let out = normalize_min_max(&raw);

    for y in 0..4 {
        assert_eq!(out.get(1, y), 0, "negative response column");
        assert_eq!(out.get(3, y), 255, "positive response column");
        // Zero raw response sits at the midpoint of the stretched range.
        assert_eq!(out.get(0, y), 128);
        assert_eq!(out.get(2, y), 128);
    }
}

#[test]
fn result_dimensions_match_input() {
    let img: Image<f32> = Image::new(17, 9);
    let out = ScalarConvolver::new().convolve(&img, &VERTICAL_EDGE).unwrap();
    assert_eq!(out.width(), 17);
    assert_eq!(out.height(), 9);
}

#[test]
fn empty_input_fails_fast() {
    let img: Image<f32> = Image::new(3, 0);
    let err = ScalarConvolver::new()
        .convolve(&img, &VERTICAL_EDGE)
        .unwrap_err();
    assert!(matches!(err, ConvolveError::EmptyInput { width: 3, height: 0 }));
    // The error message names the offending dimensions.
    assert!(err.to_string().contains("3×0"));
}

#[test]
fn kernel_is_shared_by_reference_across_calls() {
    // The same kernel value drives any number of convolutions — there is
    // no mutation API, so results stay identical.
    let kernel = VERTICAL_EDGE;
    let data: Vec<f32> = (0..30).map(|i| (i % 7) as f32 * 10.0).collect();
    let img = Image::from_vec(6, 5, data);
    let conv = ScalarConvolver::new();
    let a = conv.convolve(&img, &kernel).unwrap();
    let b = conv.convolve(&img, &kernel).unwrap();
    for ((_, _, va), (_, _, vb)) in a.pixels().zip(b.pixels()) {
        assert_eq!(va, vb);
    }
}

#[test]
fn custom_kernel_through_the_same_path() {
    // A horizontal-edge kernel (the vertical one transposed) responds to
    // row transitions instead of column transitions.
    let horizontal = EdgeKernel::new([
        [1.0, 1.0, 1.0],
        [0.0, 0.0, 0.0],
        [-1.0, -1.0, -1.0],
    ]);
    let mut img: Image<f32> = Image::new(4, 4);
    for x in 0..4 {
        img.set(x, 2, 255.0); // bright row
    }
    let out = ScalarConvolver::new().convolve(&img, &horizontal).unwrap();
    for x in 0..4 {
        assert_eq!(out.get(x, 1), -765.0);
        assert_eq!(out.get(x, 3), 765.0);
        assert_eq!(out.get(x, 0), 0.0);
        assert_eq!(out.get(x, 2), 0.0);
    }
}

// ===== Normalizer properties over convolution output =====

#[test]
fn normalized_output_is_always_in_display_range() {
    // Large raw magnitudes (±765 here) always land inside [0, 255].
    let mut img: Image<f32> = Image::new(8, 8);
    for y in 0..8 {
        img.set(4, y, 255.0);
    }
    let raw = ScalarConvolver::new().convolve(&img, &VERTICAL_EDGE).unwrap();
    let out = normalize_min_max(&raw);
    let (min, max) = out
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), (_, _, v)| (lo.min(v), hi.max(v)));
    assert_eq!(min, 0);
    assert_eq!(max, 255);
}

#[test]
fn normalization_preserves_response_ordering() {
    let data: Vec<f32> = (0..64).map(|i| ((i * 13) % 97) as f32).collect();
    let img = Image::from_vec(8, 8, data);
    let raw = ScalarConvolver::new().convolve(&img, &VERTICAL_EDGE).unwrap();
    let out = normalize_min_max(&raw);

    let raws: Vec<f32> = raw.pixels().map(|(_, _, v)| v).collect();
    let outs: Vec<u8> = out.pixels().map(|(_, _, v)| v).collect();
    for i in 0..raws.len() {
        for j in 0..raws.len() {
            if raws[i] <= raws[j] {
                assert!(outs[i] <= outs[j], "ordering broken between {i} and {j}");
            }
        }
    }
}
