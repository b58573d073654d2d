// tests/test_batch.rs — Integration tests for the batch runner.
//
// Fixture directories are created under the system temp dir (one per
// test, removed afterwards) and populated with small generated PNGs via
// the same `image` crate the decode collaborator uses.

use std::fs;
use std::path::PathBuf;

use edgebatch::batch::{BatchConfig, BatchRunner, ImageOutcome, NamingMode};

/// Fresh fixture directory pair (input, output) for one test.
fn fixture_dirs(test_name: &str) -> (PathBuf, PathBuf) {
    let root = std::env::temp_dir().join(format!(
        "edgebatch_{test_name}_{}",
        std::process::id()
    ));
    let input = root.join("input");
    let output = root.join("output");
    // Stale leftovers from a previous crashed run.
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&input).unwrap();
    fs::create_dir_all(&output).unwrap();
    (input, output)
}

/// Write a small grayscale PNG with a vertical stripe.
fn write_stripe_png(path: &PathBuf, size: u32) {
    let img = image::GrayImage::from_fn(size, size, |x, _| {
        if x == size / 2 {
            image::Luma([255u8])
        } else {
            image::Luma([0u8])
        }
    });
    img.save(path).unwrap();
}

#[test]
fn batch_processes_valid_and_skips_corrupt() {
    // 3 valid images + 1 corrupt file → exactly 3 outputs, 1 skip,
    // overall success.
    let (input, output) = fixture_dirs("mixed");

    write_stripe_png(&input.join("a.png"), 16);
    write_stripe_png(&input.join("b.png"), 16);
    write_stripe_png(&input.join("c.png"), 16);
    fs::write(input.join("broken.png"), b"this is not a png").unwrap();

    let runner = BatchRunner::new(BatchConfig::default()).unwrap();
    let reports = runner.run(&input, &output).unwrap();

    assert_eq!(reports.len(), 4);
    let processed = reports.iter().filter(|r| r.is_processed()).count();
    assert_eq!(processed, 3);

    let skipped: Vec<_> = reports
        .iter()
        .filter(|r| !r.is_processed())
        .collect();
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].input_path.ends_with("broken.png"));

    // Exactly the three derived names exist in the output directory.
    let mut written: Vec<String> = fs::read_dir(&output)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    written.sort();
    assert_eq!(
        written,
        vec!["a_processed.png", "b_processed.png", "c_processed.png"]
    );

    let _ = fs::remove_dir_all(input.parent().unwrap());
}

#[test]
fn batch_reports_carry_timing() {
    let (input, output) = fixture_dirs("timing");
    write_stripe_png(&input.join("img.png"), 32);

    let runner = BatchRunner::new(BatchConfig::default()).unwrap();
    let reports = runner.run(&input, &output).unwrap();

    assert_eq!(reports.len(), 1);
    match &reports[0].outcome {
        ImageOutcome::Processed {
            output_path,
            elapsed_seconds,
        } => {
            assert!(output_path.exists());
            assert!(*elapsed_seconds >= 0.0);
        }
        other => panic!("expected Processed, got {other:?}"),
    }

    let _ = fs::remove_dir_all(input.parent().unwrap());
}

#[test]
fn batch_prefix_naming_mode() {
    let (input, output) = fixture_dirs("prefix");
    write_stripe_png(&input.join("photo.png"), 16);

    let runner = BatchRunner::new(BatchConfig {
        naming: NamingMode::Prefix,
        ..Default::default()
    })
    .unwrap();
    runner.run(&input, &output).unwrap();

    assert!(output.join("processed_photo.png").exists());

    let _ = fs::remove_dir_all(input.parent().unwrap());
}

#[test]
fn batch_output_is_normalized_stripe() {
    // End-to-end through files: the written PNG holds the normalized
    // stripe response (0 / 128 / 255 bands), not the raw input.
    let (input, output) = fixture_dirs("roundtrip");
    write_stripe_png(&input.join("stripe.png"), 16);

    let runner = BatchRunner::new(BatchConfig::default()).unwrap();
    runner.run(&input, &output).unwrap();

    let written = image::open(output.join("stripe_processed.png"))
        .unwrap()
        .to_luma8();
    assert_eq!(written.dimensions(), (16, 16));

    let stripe_x = 8u32;
    for y in 0..16 {
        // Flanking columns carry the extreme responses.
        assert_eq!(written.get_pixel(stripe_x - 1, y).0[0], 0);
        assert_eq!(written.get_pixel(stripe_x + 1, y).0[0], 255);
        // Far from the stripe the response is zero → midpoint gray.
        assert_eq!(written.get_pixel(0, y).0[0], 128);
    }

    let _ = fs::remove_dir_all(input.parent().unwrap());
}

#[test]
fn batch_empty_directory_is_a_successful_noop() {
    let (input, output) = fixture_dirs("empty");
    let runner = BatchRunner::new(BatchConfig::default()).unwrap();
    let reports = runner.run(&input, &output).unwrap();
    assert!(reports.is_empty());
    let _ = fs::remove_dir_all(input.parent().unwrap());
}
