// batch.rs — Directory-batch orchestration.
//
// Feeds every regular file of an input directory through exactly one
// convolution backend, times the convolution step, normalizes, and writes
// the 8-bit result under a name derived from the input.
//
// Error taxonomy (applied here):
//   fatal      — backend setup (no GPU, shader build) and device failures;
//                the run aborts.
//   per-image  — decode failure, empty decode, encode failure; logged,
//                reported as skipped, the run continues.
//
// The runner does not create the output directory — the caller guarantees
// it exists before the first write. Images are processed strictly one at a
// time; entries are sorted by file name so runs are deterministic.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::convert::u8_to_f32_raw;
use crate::convolve::{ConvolveError, Convolver, ScalarConvolver};
use crate::gpu::convolve::GpuConvolver;
use crate::gpu::device::GpuError;
use crate::image::Image;
use crate::kernel::{EdgeKernel, VERTICAL_EDGE};
use crate::normalize::normalize_min_max;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which convolution backend to run. Selected once per run, never
/// per-image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Scalar,
    Gpu,
}

/// Output file naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingMode {
    /// `<stem>_processed.<ext>`
    Suffix,
    /// `processed_<filename>`
    Prefix,
}

/// Batch run configuration.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub backend: Backend,
    pub naming: NamingMode,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            backend: Backend::Scalar,
            naming: NamingMode::Suffix,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to one directory entry.
#[derive(Debug)]
pub enum ImageOutcome {
    Processed {
        output_path: PathBuf,
        /// Wall-clock time of the convolution step only (decode/encode
        /// excluded).
        elapsed_seconds: f64,
    },
    Skipped {
        reason: String,
    },
}

/// One report per directory entry, consumed for reporting only.
#[derive(Debug)]
pub struct ExecutionReport {
    pub input_path: PathBuf,
    pub outcome: ImageOutcome,
}

impl ExecutionReport {
    pub fn is_processed(&self) -> bool {
        matches!(self.outcome, ImageOutcome::Processed { .. })
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Fatal batch-run errors. Per-image problems never appear here — they
/// become `ImageOutcome::Skipped` entries instead.
#[derive(Debug)]
pub enum BatchError {
    /// GPU backend setup failed (no adapter, shader build, ...).
    Setup(GpuError),
    /// The input directory could not be enumerated.
    ReadDir { path: PathBuf, source: io::Error },
    /// A convolution dispatch failed mid-run (device errors are not
    /// recoverable per-image).
    Convolve(ConvolveError),
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::Setup(e) => write!(f, "backend setup failed: {e}"),
            BatchError::ReadDir { path, source } => {
                write!(f, "cannot read input directory {}: {source}", path.display())
            }
            BatchError::Convolve(e) => write!(f, "convolution failed: {e}"),
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BatchError::Setup(e) => Some(e),
            BatchError::ReadDir { source, .. } => Some(source),
            BatchError::Convolve(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// BatchRunner
// ---------------------------------------------------------------------------

/// Runs one convolution backend across every image in a directory.
pub struct BatchRunner {
    convolver: Box<dyn Convolver>,
    kernel: EdgeKernel,
    naming: NamingMode,
}

impl BatchRunner {
    /// Build a runner for the configured backend.
    ///
    /// GPU setup happens here, once — a missing GPU or a shader build
    /// failure aborts before any image is touched.
    pub fn new(config: BatchConfig) -> Result<Self, BatchError> {
        let convolver: Box<dyn Convolver> = match config.backend {
            Backend::Scalar => Box::new(ScalarConvolver::new()),
            Backend::Gpu => Box::new(GpuConvolver::new().map_err(BatchError::Setup)?),
        };
        Ok(BatchRunner {
            convolver,
            kernel: VERTICAL_EDGE,
            naming: config.naming,
        })
    }

    /// Build a runner around an existing convolver (used by tests to
    /// exercise both variants against the same corpus).
    pub fn with_convolver(convolver: Box<dyn Convolver>, naming: NamingMode) -> Self {
        BatchRunner {
            convolver,
            kernel: VERTICAL_EDGE,
            naming,
        }
    }

    /// Backend name for report lines.
    pub fn backend_name(&self) -> &'static str {
        self.convolver.name()
    }

    /// Process every regular file in `input_dir`, writing results into
    /// `output_dir` (which must already exist).
    ///
    /// Returns one report per entry. The run ends after the last entry;
    /// no resume state is kept.
    pub fn run(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<Vec<ExecutionReport>, BatchError> {
        let mut entries: Vec<PathBuf> = fs::read_dir(input_dir)
            .map_err(|e| BatchError::ReadDir {
                path: input_dir.to_path_buf(),
                source: e,
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        let mut reports = Vec::with_capacity(entries.len());
        for path in entries {
            reports.push(self.process_one(&path, output_dir)?);
        }
        Ok(reports)
    }

    /// Decode → convolve (timed) → normalize → encode for a single image.
    fn process_one(
        &self,
        input_path: &Path,
        output_dir: &Path,
    ) -> Result<ExecutionReport, BatchError> {
        let skip = |reason: String| ExecutionReport {
            input_path: input_path.to_path_buf(),
            outcome: ImageOutcome::Skipped { reason },
        };

        // Decode failure is recoverable: log, skip, continue.
        let gray = match decode_gray(input_path) {
            Ok(img) => img,
            Err(e) => {
                eprintln!(
                    "[edgebatch] Error: could not load image {}: {e}",
                    input_path.display()
                );
                return Ok(skip(format!("decode failed: {e}")));
            }
        };
        if gray.is_empty() {
            eprintln!(
                "[edgebatch] Error: empty image {}",
                input_path.display()
            );
            return Ok(skip("decoded image is empty".into()));
        }

        // Backend boundary: raw u8 → f32.
        let input = u8_to_f32_raw(&gray);
        drop(gray);

        // Only the convolution step is timed.
        let start = Instant::now();
        let result = self
            .convolver
            .convolve(&input, &self.kernel)
            .map_err(BatchError::Convolve)?;
        let elapsed_seconds = start.elapsed().as_secs_f64();
        println!(
            "Processed {} in {elapsed_seconds} seconds",
            input_path.display()
        );

        let normalized = normalize_min_max(&result);

        let output_path = output_dir.join(output_name(input_path, self.naming));
        if let Err(e) = encode_gray(&normalized, &output_path) {
            eprintln!(
                "[edgebatch] Error: could not write {}: {e}",
                output_path.display()
            );
            return Ok(skip(format!("encode failed: {e}")));
        }
        println!("Saved: {}", output_path.display());

        Ok(ExecutionReport {
            input_path: input_path.to_path_buf(),
            outcome: ImageOutcome::Processed {
                output_path,
                elapsed_seconds,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// External collaborators: decode / encode / naming
// ---------------------------------------------------------------------------

/// Decode any format the `image` crate supports to single-channel u8.
fn decode_gray(path: &Path) -> Result<Image<u8>, image::ImageError> {
    let img = image::open(path)?.to_luma8();
    let (w, h) = img.dimensions();
    Ok(Image::from_vec(w as usize, h as usize, img.into_raw()))
}

/// Encode a single-channel u8 image; format follows the file extension.
fn encode_gray(img: &Image<u8>, path: &Path) -> Result<(), image::ImageError> {
    let (w, h) = (img.width() as u32, img.height() as u32);
    let gray = image::GrayImage::from_raw(w, h, img.clone().into_vec())
        .expect("width * height pixels were just laid out compactly");
    gray.save(path)
}

/// Derive the output file name from the input path.
fn output_name(input: &Path, naming: NamingMode) -> PathBuf {
    match naming {
        NamingMode::Suffix => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".into());
            match input.extension() {
                Some(ext) => PathBuf::from(format!("{stem}_processed.{}", ext.to_string_lossy())),
                None => PathBuf::from(format!("{stem}_processed.png")),
            }
        }
        NamingMode::Prefix => {
            let name = input
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".into());
            PathBuf::from(format!("processed_{name}"))
        }
    }
}
