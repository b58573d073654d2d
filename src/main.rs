// main.rs — edgebatch CLI.
//
// Usage:
//   edgebatch <input_dir> <output_dir> [--backend scalar|gpu] [--prefix-names]
//
// Convolves every image in <input_dir> with the vertical-edge kernel on
// the selected backend and writes normalized grayscale results into
// <output_dir> (created if missing). Per-image failures are logged and
// skipped; backend setup failures abort with a diagnostic and exit 1.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use edgebatch::batch::{Backend, BatchConfig, BatchRunner, NamingMode};

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} <input_dir> <output_dir> [--backend scalar|gpu] [--prefix-names]");
    eprintln!("  --backend scalar|gpu  convolution backend (default: scalar)");
    eprintln!("  --prefix-names        write processed_<name> instead of <stem>_processed.<ext>");
    process::exit(1);
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        usage(&args[0]);
    }

    let input_dir = PathBuf::from(&args[1]);
    let output_dir = PathBuf::from(&args[2]);

    let mut backend = Backend::Scalar;
    let mut naming = NamingMode::Suffix;
    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--backend" => {
                let value = args.get(i + 1).unwrap_or_else(|| usage(&args[0]));
                backend = match value.as_str() {
                    "scalar" => Backend::Scalar,
                    "gpu" => Backend::Gpu,
                    other => {
                        eprintln!("[edgebatch] unknown backend: {other}");
                        usage(&args[0]);
                    }
                };
                i += 2;
            }
            "--prefix-names" => {
                naming = NamingMode::Prefix;
                i += 1;
            }
            other => {
                eprintln!("[edgebatch] unknown argument: {other}");
                usage(&args[0]);
            }
        }
    }

    // The runner requires the output directory to exist before the first
    // write; the CLI is the collaborator that guarantees it.
    if let Err(e) = fs::create_dir_all(&output_dir) {
        eprintln!(
            "[edgebatch] Error: cannot create output directory {}: {e}",
            output_dir.display()
        );
        process::exit(1);
    }

    // Backend setup is fatal on failure — no fallback from gpu to scalar.
    let runner = match BatchRunner::new(BatchConfig { backend, naming }) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[edgebatch] fatal: {e}");
            process::exit(1);
        }
    };
    eprintln!("[edgebatch] backend: {}", runner.backend_name());

    let reports = match runner.run(&input_dir, &output_dir) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[edgebatch] fatal: {e}");
            process::exit(1);
        }
    };

    let processed = reports.iter().filter(|r| r.is_processed()).count();
    let skipped = reports.len() - processed;
    if skipped > 0 {
        eprintln!("[edgebatch] skipped {skipped} file(s)");
    }
    println!("\nProcessing complete! Total images processed: {processed}");
}
