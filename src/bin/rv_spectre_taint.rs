//! Command-line driver: reads a disassembly listing, runs the analyzer,
//! and prints the report. The core analysis lives in the library; this
//! binary is just the file/CLI glue (argument parsing, reading bytes,
//! printing) the distilled spec calls out as an external collaborator.

use std::process::ExitCode;

use clap::Parser;

use rv_spectre_taint::middle::snippet::Outcome;
use rv_spectre_taint::{analyze, Fatal};

/// Find which initial register values a RISC-V code snippet could leak to
/// a speculative-execution side channel.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the disassembly listing to analyze.
    #[arg(default_value = "memcpy_shm.asm")]
    file: String,
    /// Print a diagnostic for every line the parser skips or decodes, and
    /// for every instruction the taint engine visits.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let listing = match std::fs::read_to_string(&args.file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: could not read {}: {e}", args.file);
            return ExitCode::from(1);
        }
    };

    match analyze(&listing, args.verbose) {
        Ok(Outcome::MissingMarkers) => {
            println!("Error: could not find code snippet boundaries.");
            ExitCode::SUCCESS
        }
        Ok(Outcome::NotSelfContained(escape)) => {
            match escape.target {
                Some(target) => println!(
                    "Warning: code snippet is not self-contained (branch at 0x{:08x} targets 0x{:08x}).",
                    escape.at, target
                ),
                None => println!(
                    "Warning: code snippet is not self-contained (branch at 0x{:08x} has no resolvable target).",
                    escape.at
                ),
            }
            ExitCode::SUCCESS
        }
        Ok(Outcome::Report(report)) => {
            print!("{report}");
            ExitCode::SUCCESS
        }
        Err(Fatal::Parse(e)) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
        Err(e @ Fatal::SpectreGadget { .. }) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
        Err(e @ Fatal::InternalInvariant { .. }) => {
            eprintln!("error: {e}");
            ExitCode::from(70)
        }
    }
}
