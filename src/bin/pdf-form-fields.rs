//! PDF Form Fields CLI tool
//!
//! A command-line tool that lists the interactive form fields of a PDF file.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pdf_form_fields::report::extract;

/// Extract form field data from a PDF file
#[derive(Parser)]
#[command(name = "pdf-form-fields")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # List the fields of a form
    pdf-form-fields application.pdf

    # Show what the reader is doing
    RUST_LOG=pdf_form_fields=debug pdf-form-fields application.pdf")]
struct Cli {
    /// The path to the PDF file
    pdf_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging();

    // Extraction failures are part of the report, not the exit status
    let report = extract(&cli.pdf_file);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report.write_to(&mut out).context("Failed to write report")?;
    out.flush().context("Failed to flush stdout")?;

    Ok(())
}

/// Log to stderr so stdout carries only the report
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
