//! Error types for PDF form field extraction

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while loading a document or reading its form.
///
/// Callers never branch on the variant: the CLI renders any of them through
/// `Display` as the detail of a single error line.
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The interactive form dictionary is present but unusable
    #[error("Invalid form: {0}")]
    InvalidForm(String),

    /// The PDF library panicked while reading the document
    #[error("PDF library panicked: {0}")]
    Panic(String),

    /// General error
    #[error("{0}")]
    General(String),
}
