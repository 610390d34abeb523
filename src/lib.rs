//! PDF Form Fields Library
//!
//! Lists the interactive form (AcroForm) fields of a PDF document.
//! This library provides functionality to:
//! - Read the field tree of a document into a name-keyed mapping
//! - Turn one extraction attempt into a printable report that never fails
//!
//! # Example
//!
//! ```no_run
//! use pdf_form_fields::report::extract;
//! use std::path::Path;
//!
//! let report = extract(Path::new("application.pdf"));
//! print!("{}", report);
//! ```

pub mod error;
pub mod pdf;
pub mod report;

// Re-export commonly used items
pub use error::{Error, Result};
pub use report::{extract, Report};
