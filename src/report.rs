//! Turning one extraction attempt into console output

use std::fmt;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::{Error, Result};
use crate::pdf::{read_form_fields, FormFields};

/// Outcome of reading the form fields of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// The document has at least one form field
    Fields { path: PathBuf, names: Vec<String> },
    /// The document has no interactive form, or the form is empty
    NoFields { path: PathBuf },
    /// Loading or reading the document failed
    Failed { path: PathBuf, detail: String },
}

impl Report {
    fn from_fields(path: &Path, fields: Option<FormFields>) -> Self {
        match fields {
            Some(fields) if !fields.is_empty() => Report::Fields {
                path: path.to_path_buf(),
                names: fields.names().map(str::to_string).collect(),
            },
            _ => Report::NoFields {
                path: path.to_path_buf(),
            },
        }
    }

    fn from_error(path: &Path, error: &Error) -> Self {
        Report::Failed {
            path: path.to_path_buf(),
            detail: error.to_string(),
        }
    }

    /// Path of the file this report is about
    pub fn path(&self) -> &Path {
        match self {
            Report::Fields { path, .. } | Report::NoFields { path } | Report::Failed { path, .. } => {
                path
            }
        }
    }

    /// True when loading or reading the document failed
    pub fn is_failure(&self) -> bool {
        matches!(self, Report::Failed { .. })
    }

    /// Write the report, one line per entry
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Fields { path, names } => {
                writeln!(f, "Form fields in '{}':", path.display())?;
                for name in names {
                    writeln!(f, "  - Name: {}", name)?;
                }
                Ok(())
            }
            Report::NoFields { path } => {
                writeln!(f, "No form fields found in '{}'.", path.display())
            }
            Report::Failed { path, detail } => {
                writeln!(f, "Error processing PDF file '{}': {}", path.display(), detail)
            }
        }
    }
}

/// Read the form fields of `path` and describe the result
///
/// Never fails: errors and panics from the PDF library both end up as
/// [`Report::Failed`]. The whole report is built before anything is printed,
/// so a failure never follows partial field output.
pub fn extract(path: &Path) -> Report {
    match read_guarded(path) {
        Ok(fields) => Report::from_fields(path, fields),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "extraction failed");
            Report::from_error(path, &e)
        }
    }
}

/// Serializes swapping the process-wide panic hook
static HOOK_LOCK: Mutex<()> = Mutex::new(());

/// Run the read with panics converted to [`Error::Panic`]
fn read_guarded(path: &Path) -> Result<Option<FormFields>> {
    guarded(|| read_form_fields(path))
}

/// Run `read` with the panic hook muted, turning a panic into [`Error::Panic`].
///
/// The hook is swapped under `HOOK_LOCK`, so concurrent callers always put
/// back the hook that was installed before the first of them started.
fn guarded<F>(read: F) -> Result<Option<FormFields>>
where
    F: FnOnce() -> Result<Option<FormFields>>,
{
    let _lock = HOOK_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

    // Keep the default hook from printing the panic to stderr
    let previous_hook = panic::take_hook();
    panic::set_hook(Box::new(|info| {
        debug!(panic = %info, "PDF library panicked");
    }));

    let outcome = panic::catch_unwind(AssertUnwindSafe(read));

    panic::set_hook(previous_hook);

    match outcome {
        Ok(result) => result,
        Err(payload) => Err(Error::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::FormField;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Held by tests that install their own panic hook, so they don't swap each other's
    static INSTALLED_HOOK_TESTS: Mutex<()> = Mutex::new(());

    fn field(name: &str) -> FormField {
        FormField {
            name: name.to_string(),
            partial_name: name.to_string(),
            field_type: None,
            value: None,
        }
    }

    #[test]
    fn test_fields_report_format() {
        let mut fields = FormFields::new();
        fields.insert(field("Name"));
        fields.insert(field("Email"));

        let report = Report::from_fields(Path::new("form.pdf"), Some(fields));
        assert_eq!(
            report.to_string(),
            "Form fields in 'form.pdf':\n  - Name: Name\n  - Name: Email\n"
        );
        assert!(!report.is_failure());
    }

    #[test]
    fn test_empty_mapping_is_no_fields() {
        let report = Report::from_fields(Path::new("plain.pdf"), Some(FormFields::new()));
        assert_eq!(report.to_string(), "No form fields found in 'plain.pdf'.\n");
    }

    #[test]
    fn test_absent_form_is_no_fields() {
        let report = Report::from_fields(Path::new("plain.pdf"), None);
        assert_eq!(report, Report::NoFields { path: PathBuf::from("plain.pdf") });
    }

    #[test]
    fn test_failed_report_format() {
        let report = Report::from_error(
            Path::new("broken.pdf"),
            &Error::General("bad xref".to_string()),
        );
        assert_eq!(
            report.to_string(),
            "Error processing PDF file 'broken.pdf': bad xref\n"
        );
        assert!(report.is_failure());
    }

    #[test]
    fn test_extract_nonexistent_file() {
        let report = extract(Path::new("does-not-exist.pdf"));
        assert!(report.is_failure());
        assert_eq!(report.path(), Path::new("does-not-exist.pdf"));
        assert_eq!(
            report.to_string(),
            "Error processing PDF file 'does-not-exist.pdf': File not found: does-not-exist.pdf\n"
        );
    }

    #[test]
    fn test_write_to_matches_display() {
        let report = Report::NoFields { path: PathBuf::from("a.pdf") };
        let mut buffer = Vec::new();
        report.write_to(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), report.to_string());
    }

    #[test]
    fn test_library_panic_becomes_failed_report() {
        let result = guarded(|| panic!("boom"));
        let error = result.unwrap_err();
        assert!(matches!(&error, Error::Panic(message) if message == "boom"));

        let report = Report::from_error(Path::new("crash.pdf"), &error);
        assert!(report.is_failure());
        assert_eq!(
            report.to_string(),
            "Error processing PDF file 'crash.pdf': PDF library panicked: boom\n"
        );
    }

    #[test]
    fn test_guarded_passes_results_through() {
        let result = guarded(|| Err(Error::General("bad xref".to_string())));
        assert!(matches!(result, Err(Error::General(_))));

        let result = guarded(|| Ok(None));
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_guarded_restores_installed_hook() {
        let _serial = INSTALLED_HOOK_TESTS.lock().unwrap_or_else(PoisonError::into_inner);
        let fired = Arc::new(AtomicBool::new(false));

        let original = {
            let _lock = HOOK_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            let original = panic::take_hook();
            let flag = Arc::clone(&fired);
            panic::set_hook(Box::new(move |_| flag.store(true, Ordering::SeqCst)));
            original
        };

        let result = guarded(|| panic!("muted"));
        assert!(matches!(result, Err(Error::Panic(_))));
        assert!(!fired.load(Ordering::SeqCst), "hook is muted while reading");

        let _lock = HOOK_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let after = panic::catch_unwind(|| panic!("after"));
        panic::set_hook(original);

        assert!(after.is_err());
        assert!(fired.load(Ordering::SeqCst), "installed hook is back in place");
    }

    #[test]
    fn test_concurrent_extract_keeps_installed_hook() {
        let _serial = INSTALLED_HOOK_TESTS.lock().unwrap_or_else(PoisonError::into_inner);
        let fired = Arc::new(AtomicBool::new(false));

        let original = {
            let _lock = HOOK_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            let original = panic::take_hook();
            let flag = Arc::clone(&fired);
            panic::set_hook(Box::new(move |_| flag.store(true, Ordering::SeqCst)));
            original
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    for _ in 0..20 {
                        let _ = guarded(|| panic!("worker"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let _lock = HOOK_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let after = panic::catch_unwind(|| panic!("after"));
        panic::set_hook(original);

        assert!(after.is_err());
        assert!(fired.load(Ordering::SeqCst), "installed hook survives concurrent callers");
    }

    #[test]
    fn test_panic_message_from_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(payload.as_ref()), "owned boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
