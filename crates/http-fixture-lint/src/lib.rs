//! Linting library for markdown HTTP fixtures.
//!
//! Checks fixture files for structural errors, malformed placeholders and
//! likely mistakes, and verifies recorded responses against fixtures. It can
//! be used as a library or through the `http-fixture-lint` binary.
//!
//! # Example
//!
//! ```no_run
//! use http_fixture_lint::{lint_file, LintOptions};
//! use std::path::Path;
//!
//! let result = lint_file(Path::new("fixtures/create-example.md"), &LintOptions::default());
//!
//! if result.has_errors() {
//!     eprintln!("Found {} errors", result.errors);
//! }
//! ```

mod types;
mod validator;
mod verify;

use std::path::Path;
use tracing::debug;

pub use types::{LintIssue, LintOptions, LintResult, Severity};
pub use validator::{error_issue, validate_fixture};
pub use verify::{verify_file, verify_str, VerifyError};

/// Lint a single fixture file. An unreadable file is reported as E001.
pub fn lint_file(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            result.add_issue(
                LintIssue::error("E001", format!("Failed to read file: {e}"), path.to_path_buf())
                    .with_suggestion("Check that the path exists and is a readable text file"),
            );
            return result;
        }
    };

    validate_fixture(path, &content, &mut result, options);
    debug!(
        "linted {}: {} error(s), {} warning(s)",
        path.display(),
        result.errors,
        result.warnings
    );
    result
}

/// Lint every file in `paths`, in order. Only the named files are read.
pub fn lint_files<P: AsRef<Path>>(paths: &[P], options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    for path in paths {
        result.merge(lint_file(path.as_ref(), options));
    }
    result
}

/// Lint fixture text directly (useful for in-memory validation).
pub fn lint_str(text: &str, source_name: &str, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;

    validate_fixture(Path::new(source_name), text, &mut result, options);
    result
}
