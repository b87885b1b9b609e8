//! Verification of a recorded response against a fixture file.

use http_fixture::{parse, Expectation, FixtureError, MatchOptions, MatchResult, ObservedResponse};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Errors that stop a verification before any matching happens.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid fixture: {0}")]
    Fixture(#[from] FixtureError),

    #[error("invalid response document: {0}")]
    Response(#[from] serde_json::Error),
}

fn read(path: &Path) -> Result<String, VerifyError> {
    std::fs::read_to_string(path).map_err(|source| VerifyError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Verify a JSON-encoded [`ObservedResponse`] against fixture text.
pub fn verify_str(
    fixture: &str,
    response: &str,
    options: &MatchOptions,
) -> Result<MatchResult, VerifyError> {
    let expectation = Expectation::from_document(&parse(fixture)?)?;
    let observed: ObservedResponse = serde_json::from_str(response)?;
    Ok(expectation.verify(&observed, options))
}

/// Verify the response stored at `response` against the fixture at `fixture`.
pub fn verify_file(
    fixture: &Path,
    response: &Path,
    options: &MatchOptions,
) -> Result<MatchResult, VerifyError> {
    debug!(
        "verifying {} against {}",
        response.display(),
        fixture.display()
    );
    verify_str(&read(fixture)?, &read(response)?, options)
}
