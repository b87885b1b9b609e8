//! Error taxonomy for fixture parsing and pattern compilation.
//!
//! Every error is raised eagerly while a fixture is parsed or compiled.
//! Matching never fails with an error; mismatches are reported as data in
//! [`crate::MatchResult`].

use crate::message::Role;

/// Errors raised while parsing a fixture document or compiling its patterns.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FixtureError {
    /// Document structure is broken (separator, sections, fences).
    #[error("malformed fixture: {reason}")]
    MalformedFixture { reason: String, line: Option<usize> },

    #[error("malformed {role} start line at line {line}: {reason} (got {text:?})")]
    MalformedStartLine {
        role: Role,
        line: usize,
        text: String,
        reason: String,
    },

    #[error("malformed {role} header at line {line}: {reason} (got {text:?})")]
    MalformedHeader {
        role: Role,
        line: usize,
        text: String,
        reason: String,
    },

    #[error("duplicate {role} header {name:?} at line {line}")]
    DuplicateHeader { role: Role, line: usize, name: String },

    /// The JSON body block did not parse. `body_line`/`body_column` are the
    /// position reported by the JSON parser inside the block.
    #[error("malformed {role} body at line {body_line}, column {body_column}: {message}")]
    MalformedBody {
        role: Role,
        line: usize,
        body_line: usize,
        body_column: usize,
        message: String,
    },

    /// A placeholder string could not be compiled. `path` locates the leaf.
    #[error("malformed pattern at {path}: {source}")]
    MalformedPattern { path: String, source: PatternError },
}

impl FixtureError {
    pub(crate) fn malformed(reason: impl Into<String>, line: Option<usize>) -> Self {
        FixtureError::MalformedFixture {
            reason: reason.into(),
            line,
        }
    }

    /// Document line the error points at, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            FixtureError::MalformedFixture { line, .. } => *line,
            FixtureError::MalformedStartLine { line, .. }
            | FixtureError::MalformedHeader { line, .. }
            | FixtureError::DuplicateHeader { line, .. } => Some(*line),
            FixtureError::MalformedBody {
                line, body_line, ..
            } => Some(line + body_line.saturating_sub(1)),
            FixtureError::MalformedPattern { .. } => None,
        }
    }
}

/// Errors in the placeholder grammar of a single string leaf.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("placeholder {0:?} is missing its closing '@'")]
    UnbalancedDelimiter(String),

    #[error("unknown placeholder kind {0:?}")]
    UnknownKind(String),

    #[error("unknown predicate {0:?}")]
    UnknownPredicate(String),

    #[error("invalid arguments for {predicate}: {reason}")]
    InvalidArguments { predicate: String, reason: String },

    #[error("predicate {predicate} cannot be applied to @{kind}@")]
    PredicateNotApplicable { predicate: String, kind: String },

    #[error("\"@...@\" is only allowed as the last element of an array")]
    MisplacedTail,

    #[error("unexpected input {0:?} after placeholder")]
    TrailingInput(String),

    #[error("placeholder @{kind}@ is not allowed in {context}")]
    KindNotAllowed { kind: String, context: String },
}
