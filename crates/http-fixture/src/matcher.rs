//! Recursive matching of actual values against compiled patterns.
//!
//! Matching never fails with an error. Every discrepancy in the tree is
//! collected into a [`MatchResult`] together with the path where it occurred.

use crate::message::Headers;
use crate::path;
use crate::pattern::{literal_eq, ArrayPattern, Expression, HeaderPatterns, Kind, Pattern};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use tracing::trace;

/// Part of a response a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Status,
    Protocol,
    Header,
    Body,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Scope::Status => "status",
            Scope::Protocol => "protocol",
            Scope::Header => "header",
            Scope::Body => "body",
        };
        f.write_str(label)
    }
}

/// Category of a single mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Actual value has the wrong kind.
    KindMismatch,
    /// Same kind, different literal value.
    ValueMismatch,
    /// A predicate of an expression did not hold.
    PredicateFailed,
    /// Object member required by the pattern is absent.
    MissingKey,
    /// Array has the wrong number of elements.
    LengthMismatch,
    MissingHeader,
    StatusMismatch,
    ProtocolMismatch,
    /// Observed body is absent or not JSON where JSON is expected.
    InvalidBody,
}

/// One mismatch: where, what was expected, what was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub scope: Scope,
    pub path: String,
    pub kind: FailureKind,
    /// Human-readable expectation.
    pub expected: String,
    /// The actual value, or `None` when nothing was there.
    pub actual: Option<Value>,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: expected {}, got ",
            self.scope,
            path::display(&self.path),
            self.expected
        )?;
        match &self.actual {
            Some(value) => write!(f, "{value}"),
            None => f.write_str("nothing"),
        }
    }
}

/// Outcome of a match. Success means no failures were recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    failures: Vec<Failure>,
}

impl MatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<Failure> {
        self.failures
    }

    pub fn push(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    pub fn merge(&mut self, other: MatchResult) {
        self.failures.extend(other.failures);
    }
}

impl Serialize for MatchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MatchResult", 2)?;
        state.serialize_field("success", &self.is_success())?;
        state.serialize_field("failures", &self.failures)?;
        state.end()
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            return f.write_str("match");
        }
        writeln!(f, "{} mismatch(es):", self.failures.len())?;
        for failure in &self.failures {
            writeln!(f, "  - {failure}")?;
        }
        Ok(())
    }
}

struct Matcher {
    scope: Scope,
    result: MatchResult,
}

impl Matcher {
    fn new(scope: Scope) -> Self {
        Self {
            scope,
            result: MatchResult::new(),
        }
    }

    fn fail(&mut self, at: &str, kind: FailureKind, expected: String, actual: Option<&Value>) {
        trace!("{} mismatch at {}: expected {}", self.scope, path::display(at), expected);
        self.result.push(Failure {
            scope: self.scope,
            path: at.to_string(),
            kind,
            expected,
            actual: actual.cloned(),
        });
    }

    fn visit(&mut self, pattern: &Pattern, actual: &Value, at: &str) {
        match pattern {
            Pattern::Literal(expected) => {
                if !literal_eq(expected, actual) {
                    let kind = if Kind::of(expected) == Kind::of(actual) {
                        FailureKind::ValueMismatch
                    } else {
                        FailureKind::KindMismatch
                    };
                    self.fail(at, kind, expected.to_string(), Some(actual));
                }
            }
            Pattern::TypeWildcard(kind) => {
                if !kind.accepts(actual) {
                    self.fail(
                        at,
                        FailureKind::KindMismatch,
                        kind.describe().to_string(),
                        Some(actual),
                    );
                }
            }
            Pattern::AnyWildcard => {}
            Pattern::Expression(expression) => self.visit_expression(expression, actual, at),
            Pattern::Object(members) => self.visit_object(members, actual, at),
            Pattern::Array(array) => self.visit_array(array, actual, at),
        }
    }

    fn visit_expression(&mut self, expression: &Expression, actual: &Value, at: &str) {
        if !expression.kind.accepts(actual) {
            self.fail(
                at,
                FailureKind::KindMismatch,
                expression.kind.describe().to_string(),
                Some(actual),
            );
            return;
        }
        for predicate in &expression.predicates {
            if !predicate.evaluate(actual) {
                self.fail(
                    at,
                    FailureKind::PredicateFailed,
                    format!("{} matching {}", expression.kind.describe(), predicate),
                    Some(actual),
                );
            }
        }
    }

    fn visit_object(&mut self, members: &[(String, Pattern)], actual: &Value, at: &str) {
        let Some(object) = actual.as_object() else {
            self.fail(
                at,
                FailureKind::KindMismatch,
                Kind::Object.describe().to_string(),
                Some(actual),
            );
            return;
        };

        for (key, child) in members {
            let child_path = path::key(at, key);
            match object.get(key) {
                Some(value) => self.visit(child, value, &child_path),
                None if *child == Pattern::AnyWildcard => {}
                None => self.fail(
                    &child_path,
                    FailureKind::MissingKey,
                    format!("member {key:?} matching {child}"),
                    None,
                ),
            }
        }
    }

    fn visit_array(&mut self, array: &ArrayPattern, actual: &Value, at: &str) {
        let Some(elements) = actual.as_array() else {
            self.fail(
                at,
                FailureKind::KindMismatch,
                Kind::Array.describe().to_string(),
                Some(actual),
            );
            return;
        };

        let expected_len = array.items.len();
        let length_ok = if array.open_tail {
            elements.len() >= expected_len
        } else {
            elements.len() == expected_len
        };
        if !length_ok {
            let expected = if array.open_tail {
                format!("at least {expected_len} element(s)")
            } else {
                format!("{expected_len} element(s)")
            };
            self.fail(
                at,
                FailureKind::LengthMismatch,
                expected,
                Some(&Value::from(elements.len())),
            );
        }

        for (idx, (item, element)) in array.items.iter().zip(elements).enumerate() {
            self.visit(item, element, &path::index(at, idx));
        }
    }
}

/// Match an actual JSON value against a compiled pattern.
pub fn match_value(pattern: &Pattern, actual: &Value) -> MatchResult {
    let mut matcher = Matcher::new(Scope::Body);
    matcher.visit(pattern, actual, path::ROOT);
    matcher.result
}

/// Match actual headers against compiled header patterns.
///
/// Names compare case-insensitively. Actual headers not named in the
/// patterns are ignored.
pub fn match_headers(patterns: &HeaderPatterns, actual: &Headers) -> MatchResult {
    let mut matcher = Matcher::new(Scope::Header);
    for (name, pattern) in patterns.iter() {
        match actual.get(name) {
            Some(value) => matcher.visit(pattern, &Value::String(value.to_string()), name),
            None if *pattern == Pattern::AnyWildcard => {}
            None => matcher.fail(
                name,
                FailureKind::MissingHeader,
                format!("header matching {pattern}"),
                None,
            ),
        }
    }
    matcher.result
}
