//! Validation of a single fixture document.

use crate::types::{LintIssue, LintOptions, LintResult};
use http_fixture::{
    compile, parse, path, Body, Expectation, FixtureError, HttpMessage, Pattern, Role,
};
use serde_json::Value;
use std::path::Path;

const STANDARD_METHODS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
];

/// Validate fixture text: structure and placeholders first, then warnings.
pub fn validate_fixture(file: &Path, text: &str, result: &mut LintResult, options: &LintOptions) {
    let document = match parse(text) {
        Ok(document) => document,
        Err(e) => {
            result.add_issue(error_issue(file, &e));
            return;
        }
    };

    if let Err(e) = Expectation::from_document(&document) {
        result.add_issue(error_issue(file, &e));
    }

    if options.errors_only {
        return;
    }

    let request = document.request();
    check_content_type(file, request, result);
    check_method(file, request, result);
    check_request_placeholders(file, request, result);
    check_status_range(file, document.response(), result);
}

/// Map a parse or compile error to its lint issue.
pub fn error_issue(file: &Path, error: &FixtureError) -> LintIssue {
    let (code, suggestion) = match error {
        FixtureError::MalformedFixture { .. } => (
            "E002",
            "Write a request section and a response section separated by one '---' line",
        ),
        FixtureError::MalformedStartLine {
            role: Role::Request,
            ..
        } => ("E003", "Start the request block with '<METHOD> <TARGET>'"),
        FixtureError::MalformedStartLine { .. } => (
            "E003",
            "Start the response block with 'HTTP/<major>.<minor> <status> <reason>'",
        ),
        FixtureError::MalformedHeader { .. } => (
            "E004",
            "Write one 'Name: Value' header per line, with no blank line in between",
        ),
        FixtureError::DuplicateHeader { .. } => (
            "E005",
            "Header names are case-insensitive; keep a single line per header",
        ),
        FixtureError::MalformedBody { .. } => {
            ("E006", "The json block must hold exactly one valid JSON value")
        }
        FixtureError::MalformedPattern { .. } => (
            "E007",
            "Placeholders look like \"@integer@\" or \"@string@.startsWith('x')\"",
        ),
    };

    let issue = LintIssue::error(code, error.to_string(), file.to_path_buf())
        .with_line(error.line())
        .with_suggestion(suggestion);

    match error {
        FixtureError::MalformedPattern { path, .. } => issue.with_location(path.clone()),
        _ => issue,
    }
}

fn check_content_type(file: &Path, request: &HttpMessage, result: &mut LintResult) {
    if request.body().is_empty() || request.headers().contains("Content-Type") {
        return;
    }
    result.add_issue(
        LintIssue::warning(
            "W001",
            "Request has a body but no Content-Type header",
            file.to_path_buf(),
        )
        .with_location("request.headers")
        .with_suggestion("Add 'Content-Type: application/json' to the request block"),
    );
}

fn check_method(file: &Path, request: &HttpMessage, result: &mut LintResult) {
    let Some(method) = request.method() else {
        return;
    };
    if STANDARD_METHODS.contains(&method) {
        return;
    }

    let mut issue = LintIssue::warning(
        "W002",
        format!("Non-standard request method: {method}"),
        file.to_path_buf(),
    )
    .with_location("request.method");
    let upper = method.to_ascii_uppercase();
    if STANDARD_METHODS.contains(&upper.as_str()) {
        issue = issue.with_suggestion(format!("Methods are case-sensitive, did you mean {upper}?"));
    }
    result.add_issue(issue);
}

fn check_request_placeholders(file: &Path, request: &HttpMessage, result: &mut LintResult) {
    let Body::Json(body) = request.body() else {
        return;
    };

    let mut found = Vec::new();
    collect_placeholders(body, path::ROOT, &mut found);

    for (location, text) in found {
        result.add_issue(
            LintIssue::warning(
                "W003",
                format!("Request body string {text:?} looks like a placeholder"),
                file.to_path_buf(),
            )
            .with_location(path::display(&location))
            .with_suggestion(
                "Placeholders only apply to the response; the request is sent as written",
            ),
        );
    }
}

fn looks_like_placeholder(text: &str) -> bool {
    !matches!(
        compile(&Value::String(text.to_string())),
        Ok(Pattern::Literal(_))
    )
}

/// Collect `(path, text)` of placeholder-looking strings, with paths written
/// the way `MalformedPattern` paths are.
fn collect_placeholders(value: &Value, at: &str, found: &mut Vec<(String, String)>) {
    match value {
        Value::String(text) if looks_like_placeholder(text) => {
            found.push((at.to_string(), text.clone()))
        }
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                collect_placeholders(item, &path::index(at, idx), found);
            }
        }
        Value::Object(members) => {
            for (key, member) in members {
                collect_placeholders(member, &path::key(at, key), found);
            }
        }
        _ => {}
    }
}

fn check_status_range(file: &Path, response: &HttpMessage, result: &mut LintResult) {
    let Some(status) = response.status_code() else {
        return;
    };
    if (100..=599).contains(&status) {
        return;
    }
    result.add_issue(
        LintIssue::warning(
            "W004",
            format!("Status code {status} is outside the 100-599 range"),
            file.to_path_buf(),
        )
        .with_location("response.status"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file() -> PathBuf {
        PathBuf::from("fixture.md")
    }

    #[test]
    fn test_error_codes() {
        let cases = [
            (http_fixture::parse("no separator").unwrap_err(), "E002"),
            (
                FixtureError::MalformedPattern {
                    path: "id".to_string(),
                    source: http_fixture::PatternError::UnknownKind("uuid".to_string()),
                },
                "E007",
            ),
        ];
        for (error, code) in cases {
            assert_eq!(error_issue(&file(), &error).code, code);
        }
    }

    #[test]
    fn test_pattern_error_location() {
        let error = FixtureError::MalformedPattern {
            path: "data.items[0]".to_string(),
            source: http_fixture::PatternError::MisplacedTail,
        };
        let issue = error_issue(&file(), &error);
        assert_eq!(issue.location.as_deref(), Some("data.items[0]"));
        assert_eq!(issue.line, None);
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(looks_like_placeholder("@integer@"));
        assert!(looks_like_placeholder("@string@.startsWith('a')"));
        assert!(looks_like_placeholder("@integer"));
        assert!(!looks_like_placeholder("user@example.com"));
        assert!(!looks_like_placeholder("@handle"));
    }

    #[test]
    fn test_collect_placeholders_paths() {
        let body = serde_json::json!({
            "id": "@integer@",
            "tags": ["a", "@*@"],
            "mail": "a@b.c",
            "a b": {"1st": "@string@"}
        });
        let mut found = Vec::new();
        collect_placeholders(&body, path::ROOT, &mut found);
        let paths: Vec<_> = found.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec![r#"["a b"]["1st"]"#, "id", "tags[1]"]);
    }

    #[test]
    fn test_placeholder_paths_match_pattern_error_paths() {
        let body = serde_json::json!({"a b": ["@integer"]});
        let mut found = Vec::new();
        collect_placeholders(&body, path::ROOT, &mut found);

        let Err(FixtureError::MalformedPattern { path, .. }) = compile(&body) else {
            panic!("expected a pattern error");
        };
        assert_eq!(found[0].0, path);
        assert_eq!(path, r#"["a b"][0]"#);
    }

    #[test]
    fn test_root_placeholder_location() {
        let text = "```http request\nPOST /\nContent-Type: application/json\n```\n\
                    ```json\n\"@string@\"\n```\n---\n```http request\nHTTP/1.1 204\n```\n";
        let mut result = LintResult::new();
        validate_fixture(&file(), text, &mut result, &LintOptions::default());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].location.as_deref(), Some("$"));
    }
}
