//! Verification of an observed response against a fixture's response side.

use crate::error::FixtureError;
use crate::fixture::FixtureDocument;
use crate::matcher::{match_headers, match_value, Failure, FailureKind, MatchResult, Scope};
use crate::message::{Body, Headers, HttpMessage, Role, StartLine};
use crate::path;
use crate::pattern::{compile, compile_headers, HeaderPatterns, Pattern};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Options that modify how a response is verified.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchOptions {
    /// Compare the observed protocol version with the fixture's.
    #[serde(default)]
    pub check_protocol_version: bool,

    /// Compare the observed status code with the fixture's.
    #[serde(default = "default_check_status")]
    pub check_status: bool,
}

fn default_check_status() -> bool {
    true
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            check_protocol_version: false,
            check_status: default_check_status(),
        }
    }
}

/// A response as seen by whatever executed the fixture's request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "ObservedResponseRepr")]
pub struct ObservedResponse {
    pub protocol_version: Option<String>,
    pub status_code: u16,
    pub headers: Headers,
    pub body: Body,
}

/// Wire form: `body` holds JSON, `rawBody` holds unparsed text.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObservedResponseRepr {
    #[serde(default)]
    protocol_version: Option<String>,
    status_code: u16,
    #[serde(default)]
    headers: Headers,
    #[serde(default, deserialize_with = "present")]
    body: Option<Value>,
    #[serde(default)]
    raw_body: Option<String>,
}

/// Keeps an explicit `"body": null` as a JSON null body.
fn present<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl From<ObservedResponseRepr> for ObservedResponse {
    fn from(repr: ObservedResponseRepr) -> Self {
        let body = match (repr.body, repr.raw_body) {
            (Some(value), _) => Body::Json(value),
            (None, Some(text)) => Body::Raw(text),
            (None, None) => Body::Empty,
        };
        Self {
            protocol_version: repr.protocol_version,
            status_code: repr.status_code,
            headers: repr.headers,
            body,
        }
    }
}

/// Expected body of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedBody {
    Json(Pattern),
    /// Exact text, for messages built with a raw body.
    Text(String),
}

/// Compiled response side of a fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    protocol_version: String,
    status_code: u16,
    headers: HeaderPatterns,
    body: Option<ExpectedBody>,
}

impl Expectation {
    /// Compile a response message. Fails for request messages and for
    /// malformed placeholders.
    pub fn compile(message: &HttpMessage) -> Result<Self, FixtureError> {
        let StartLine::Status {
            protocol_version,
            status_code,
        } = message.start_line()
        else {
            return Err(FixtureError::malformed(
                format!("expected a {} message, got a {}", Role::Response, message.role()),
                None,
            ));
        };

        let headers = compile_headers(message.headers())?;
        let body = match message.body() {
            Body::Empty => None,
            Body::Json(value) => Some(ExpectedBody::Json(compile(value)?)),
            Body::Raw(text) => Some(ExpectedBody::Text(text.clone())),
        };

        Ok(Self {
            protocol_version: protocol_version.clone(),
            status_code: *status_code,
            headers,
            body,
        })
    }

    pub fn from_document(document: &FixtureDocument) -> Result<Self, FixtureError> {
        Self::compile(document.response())
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn headers(&self) -> &HeaderPatterns {
        &self.headers
    }

    /// `None` when the fixture has no body block; the body is then not checked.
    pub fn body(&self) -> Option<&ExpectedBody> {
        self.body.as_ref()
    }

    /// Check an observed response. Every mismatch is collected.
    pub fn verify(&self, observed: &ObservedResponse, options: &MatchOptions) -> MatchResult {
        let mut result = MatchResult::new();

        if options.check_status && observed.status_code != self.status_code {
            result.push(Failure {
                scope: Scope::Status,
                path: path::ROOT.to_string(),
                kind: FailureKind::StatusMismatch,
                expected: self.status_code.to_string(),
                actual: Some(Value::from(observed.status_code)),
            });
        }

        if options.check_protocol_version
            && observed.protocol_version.as_deref() != Some(self.protocol_version.as_str())
        {
            result.push(Failure {
                scope: Scope::Protocol,
                path: path::ROOT.to_string(),
                kind: FailureKind::ProtocolMismatch,
                expected: format!("HTTP/{}", self.protocol_version),
                actual: observed
                    .protocol_version
                    .as_ref()
                    .map(|v| Value::String(format!("HTTP/{v}"))),
            });
        }

        result.merge(match_headers(&self.headers, &observed.headers));

        match &self.body {
            Some(ExpectedBody::Json(pattern)) => {
                result.merge(verify_json_body(pattern, &observed.body))
            }
            Some(ExpectedBody::Text(text)) => {
                result.merge(verify_text_body(text, &observed.body))
            }
            None => {}
        }

        debug!(
            "verified response (expected status {}): {} failure(s)",
            self.status_code,
            result.failures().len()
        );
        result
    }
}

fn body_failure(expected: &str, actual: Option<Value>) -> MatchResult {
    let mut result = MatchResult::new();
    result.push(Failure {
        scope: Scope::Body,
        path: path::ROOT.to_string(),
        kind: FailureKind::InvalidBody,
        expected: expected.to_string(),
        actual,
    });
    result
}

fn verify_text_body(expected: &str, observed: &Body) -> MatchResult {
    let actual = match observed {
        Body::Raw(text) => Value::String(text.clone()),
        Body::Json(value) => Value::String(value.to_string()),
        Body::Empty => return body_failure("a body", None),
    };
    match_value(&Pattern::Literal(Value::String(expected.to_string())), &actual)
}

fn verify_json_body(pattern: &Pattern, observed: &Body) -> MatchResult {
    match observed {
        Body::Json(value) => match_value(pattern, value),
        Body::Raw(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => match_value(pattern, &value),
            Err(e) => body_failure(
                &format!("a JSON body ({e})"),
                Some(Value::String(text.clone())),
            ),
        },
        Body::Empty if *pattern == Pattern::AnyWildcard => MatchResult::new(),
        Body::Empty => body_failure("a body", None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::parse;
    use serde_json::json;

    const FIXTURE: &str = r#"# Request

```http request
POST /api/examples
Content-Type: application/json
```

```json
{"title": "Test"}
```

---

# Response

```http request
HTTP/1.1 201 Created
Content-Type: application/json
Location: @string@.startsWith('/api/examples/')
```

```json
{"id": "@integer@", "title": "Test"}
```
"#;

    fn expectation() -> Expectation {
        Expectation::from_document(&parse(FIXTURE).unwrap()).unwrap()
    }

    fn observed(status: u16, body: Body) -> ObservedResponse {
        ObservedResponse {
            protocol_version: Some("1.1".to_string()),
            status_code: status,
            headers: [
                ("content-type", "application/json"),
                ("location", "/api/examples/7"),
            ]
            .into_iter()
            .collect(),
            body,
        }
    }

    #[test]
    fn test_verify_success() {
        let response = observed(201, Body::Json(json!({"id": 7, "title": "Test", "extra": 1})));
        let result = expectation().verify(&response, &MatchOptions::default());
        assert!(result.is_success(), "{result}");
    }

    #[test]
    fn test_verify_collects_status_and_body_failures() {
        let response = observed(200, Body::Json(json!({"id": "7", "title": "Test"})));
        let result = expectation().verify(&response, &MatchOptions::default());
        let scopes: Vec<_> = result.failures().iter().map(|f| f.scope).collect();
        assert_eq!(scopes, vec![Scope::Status, Scope::Body]);
    }

    #[test]
    fn test_status_check_can_be_disabled() {
        let response = observed(200, Body::Json(json!({"id": 7, "title": "Test"})));
        let options = MatchOptions {
            check_status: false,
            ..MatchOptions::default()
        };
        assert!(expectation().verify(&response, &options).is_success());
    }

    #[test]
    fn test_protocol_version_check() {
        let mut response = observed(201, Body::Json(json!({"id": 7, "title": "Test"})));
        response.protocol_version = Some("2".to_string());
        assert!(expectation()
            .verify(&response, &MatchOptions::default())
            .is_success());

        let options = MatchOptions {
            check_protocol_version: true,
            ..MatchOptions::default()
        };
        let result = expectation().verify(&response, &options);
        assert_eq!(result.failures()[0].kind, FailureKind::ProtocolMismatch);
    }

    #[test]
    fn test_raw_body_is_parsed_as_json() {
        let response = observed(201, Body::Raw(r#"{"id": 7, "title": "Test"}"#.to_string()));
        assert!(expectation()
            .verify(&response, &MatchOptions::default())
            .is_success());

        let response = observed(201, Body::Raw("<html>".to_string()));
        let result = expectation().verify(&response, &MatchOptions::default());
        assert_eq!(result.failures()[0].kind, FailureKind::InvalidBody);
    }

    #[test]
    fn test_missing_body() {
        let response = observed(201, Body::Empty);
        let result = expectation().verify(&response, &MatchOptions::default());
        assert_eq!(result.failures()[0].kind, FailureKind::InvalidBody);
        assert_eq!(result.failures()[0].actual, None);
    }

    #[test]
    fn test_bodyless_expectation_ignores_body() {
        let text = "```http request\nDELETE /x\n```\n---\n\
                    ```http request\nHTTP/1.1 204 No Content\n```\n";
        let document = parse(text).unwrap();
        let expectation = Expectation::from_document(&document).unwrap();
        let response = ObservedResponse {
            protocol_version: None,
            status_code: 204,
            headers: Headers::new(),
            body: Body::Raw("ignored".to_string()),
        };
        assert!(expectation
            .verify(&response, &MatchOptions::default())
            .is_success());
    }

    #[test]
    fn test_request_message_is_rejected() {
        let document = parse(FIXTURE).unwrap();
        let err = Expectation::compile(document.request()).unwrap_err();
        assert!(matches!(err, FixtureError::MalformedFixture { .. }));
    }

    #[test]
    fn test_observed_response_deserialization() {
        let response: ObservedResponse = serde_json::from_value(json!({
            "statusCode": 201,
            "headers": {"Content-Type": "application/json"},
            "body": {"id": 1}
        }))
        .unwrap();
        assert_eq!(response.body, Body::Json(json!({"id": 1})));
        assert_eq!(response.protocol_version, None);

        let raw: ObservedResponse =
            serde_json::from_value(json!({"statusCode": 500, "rawBody": "oops"})).unwrap();
        assert_eq!(raw.body, Body::Raw("oops".to_string()));
        assert!(raw.headers.is_empty());

        let null: ObservedResponse =
            serde_json::from_value(json!({"statusCode": 200, "body": null})).unwrap();
        assert_eq!(null.body, Body::Json(Value::Null));
    }

    #[test]
    fn test_match_options_defaults() {
        let options: MatchOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, MatchOptions::default());
        assert!(options.check_status);
        assert!(!options.check_protocol_version);
    }
}
