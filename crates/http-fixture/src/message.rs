//! HTTP message model and the head/body block parser.

use crate::error::FixtureError;
use crate::markdown::{FencedBlock, BODY_BLOCK_TAG, HEAD_BLOCK_TAG};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use tracing::debug;

static REQUEST_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\S+)\s+(\S.*?)\s*$").expect("request line expression must compile")
});
static STATUS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^HTTP/(\S+)\s+(\S+)(?:\s+.*)?$").expect("status line expression must compile")
});
static PROTOCOL_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+$").expect("protocol version expression must compile"));

/// Which side of the exchange a message describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Request,
    Response,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Request => f.write_str("request"),
            Role::Response => f.write_str("response"),
        }
    }
}

/// First line of a head block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    /// `<METHOD> <TARGET>`
    Request { method: String, target: String },
    /// `HTTP/<version> <status> <reason>`; the reason phrase is not kept.
    Status {
        protocol_version: String,
        status_code: u16,
    },
}

impl StartLine {
    pub fn role(&self) -> Role {
        match self {
            StartLine::Request { .. } => Role::Request,
            StartLine::Status { .. } => Role::Response,
        }
    }
}

impl fmt::Display for StartLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartLine::Request { method, target } => write!(f, "{method} {target}"),
            StartLine::Status {
                protocol_version,
                status_code,
            } => match reason_phrase(*status_code) {
                Some(reason) => write!(f, "HTTP/{protocol_version} {status_code} {reason}"),
                None => write!(f, "HTTP/{protocol_version} {status_code}"),
            },
        }
    }
}

/// Standard reason phrase for a status code.
pub fn reason_phrase(status_code: u16) -> Option<&'static str> {
    let reason = match status_code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        409 => "Conflict",
        410 => "Gone",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => return None,
    };
    Some(reason)
}

/// Ordered header list with case-insensitive lookup.
///
/// Names keep the case they were written with. A name appears at most once,
/// compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header. Returns `false` and leaves the list unchanged when a
    /// header with the same name already exists.
    pub fn try_insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, value.into()));
        true
    }

    /// Insert a header, folding a repeated name into the existing entry as a
    /// comma-separated list.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => {
                let existing = &mut self.entries[idx].1;
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Headers in the order they were written.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
                let mut headers = Headers::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    headers.append(name, value);
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

/// Message payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No body block.
    #[default]
    Empty,
    /// Unparsed text, used for observed responses.
    Raw(String),
    /// Parsed JSON; an explicit `null` body is `Json(Value::Null)`.
    Json(Value),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// One side of a fixture: start line, headers and body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpMessage {
    start_line: StartLine,
    headers: Headers,
    body: Body,
}

impl HttpMessage {
    pub fn new(start_line: StartLine, headers: Headers, body: Body) -> Self {
        Self {
            start_line,
            headers,
            body,
        }
    }

    pub fn start_line(&self) -> &StartLine {
        &self.start_line
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn role(&self) -> Role {
        self.start_line.role()
    }

    pub fn method(&self) -> Option<&str> {
        match &self.start_line {
            StartLine::Request { method, .. } => Some(method),
            StartLine::Status { .. } => None,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match &self.start_line {
            StartLine::Request { target, .. } => Some(target),
            StartLine::Status { .. } => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match &self.start_line {
            StartLine::Status { status_code, .. } => Some(*status_code),
            StartLine::Request { .. } => None,
        }
    }

    pub fn protocol_version(&self) -> Option<&str> {
        match &self.start_line {
            StartLine::Status {
                protocol_version, ..
            } => Some(protocol_version),
            StartLine::Request { .. } => None,
        }
    }
}

/// Renders the head block and, when present, the body block.
///
/// A raw body renders as a `text` block, which the fixture parser does not
/// read back; only JSON bodies survive a render/parse round trip.
impl fmt::Display for HttpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "```{HEAD_BLOCK_TAG}")?;
        writeln!(f, "{}", self.start_line)?;
        for (name, value) in self.headers.iter() {
            writeln!(f, "{name}: {value}")?;
        }
        write!(f, "```")?;

        match &self.body {
            Body::Empty => Ok(()),
            Body::Json(value) => {
                let pretty = serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
                write!(f, "\n\n```{BODY_BLOCK_TAG}\n{pretty}\n```")
            }
            Body::Raw(text) => write!(f, "\n\n```text\n{text}\n```"),
        }
    }
}

/// Parse a head block and optional body block into a message.
pub(crate) fn parse_message(
    role: Role,
    head: &FencedBlock<'_>,
    body: Option<&FencedBlock<'_>>,
) -> Result<HttpMessage, FixtureError> {
    let mut lines = head
        .lines
        .iter()
        .enumerate()
        .map(|(idx, line)| (head.content_line() + idx, *line))
        .skip_while(|(_, line)| line.trim().is_empty());

    let (line_no, first) = lines.next().ok_or_else(|| FixtureError::MalformedStartLine {
        role,
        line: head.line,
        text: String::new(),
        reason: "head block is empty".to_string(),
    })?;

    let start_line = match role {
        Role::Request => parse_request_line(first, line_no)?,
        Role::Response => parse_status_line(first, line_no)?,
    };

    let headers = parse_headers(role, lines)?;

    let body = match body {
        Some(block) => parse_body(role, block)?,
        None => Body::Empty,
    };

    debug!(
        "parsed {} head '{}' with {} header(s)",
        role,
        start_line,
        headers.len()
    );

    Ok(HttpMessage::new(start_line, headers, body))
}

fn parse_request_line(text: &str, line: usize) -> Result<StartLine, FixtureError> {
    let caps = REQUEST_LINE
        .captures(text)
        .ok_or_else(|| FixtureError::MalformedStartLine {
            role: Role::Request,
            line,
            text: text.to_string(),
            reason: "expected '<METHOD> <TARGET>'".to_string(),
        })?;

    Ok(StartLine::Request {
        method: caps[1].to_string(),
        target: caps[2].to_string(),
    })
}

fn parse_status_line(text: &str, line: usize) -> Result<StartLine, FixtureError> {
    let malformed = |reason: &str| FixtureError::MalformedStartLine {
        role: Role::Response,
        line,
        text: text.to_string(),
        reason: reason.to_string(),
    };

    let caps = STATUS_LINE
        .captures(text.trim_end())
        .ok_or_else(|| malformed("expected 'HTTP/<major>.<minor> <status> <reason>'"))?;

    let version = &caps[1];
    if !PROTOCOL_VERSION.is_match(version) {
        return Err(malformed("protocol version must be <major>.<minor>"));
    }

    let status = &caps[2];
    if !status.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("status code must be a non-negative integer"));
    }
    let status_code = status
        .parse::<u16>()
        .map_err(|_| malformed("status code is out of range"))?;

    Ok(StartLine::Status {
        protocol_version: version.to_string(),
        status_code,
    })
}

fn parse_headers<'a>(
    role: Role,
    lines: impl Iterator<Item = (usize, &'a str)>,
) -> Result<Headers, FixtureError> {
    let mut headers = Headers::new();
    let mut blank_line = None;

    for (line, text) in lines {
        if text.trim().is_empty() {
            blank_line.get_or_insert(line);
            continue;
        }

        let malformed = |reason: &str| FixtureError::MalformedHeader {
            role,
            line,
            text: text.to_string(),
            reason: reason.to_string(),
        };

        if let Some(blank) = blank_line {
            return Err(malformed(&format!("blank line {blank} before the last header")));
        }

        let (name, value) = text
            .split_once(':')
            .ok_or_else(|| malformed("expected '<Name>: <Value>'"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(malformed("header name is empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(malformed("header name contains whitespace"));
        }

        if !headers.try_insert(name, value.trim()) {
            return Err(FixtureError::DuplicateHeader {
                role,
                line,
                name: name.to_string(),
            });
        }
    }

    Ok(headers)
}

fn parse_body(role: Role, block: &FencedBlock<'_>) -> Result<Body, FixtureError> {
    serde_json::from_str::<Value>(&block.text())
        .map(Body::Json)
        .map_err(|e| FixtureError::MalformedBody {
            role,
            line: block.content_line(),
            body_line: e.line(),
            body_column: e.column(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block<'a>(info: &'a str, lines: &[&'a str]) -> FencedBlock<'a> {
        FencedBlock {
            info,
            line: 1,
            lines: lines.to_vec(),
        }
    }

    #[test]
    fn test_parse_request_with_body() {
        let head = block(HEAD_BLOCK_TAG, &["POST /api/examples", "Accept: application/json"]);
        let body = block(BODY_BLOCK_TAG, &["{\"title\":\"Test\"}"]);
        let message = parse_message(Role::Request, &head, Some(&body)).unwrap();

        assert_eq!(message.method(), Some("POST"));
        assert_eq!(message.target(), Some("/api/examples"));
        assert_eq!(message.headers().get("accept"), Some("application/json"));
        assert_eq!(message.body(), &Body::Json(json!({"title": "Test"})));
    }

    #[test]
    fn test_parse_response_without_body() {
        let head = block(HEAD_BLOCK_TAG, &["HTTP/1.1 200 OK"]);
        let message = parse_message(Role::Response, &head, None).unwrap();

        assert_eq!(message.status_code(), Some(200));
        assert_eq!(message.protocol_version(), Some("1.1"));
        assert!(message.headers().is_empty());
        assert!(message.body().is_empty());
    }

    #[test]
    fn test_target_keeps_inner_spaces_and_trims_trailing() {
        let head = block(HEAD_BLOCK_TAG, &["GET /search?q=a b   "]);
        let message = parse_message(Role::Request, &head, None).unwrap();
        assert_eq!(message.target(), Some("/search?q=a b"));
    }

    #[test]
    fn test_request_line_without_target() {
        let head = block(HEAD_BLOCK_TAG, &["GET"]);
        let err = parse_message(Role::Request, &head, None).unwrap_err();
        assert!(matches!(err, FixtureError::MalformedStartLine { line: 2, .. }));
    }

    #[test]
    fn test_status_line_errors() {
        for line in [
            "HTTP/1 200 OK",
            "HTTP/x.y 200 OK",
            "HTTP/1.1 abc OK",
            "HTTP/1.1 -1 OK",
            "HTTP/1.1 99999 OK",
            "200 OK",
        ] {
            let head = block(HEAD_BLOCK_TAG, &[line]);
            let err = parse_message(Role::Response, &head, None).unwrap_err();
            assert!(
                matches!(err, FixtureError::MalformedStartLine { role: Role::Response, .. }),
                "{line}: {err}"
            );
        }
    }

    #[test]
    fn test_status_line_without_reason() {
        let head = block(HEAD_BLOCK_TAG, &["HTTP/2.0 204"]);
        let message = parse_message(Role::Response, &head, None).unwrap();
        assert_eq!(message.status_code(), Some(204));
    }

    #[test]
    fn test_start_line_role_comes_from_context() {
        // A status line parses as a request line in the request section.
        let head = block(HEAD_BLOCK_TAG, &["HTTP/1.1 200 OK"]);
        let message = parse_message(Role::Request, &head, None).unwrap();
        assert_eq!(message.method(), Some("HTTP/1.1"));
        assert_eq!(message.target(), Some("200 OK"));
    }

    #[test]
    fn test_header_value_with_colon() {
        let head = block(HEAD_BLOCK_TAG, &["HTTP/1.1 301 Moved", "Location: http://x/y"]);
        let message = parse_message(Role::Response, &head, None).unwrap();
        assert_eq!(message.headers().get("location"), Some("http://x/y"));
    }

    #[test]
    fn test_header_without_colon() {
        let head = block(HEAD_BLOCK_TAG, &["GET /", "Accept application/json"]);
        let err = parse_message(Role::Request, &head, None).unwrap_err();
        assert!(matches!(err, FixtureError::MalformedHeader { line: 3, .. }));
    }

    #[test]
    fn test_blank_line_between_headers() {
        let head = block(HEAD_BLOCK_TAG, &["GET /", "Accept: a", "", "Host: b"]);
        let err = parse_message(Role::Request, &head, None).unwrap_err();
        assert!(matches!(err, FixtureError::MalformedHeader { line: 5, .. }));
    }

    #[test]
    fn test_trailing_blank_lines_are_allowed() {
        let head = block(HEAD_BLOCK_TAG, &["", "GET /", "Accept: a", "", ""]);
        let message = parse_message(Role::Request, &head, None).unwrap();
        assert_eq!(message.headers().len(), 1);
    }

    #[test]
    fn test_duplicate_header_case_insensitive() {
        let head = block(HEAD_BLOCK_TAG, &["GET /", "Accept: a", "ACCEPT: b"]);
        let err = parse_message(Role::Request, &head, None).unwrap_err();
        assert_eq!(
            err,
            FixtureError::DuplicateHeader {
                role: Role::Request,
                line: 4,
                name: "ACCEPT".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_json_body_reports_position() {
        let head = block(HEAD_BLOCK_TAG, &["GET /"]);
        let body = FencedBlock {
            info: BODY_BLOCK_TAG,
            line: 10,
            lines: vec!["{", "  \"a\": ,", "}"],
        };
        let err = parse_message(Role::Request, &head, Some(&body)).unwrap_err();
        match &err {
            FixtureError::MalformedBody {
                line, body_line, ..
            } => {
                assert_eq!(*line, 11);
                assert_eq!(*body_line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.line(), Some(12));
    }

    #[test]
    fn test_explicit_null_body() {
        let head = block(HEAD_BLOCK_TAG, &["HTTP/1.1 200 OK"]);
        let body = block(BODY_BLOCK_TAG, &["null"]);
        let message = parse_message(Role::Response, &head, Some(&body)).unwrap();
        assert_eq!(message.body(), &Body::Json(Value::Null));
    }

    #[test]
    fn test_headers_preserve_order_and_case() {
        let headers: Headers = [("X-B", "2"), ("x-a", "1")].into_iter().collect();
        let names: Vec<_> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["X-B", "x-a"]);
        assert_eq!(headers.get("X-A"), Some("1"));
    }

    #[test]
    fn test_headers_append_folds_duplicates() {
        let mut headers = Headers::new();
        headers.append("Vary", "Accept");
        headers.append("vary", "Origin");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("VARY"), Some("Accept, Origin"));
        assert!(!headers.try_insert("VARY", "x"));
    }

    #[test]
    fn test_headers_serde() {
        let headers: Headers =
            serde_json::from_value(json!({"Content-Type": "application/json"})).unwrap();
        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(
            serde_json::to_value(&headers).unwrap(),
            json!({"Content-Type": "application/json"})
        );
    }

    #[test]
    fn test_display_status_line() {
        let line = StartLine::Status {
            protocol_version: "1.1".to_string(),
            status_code: 404,
        };
        assert_eq!(line.to_string(), "HTTP/1.1 404 Not Found");
        let unknown = StartLine::Status {
            protocol_version: "1.1".to_string(),
            status_code: 299,
        };
        assert_eq!(unknown.to_string(), "HTTP/1.1 299");
    }
}
