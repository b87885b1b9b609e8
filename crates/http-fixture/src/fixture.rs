//! Fixture documents: one request and its expected response.

use crate::error::FixtureError;
use crate::markdown::{locate_blocks, split_sections, Section, SECTION_SEPARATOR};
use crate::message::{parse_message, Body, HttpMessage, Role};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// A parsed fixture. Both sides are always present.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureDocument {
    request: HttpMessage,
    response: HttpMessage,
}

impl FixtureDocument {
    /// Build a document from its two sides. Fails when a side has the wrong
    /// start line shape or a raw body, since fixture bodies are JSON.
    pub fn new(request: HttpMessage, response: HttpMessage) -> Result<Self, FixtureError> {
        for (message, role) in [(&request, Role::Request), (&response, Role::Response)] {
            if message.role() != role {
                return Err(FixtureError::malformed(
                    format!("{role} side holds a {} start line", message.role()),
                    None,
                ));
            }
            if let Body::Raw(_) = message.body() {
                return Err(FixtureError::malformed(
                    format!("{role} body must be JSON"),
                    None,
                ));
            }
        }
        Ok(Self { request, response })
    }

    pub fn request(&self) -> &HttpMessage {
        &self.request
    }

    pub fn response(&self) -> &HttpMessage {
        &self.response
    }

    pub fn into_parts(self) -> (HttpMessage, HttpMessage) {
        (self.request, self.response)
    }
}

/// Renders the canonical fixture text, which parses back to an equal document.
impl fmt::Display for FixtureDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Request\n")?;
        writeln!(f, "{}\n", self.request)?;
        writeln!(f, "{SECTION_SEPARATOR}\n")?;
        writeln!(f, "# Response\n")?;
        writeln!(f, "{}", self.response)
    }
}

impl FromStr for FixtureDocument {
    type Err = FixtureError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse(text)
    }
}

fn parse_section(section: &Section<'_>, role: Role) -> Result<HttpMessage, FixtureError> {
    let blocks = locate_blocks(section, role)?;
    parse_message(role, &blocks.head, blocks.body.as_ref())
}

/// Parse fixture text into a document.
///
/// The first section is parsed as the request and the second as the
/// response. Errors from either section are returned unchanged.
pub fn parse(text: &str) -> Result<FixtureDocument, FixtureError> {
    let (request_section, response_section) = split_sections(text)?;
    let request = parse_section(&request_section, Role::Request)?;
    let response = parse_section(&response_section, Role::Response)?;

    debug!(
        "parsed fixture {} -> {}",
        request.start_line(),
        response.start_line()
    );

    Ok(FixtureDocument { request, response })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Headers, StartLine};
    use serde_json::json;

    const FIXTURE: &str = r#"# Create an example

Creates an example and returns its id.

## Request

```http request
POST /api/examples
Accept: application/json
```

```json
{"title": "Test"}
```

---

## Response

```http request
HTTP/1.1 200 OK
```
"#;

    #[test]
    fn test_parse_fixture() {
        let document = parse(FIXTURE).unwrap();

        let request = document.request();
        assert_eq!(request.method(), Some("POST"));
        assert_eq!(request.target(), Some("/api/examples"));
        assert_eq!(request.headers().get("Accept"), Some("application/json"));
        assert_eq!(request.body(), &Body::Json(json!({"title": "Test"})));

        let response = document.response();
        assert_eq!(response.status_code(), Some(200));
        assert_eq!(response.protocol_version(), Some("1.1"));
        assert!(response.headers().is_empty());
        assert_eq!(response.body(), &Body::Empty);
    }

    #[test]
    fn test_missing_separator() {
        let text = FIXTURE.replace("---\n", "");
        let err = parse(&text).unwrap_err();
        assert!(matches!(err, FixtureError::MalformedFixture { .. }));
    }

    #[test]
    fn test_errors_propagate_unchanged() {
        let text = FIXTURE.replace("HTTP/1.1 200 OK", "HTTP/1.1 OK");
        let err = parse(&text).unwrap_err();
        assert!(matches!(
            err,
            FixtureError::MalformedStartLine {
                role: Role::Response,
                line: 21,
                ..
            }
        ));
    }

    #[test]
    fn test_second_head_block_is_an_error() {
        let text = "```http request\nGET /a\n```\n```http request\nDELETE /b\n```\n---\n\
                    ```http request\nHTTP/1.1 200 OK\n```\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, FixtureError::MalformedFixture { .. }));
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn test_from_str() {
        let document: FixtureDocument = FIXTURE.parse().unwrap();
        assert_eq!(document, parse(FIXTURE).unwrap());
    }

    #[test]
    fn test_render_round_trip() {
        let document = parse(FIXTURE).unwrap();
        let rendered = document.to_string();
        let head = "```http request\nPOST /api/examples\nAccept: application/json\n```";
        assert!(rendered.contains(head));
        assert_eq!(parse(&rendered).unwrap(), document);
    }

    #[test]
    fn test_new_rejects_swapped_sides() {
        let request = HttpMessage::new(
            StartLine::Request {
                method: "GET".to_string(),
                target: "/".to_string(),
            },
            Headers::new(),
            Body::Empty,
        );
        let response = HttpMessage::new(
            StartLine::Status {
                protocol_version: "1.1".to_string(),
                status_code: 200,
            },
            Headers::new(),
            Body::Empty,
        );
        assert!(FixtureDocument::new(request.clone(), response.clone()).is_ok());
        assert!(FixtureDocument::new(response, request).is_err());
    }

    #[test]
    fn test_new_rejects_raw_bodies() {
        let request = HttpMessage::new(
            StartLine::Request {
                method: "POST".to_string(),
                target: "/".to_string(),
            },
            Headers::new(),
            Body::Raw("plain text".to_string()),
        );
        let response = HttpMessage::new(
            StartLine::Status {
                protocol_version: "1.1".to_string(),
                status_code: 204,
            },
            Headers::new(),
            Body::Empty,
        );
        let err = FixtureDocument::new(request, response).unwrap_err();
        assert!(err.to_string().contains("request body must be JSON"));
    }
}
