//! Markdown HTTP fixtures and typed-placeholder response matching.
//!
//! A fixture is a markdown document describing one request and the response
//! it should produce:
//!
//! ````markdown
//! # Request
//!
//! ```http request
//! POST /api/examples
//! Accept: application/json
//! ```
//!
//! ```json
//! {"title": "Test"}
//! ```
//!
//! ---
//!
//! # Response
//!
//! ```http request
//! HTTP/1.1 201 Created
//! ```
//!
//! ```json
//! {"id": "@integer@", "title": "@string@.startsWith('Test')"}
//! ```
//! ````
//!
//! [`parse`] turns the text into a [`FixtureDocument`]. The response body may
//! hold placeholders; [`compile`] turns it into a [`Pattern`] and
//! [`match_value`] checks an actual value against it, collecting every
//! mismatch with its path. [`Expectation`] bundles status, header and body
//! checks for a whole observed response.
//!
//! # Example
//!
//! ```
//! use http_fixture::{compile, match_value};
//! use serde_json::json;
//!
//! let pattern = compile(&json!({"id": "@integer@", "title": "Test"})).unwrap();
//! assert!(match_value(&pattern, &json!({"id": 42, "title": "Test"})).is_success());
//!
//! let result = match_value(&pattern, &json!({"id": "42", "title": "Test"}));
//! assert_eq!(result.failures()[0].path, "id");
//! ```
//!
//! # Module Structure
//!
//! - `markdown` - splits a document into sections and fenced blocks
//! - `message` - HTTP message model and head/body block parsing
//! - `fixture` - the document parser
//! - `pattern` - placeholder grammar and pattern compiler
//! - `matcher` - recursive matcher and match results
//! - `verify` - whole-response verification
//! - [`path`] - accessor path helpers used in failures and errors

mod error;
mod fixture;
mod markdown;
mod matcher;
mod message;
pub mod path;
mod pattern;
mod verify;

pub use error::{FixtureError, PatternError};
pub use fixture::{parse, FixtureDocument};
pub use markdown::{BODY_BLOCK_TAG, HEAD_BLOCK_TAG, SECTION_SEPARATOR};
pub use matcher::{match_headers, match_value, Failure, FailureKind, MatchResult, Scope};
pub use message::{reason_phrase, Body, Headers, HttpMessage, Role, StartLine};
pub use pattern::{
    compile, compile_headers, ArrayPattern, Expression, HeaderPatterns, Kind, Pattern, Predicate,
    ANY_TOKEN, TAIL_TOKEN,
};
pub use verify::{ExpectedBody, Expectation, MatchOptions, ObservedResponse};
