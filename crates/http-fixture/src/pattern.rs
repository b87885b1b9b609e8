//! Placeholder grammar and the pattern compiler.
//!
//! Expected response bodies are plain JSON in which string leaves may hold
//! placeholders:
//!
//! - `"@integer@"` - any value of the given kind
//! - `"@*@"` - any value at all
//! - `"@string@.startsWith('Test').endsWith('1')"` - a kind narrowed by
//!   chained predicates
//! - `"@...@"` - as the last array element, any number of further elements
//!
//! [`compile`] turns such a JSON tree into a [`Pattern`] once, so that the
//! matcher never has to re-read placeholder text.

use crate::error::{FixtureError, PatternError};
use crate::message::Headers;
use crate::path;
use regex::Regex;
use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Placeholder token accepting any value.
pub const ANY_TOKEN: &str = "*";
/// Placeholder token for an open array tail.
pub const TAIL_TOKEN: &str = "...";

/// Runtime kind of a JSON value.
///
/// `Number` is the union of `Integer` and `Double`; every other kind is
/// disjoint from the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Integer,
    Double,
    Number,
    String,
    Boolean,
    Array,
    Object,
    Null,
}

impl Kind {
    pub fn from_token(token: &str) -> Option<Kind> {
        let kind = match token {
            "integer" => Kind::Integer,
            "double" => Kind::Double,
            "number" => Kind::Number,
            "string" => Kind::String,
            "boolean" => Kind::Boolean,
            "array" => Kind::Array,
            "object" => Kind::Object,
            "null" => Kind::Null,
            _ => return None,
        };
        Some(kind)
    }

    pub fn token(self) -> &'static str {
        match self {
            Kind::Integer => "integer",
            Kind::Double => "double",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Boolean => "boolean",
            Kind::Array => "array",
            Kind::Object => "object",
            Kind::Null => "null",
        }
    }

    /// The most specific kind of `value`. Never returns `Number`.
    pub fn of(value: &Value) -> Kind {
        match value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Boolean,
            Value::Number(n) if n.is_f64() => Kind::Double,
            Value::Number(_) => Kind::Integer,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        let actual = Kind::of(value);
        actual == self || (self == Kind::Number && actual.is_numeric())
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Kind::Integer | Kind::Double | Kind::Number)
    }

    /// Human-readable noun phrase, e.g. "an integer".
    pub fn describe(self) -> &'static str {
        match self {
            Kind::Integer => "an integer",
            Kind::Double => "a double",
            Kind::Number => "a number",
            Kind::String => "a string",
            Kind::Boolean => "a boolean",
            Kind::Array => "an array",
            Kind::Object => "an object",
            Kind::Null => "null",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A constraint chained onto a placeholder.
#[derive(Debug, Clone)]
pub enum Predicate {
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    MatchRegex(Arc<Regex>),
    Equals(Value),
    OneOf(Vec<Value>),
    GreaterThan(f64),
    LessThan(f64),
    IsEmpty,
    IsNotEmpty,
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        use Predicate::*;
        match (self, other) {
            (StartsWith(a), StartsWith(b))
            | (EndsWith(a), EndsWith(b))
            | (Contains(a), Contains(b)) => a == b,
            (MatchRegex(a), MatchRegex(b)) => a.as_str() == b.as_str(),
            (Equals(a), Equals(b)) => a == b,
            (OneOf(a), OneOf(b)) => a == b,
            (GreaterThan(a), GreaterThan(b)) | (LessThan(a), LessThan(b)) => a == b,
            (IsEmpty, IsEmpty) | (IsNotEmpty, IsNotEmpty) => true,
            _ => false,
        }
    }
}

impl Predicate {
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::StartsWith(_) => "startsWith",
            Predicate::EndsWith(_) => "endsWith",
            Predicate::Contains(_) => "contains",
            Predicate::MatchRegex(_) => "matchRegex",
            Predicate::Equals(_) => "equals",
            Predicate::OneOf(_) => "oneOf",
            Predicate::GreaterThan(_) => "greaterThan",
            Predicate::LessThan(_) => "lessThan",
            Predicate::IsEmpty => "isEmpty",
            Predicate::IsNotEmpty => "isNotEmpty",
        }
    }

    /// Whether the predicate can ever hold for values of `kind`.
    pub fn applies_to(&self, kind: Kind) -> bool {
        match self {
            Predicate::StartsWith(_)
            | Predicate::EndsWith(_)
            | Predicate::Contains(_)
            | Predicate::MatchRegex(_) => kind == Kind::String,
            Predicate::GreaterThan(_) | Predicate::LessThan(_) => kind.is_numeric(),
            Predicate::IsEmpty | Predicate::IsNotEmpty => {
                matches!(kind, Kind::String | Kind::Array | Kind::Object)
            }
            Predicate::Equals(_) | Predicate::OneOf(_) => true,
        }
    }

    pub fn evaluate(&self, actual: &Value) -> bool {
        match self {
            Predicate::StartsWith(prefix) => actual.as_str().is_some_and(|s| s.starts_with(prefix)),
            Predicate::EndsWith(suffix) => actual.as_str().is_some_and(|s| s.ends_with(suffix)),
            Predicate::Contains(needle) => actual.as_str().is_some_and(|s| s.contains(needle)),
            Predicate::MatchRegex(regex) => actual.as_str().is_some_and(|s| regex.is_match(s)),
            Predicate::Equals(expected) => literal_eq(expected, actual),
            Predicate::OneOf(options) => options.iter().any(|o| literal_eq(o, actual)),
            Predicate::GreaterThan(bound) => actual.as_f64().is_some_and(|n| n > *bound),
            Predicate::LessThan(bound) => actual.as_f64().is_some_and(|n| n < *bound),
            Predicate::IsEmpty => match actual {
                Value::String(s) => s.is_empty(),
                Value::Array(a) => a.is_empty(),
                Value::Object(o) => o.is_empty(),
                _ => false,
            },
            Predicate::IsNotEmpty => match actual {
                Value::String(s) => !s.is_empty(),
                Value::Array(a) => !a.is_empty(),
                Value::Object(o) => !o.is_empty(),
                _ => false,
            },
        }
    }

    fn args(&self) -> Vec<Value> {
        match self {
            Predicate::StartsWith(s) | Predicate::EndsWith(s) | Predicate::Contains(s) => {
                vec![Value::String(s.clone())]
            }
            Predicate::MatchRegex(regex) => vec![Value::String(regex.as_str().to_string())],
            Predicate::Equals(v) => vec![v.clone()],
            Predicate::OneOf(options) => options.clone(),
            Predicate::GreaterThan(n) | Predicate::LessThan(n) => {
                vec![number_value(*n).unwrap_or(Value::Null)]
            }
            Predicate::IsEmpty | Predicate::IsNotEmpty => Vec::new(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self
            .args()
            .iter()
            .map(|arg| match arg {
                Value::String(text) => quote(text),
                other => other.to_string(),
            })
            .collect();
        write!(f, "{}({})", self.name(), args.join(", "))
    }
}

/// Double-quoted argument literal that `parse_quoted` reads back unchanged.
///
/// Control characters other than `\n`, `\t` and `\r` are written as `\uXXXX`
/// so that `\b` and `\f` stay free for regex syntax.
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// A kind narrowed by predicates that must all hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: Kind,
    pub predicates: Vec<Predicate>,
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}@", self.kind)?;
        for predicate in &self.predicates {
            write!(f, ".{predicate}")?;
        }
        Ok(())
    }
}

/// Array node. With `open_tail` the actual array may be longer than `items`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayPattern {
    pub items: Vec<Pattern>,
    pub open_tail: bool,
}

/// Compiled form of an expected JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Scalar that must be equal in kind and value.
    Literal(Value),
    TypeWildcard(Kind),
    AnyWildcard,
    Expression(Expression),
    /// Members in the order they were written; extra actual members are allowed.
    Object(Vec<(String, Pattern)>),
    Array(ArrayPattern),
}

impl Pattern {
    /// JSON form of the pattern, with placeholders written back as strings.
    ///
    /// Compiling the result yields an equal pattern.
    pub fn to_value(&self) -> Value {
        match self {
            Pattern::Literal(value) => value.clone(),
            Pattern::TypeWildcard(kind) => Value::String(format!("@{kind}@")),
            Pattern::AnyWildcard => Value::String(format!("@{ANY_TOKEN}@")),
            Pattern::Expression(expression) => Value::String(expression.to_string()),
            Pattern::Object(members) => Value::Object(
                members
                    .iter()
                    .map(|(key, child)| (key.clone(), child.to_value()))
                    .collect(),
            ),
            Pattern::Array(array) => {
                let mut items: Vec<Value> = array.items.iter().map(Pattern::to_value).collect();
                if array.open_tail {
                    items.push(Value::String(format!("@{TAIL_TOKEN}@")));
                }
                Value::Array(items)
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Result of compiling one string leaf.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Leaf {
    Pattern(Pattern),
    Tail,
}

/// Compile an expected JSON value into a pattern.
pub fn compile(value: &Value) -> Result<Pattern, FixtureError> {
    let pattern = compile_at(value, path::ROOT)?;
    trace!("compiled pattern {}", pattern);
    Ok(pattern)
}

fn compile_at(value: &Value, at: &str) -> Result<Pattern, FixtureError> {
    let malformed = |source: PatternError| FixtureError::MalformedPattern {
        path: path::display(at).to_string(),
        source,
    };

    match value {
        Value::String(text) => match compile_leaf(text).map_err(malformed)? {
            Leaf::Pattern(pattern) => Ok(pattern),
            Leaf::Tail => Err(malformed(PatternError::MisplacedTail)),
        },
        Value::Array(items) => {
            let (items, open_tail) = match items.split_last() {
                Some((Value::String(last), init)) if is_tail(last) => (init, true),
                _ => (items.as_slice(), false),
            };
            let items = items
                .iter()
                .enumerate()
                .map(|(idx, item)| compile_at(item, &path::index(at, idx)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Pattern::Array(ArrayPattern { items, open_tail }))
        }
        Value::Object(members) => {
            let members = members
                .iter()
                .map(|(key, child)| Ok((key.clone(), compile_at(child, &path::key(at, key))?)))
                .collect::<Result<Vec<_>, FixtureError>>()?;
            Ok(Pattern::Object(members))
        }
        scalar => Ok(Pattern::Literal(scalar.clone())),
    }
}

fn is_tail(text: &str) -> bool {
    text.strip_prefix('@')
        .and_then(|t| t.strip_suffix('@'))
        .is_some_and(|t| t == TAIL_TOKEN)
}

fn is_placeholder_token(token: &str) -> bool {
    token == ANY_TOKEN
        || token == TAIL_TOKEN
        || (!token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

/// Compile a single string leaf.
///
/// Strings not shaped like a placeholder stay literal, which covers values
/// such as `user@example.com` or `@handle`.
pub(crate) fn compile_leaf(text: &str) -> Result<Leaf, PatternError> {
    let literal = || Ok(Leaf::Pattern(Pattern::Literal(Value::String(text.to_string()))));

    let Some(rest) = text.strip_prefix('@') else {
        return literal();
    };

    let Some(close) = rest.find('@') else {
        let word: String = rest.chars().take_while(|c| c.is_ascii_alphanumeric()).collect();
        if Kind::from_token(&word).is_some() {
            return Err(PatternError::UnbalancedDelimiter(text.to_string()));
        }
        return literal();
    };

    let token = &rest[..close];
    let tail = &rest[close + 1..];
    if !is_placeholder_token(token) {
        return literal();
    }

    match token {
        TAIL_TOKEN if tail.is_empty() => Ok(Leaf::Tail),
        ANY_TOKEN if tail.is_empty() => Ok(Leaf::Pattern(Pattern::AnyWildcard)),
        TAIL_TOKEN | ANY_TOKEN => Err(PatternError::TrailingInput(tail.to_string())),
        _ => {
            let kind = Kind::from_token(token)
                .ok_or_else(|| PatternError::UnknownKind(token.to_string()))?;
            if tail.is_empty() {
                return Ok(Leaf::Pattern(Pattern::TypeWildcard(kind)));
            }
            let predicates = parse_predicates(kind, tail)?;
            Ok(Leaf::Pattern(Pattern::Expression(Expression {
                kind,
                predicates,
            })))
        }
    }
}

fn invalid(predicate: &str, reason: impl Into<String>) -> PatternError {
    PatternError::InvalidArguments {
        predicate: predicate.to_string(),
        reason: reason.into(),
    }
}

fn number_value(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return Some(Value::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number)
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn is_done(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }
}

fn parse_predicates(kind: Kind, src: &str) -> Result<Vec<Predicate>, PatternError> {
    let mut cursor = Cursor::new(src);
    let mut predicates = Vec::new();

    while !cursor.is_done() {
        if !cursor.eat('.') {
            return Err(PatternError::TrailingInput(cursor.rest().to_string()));
        }
        let name = cursor.take_while(|c| c.is_ascii_alphanumeric());
        if name.is_empty() {
            return Err(PatternError::TrailingInput(format!(".{}", cursor.rest())));
        }
        if !cursor.eat('(') {
            return Err(invalid(name, "expected '(' after the predicate name"));
        }
        let args = parse_args(&mut cursor, name)?;
        predicates.push(build_predicate(kind, name, args)?);
    }

    Ok(predicates)
}

/// Parse a comma-separated literal list up to and including the closing `)`.
fn parse_args(cursor: &mut Cursor<'_>, predicate: &str) -> Result<Vec<Value>, PatternError> {
    let mut args = Vec::new();
    cursor.skip_whitespace();
    if cursor.eat(')') {
        return Ok(args);
    }

    loop {
        cursor.skip_whitespace();
        args.push(parse_literal(cursor, predicate)?);
        cursor.skip_whitespace();
        if cursor.eat(',') {
            continue;
        }
        if cursor.eat(')') {
            return Ok(args);
        }
        return Err(match cursor.peek() {
            None => invalid(predicate, "missing ')'"),
            Some(c) => invalid(predicate, format!("expected ',' or ')', found {c:?}")),
        });
    }
}

fn parse_literal(cursor: &mut Cursor<'_>, predicate: &str) -> Result<Value, PatternError> {
    match cursor.peek() {
        Some(quote @ ('\'' | '"')) => {
            cursor.bump();
            parse_quoted(cursor, quote, predicate).map(Value::String)
        }
        Some(c) if c == '-' || c.is_ascii_digit() => {
            let text = cursor
                .take_while(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
            parse_number(text)
                .ok_or_else(|| invalid(predicate, format!("invalid number {text:?}")))
        }
        Some(c) if c.is_ascii_alphabetic() => {
            let word = cursor.take_while(|c| c.is_ascii_alphanumeric());
            match word {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                other => Err(invalid(predicate, format!("unquoted argument {other:?}"))),
            }
        }
        Some(c) => Err(invalid(predicate, format!("unexpected {c:?}"))),
        None => Err(invalid(predicate, "missing ')'")),
    }
}

/// Read a quoted argument after its opening quote.
///
/// Unknown escapes such as `\d` are kept as written, so regex arguments need
/// no extra escaping.
fn parse_quoted(
    cursor: &mut Cursor<'_>,
    quote: char,
    predicate: &str,
) -> Result<String, PatternError> {
    let mut out = String::new();
    loop {
        match cursor.bump() {
            None => return Err(invalid(predicate, "unterminated string")),
            Some(c) if c == quote => return Ok(out),
            Some('\\') => match cursor.bump() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('u') => {
                    let hex: String = (0..4).filter_map(|_| cursor.bump()).collect();
                    let c = u32::from_str_radix(&hex, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| invalid(predicate, format!("invalid escape \\u{hex}")))?;
                    out.push(c);
                }
                Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                Some(c) => {
                    out.push('\\');
                    out.push(c);
                }
                None => return Err(invalid(predicate, "unterminated string")),
            },
            Some(c) => out.push(c),
        }
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if text.contains(['.', 'e', 'E']) {
        let n: f64 = text.parse().ok()?;
        Number::from_f64(n).map(Value::Number)
    } else if let Ok(n) = text.parse::<i64>() {
        Some(Value::from(n))
    } else {
        text.parse::<u64>().ok().map(Value::from)
    }
}

fn single_arg(predicate: &str, mut args: Vec<Value>) -> Result<Value, PatternError> {
    if args.len() != 1 {
        return Err(invalid(
            predicate,
            format!("expected 1 argument, got {}", args.len()),
        ));
    }
    Ok(args.remove(0))
}

fn string_arg(predicate: &str, args: Vec<Value>) -> Result<String, PatternError> {
    match single_arg(predicate, args)? {
        Value::String(s) => Ok(s),
        other => Err(invalid(predicate, format!("expected a string, got {other}"))),
    }
}

fn number_arg(predicate: &str, args: Vec<Value>) -> Result<f64, PatternError> {
    let arg = single_arg(predicate, args)?;
    arg.as_f64()
        .ok_or_else(|| invalid(predicate, format!("expected a number, got {arg}")))
}

fn build_predicate(kind: Kind, name: &str, args: Vec<Value>) -> Result<Predicate, PatternError> {
    let predicate = match name {
        "startsWith" => Predicate::StartsWith(string_arg(name, args)?),
        "endsWith" => Predicate::EndsWith(string_arg(name, args)?),
        "contains" => Predicate::Contains(string_arg(name, args)?),
        "matchRegex" => {
            let source = string_arg(name, args)?;
            let regex = Regex::new(&source).map_err(|e| invalid(name, e.to_string()))?;
            Predicate::MatchRegex(Arc::new(regex))
        }
        "equals" => Predicate::Equals(single_arg(name, args)?),
        "oneOf" if args.is_empty() => return Err(invalid(name, "expected at least 1 argument")),
        "oneOf" => Predicate::OneOf(args),
        "greaterThan" => Predicate::GreaterThan(number_arg(name, args)?),
        "lessThan" => Predicate::LessThan(number_arg(name, args)?),
        "isEmpty" | "isNotEmpty" if !args.is_empty() => {
            return Err(invalid(name, "expected no arguments"))
        }
        "isEmpty" => Predicate::IsEmpty,
        "isNotEmpty" => Predicate::IsNotEmpty,
        other => return Err(PatternError::UnknownPredicate(other.to_string())),
    };

    if !predicate.applies_to(kind) {
        return Err(PatternError::PredicateNotApplicable {
            predicate: name.to_string(),
            kind: kind.to_string(),
        });
    }

    if let Predicate::Equals(_) | Predicate::OneOf(_) = predicate {
        if let Some(arg) = predicate.args().iter().find(|arg| !kind.accepts(arg)) {
            return Err(invalid(name, format!("{arg} is not {}", kind.describe())));
        }
    }

    Ok(predicate)
}

/// Equality of an expected literal and an actual value.
///
/// An expected integer only equals an integer of the same value. An expected
/// double equals any number with the same `f64` value.
pub(crate) fn literal_eq(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(e), Value::Number(a)) if e.is_f64() => e.as_f64() == a.as_f64(),
        (Value::Number(e), Value::Number(a)) => !a.is_f64() && e == a,
        (Value::Array(e), Value::Array(a)) => {
            e.len() == a.len() && e.iter().zip(a).all(|(e, a)| literal_eq(e, a))
        }
        (Value::Object(e), Value::Object(a)) => {
            e.len() == a.len()
                && e.iter()
                    .all(|(k, e)| a.get(k).is_some_and(|a| literal_eq(e, a)))
        }
        _ => expected == actual,
    }
}

/// Compiled header expectations, in fixture order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderPatterns {
    entries: Vec<(String, Pattern)>,
}

impl HeaderPatterns {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Pattern)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compile header values with the string-leaf grammar.
///
/// Header values are text, so only literals, `@string@` placeholders and
/// `@*@` are accepted.
pub fn compile_headers(headers: &Headers) -> Result<HeaderPatterns, FixtureError> {
    let mut entries = Vec::with_capacity(headers.len());

    for (name, value) in headers.iter() {
        let malformed = |source: PatternError| FixtureError::MalformedPattern {
            path: path::key("headers", name),
            source,
        };

        let pattern = match compile_leaf(value).map_err(malformed)? {
            Leaf::Pattern(pattern) => pattern,
            Leaf::Tail => return Err(malformed(PatternError::MisplacedTail)),
        };

        let kind = match &pattern {
            Pattern::TypeWildcard(kind) => Some(*kind),
            Pattern::Expression(expression) => Some(expression.kind),
            _ => None,
        };
        if let Some(kind) = kind.filter(|k| *k != Kind::String) {
            return Err(malformed(PatternError::KindNotAllowed {
                kind: kind.to_string(),
                context: "headers".to_string(),
            }));
        }

        entries.push((name.to_string(), pattern));
    }

    Ok(HeaderPatterns { entries })
}
