//! Block splitting for fixture documents.
//!
//! A fixture is a markdown document with two sections separated by a line
//! holding only `---`. Each section carries a fenced block tagged
//! `http request` (the head block) and optionally a fenced block tagged
//! `json` (the body block) after it.
//!
//! The splitter only locates text. Interpreting the blocks is the job of
//! [`crate::message`].

use crate::error::FixtureError;
use crate::message::Role;

/// Language tag of the head block.
pub const HEAD_BLOCK_TAG: &str = "http request";
/// Language tag of the body block.
pub const BODY_BLOCK_TAG: &str = "json";
/// Separator line between the request and response sections.
pub const SECTION_SEPARATOR: &str = "---";

const MIN_FENCE_LEN: usize = 3;

/// A contiguous run of document lines.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Section<'a> {
    /// 1-based document line of `lines[0]`.
    pub first_line: usize,
    pub lines: Vec<&'a str>,
}

/// A fenced code block with its language tag and inner lines.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FencedBlock<'a> {
    pub info: &'a str,
    /// 1-based document line of the opening fence.
    pub line: usize,
    pub lines: Vec<&'a str>,
}

impl FencedBlock<'_> {
    /// 1-based document line of the first content line.
    pub fn content_line(&self) -> usize {
        self.line + 1
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Head and optional body block of one section.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MessageBlocks<'a> {
    pub head: FencedBlock<'a>,
    pub body: Option<FencedBlock<'a>>,
}

/// Opening fence: backtick count and trimmed info string.
fn fence_open(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let ticks = trimmed.chars().take_while(|c| *c == '`').count();
    if ticks < MIN_FENCE_LEN {
        return None;
    }
    Some((ticks, trimmed[ticks..].trim()))
}

/// Closing fence for a block opened with `open_ticks` backticks.
fn is_fence_close(line: &str, open_ticks: usize) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= open_ticks && trimmed.chars().all(|c| c == '`')
}

/// Level of an ATX heading (`# Title` is 1), or `None` for other lines.
fn heading_level(line: &str) -> Option<usize> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    match line[hashes..].chars().next() {
        None => Some(hashes),
        Some(c) if c.is_whitespace() => Some(hashes),
        _ => None,
    }
}

/// Split a fixture document into its request and response sections.
///
/// Separator lines inside fenced blocks are content, not separators.
pub(crate) fn split_sections(text: &str) -> Result<(Section<'_>, Section<'_>), FixtureError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut separators = Vec::new();
    let mut open_fence: Option<(usize, usize)> = None;

    for (idx, line) in lines.iter().enumerate() {
        match open_fence {
            Some((ticks, _)) => {
                if is_fence_close(line, ticks) {
                    open_fence = None;
                }
            }
            None => {
                if let Some((ticks, _)) = fence_open(line) {
                    open_fence = Some((ticks, idx + 1));
                } else if line.trim_end() == SECTION_SEPARATOR {
                    separators.push(idx);
                }
            }
        }
    }

    if let Some((_, line)) = open_fence {
        return Err(FixtureError::malformed(
            "fenced block is never closed",
            Some(line),
        ));
    }

    let separator = match separators.as_slice() {
        [] => {
            return Err(FixtureError::malformed(
                format!("missing '{SECTION_SEPARATOR}' separator between request and response"),
                None,
            ))
        }
        [only] => *only,
        [_, second, ..] => {
            return Err(FixtureError::malformed(
                format!(
                    "separator '{SECTION_SEPARATOR}' appears {} times, expected exactly once",
                    separators.len()
                ),
                Some(second + 1),
            ))
        }
    };

    let request = Section {
        first_line: 1,
        lines: lines[..separator].to_vec(),
    };
    let response = Section {
        first_line: separator + 2,
        lines: lines[separator + 1..].to_vec(),
    };

    for (section, role) in [(&request, Role::Request), (&response, Role::Response)] {
        if section.lines.iter().all(|l| l.trim().is_empty()) {
            return Err(FixtureError::malformed(
                format!("{role} section is empty"),
                Some(section.first_line),
            ));
        }
    }

    Ok((request, response))
}

enum Event<'a> {
    Heading(usize),
    Block(FencedBlock<'a>),
}

fn scan<'a>(section: &Section<'a>) -> Result<Vec<Event<'a>>, FixtureError> {
    let mut events = Vec::new();
    let mut lines = section.lines.iter().enumerate();

    while let Some((idx, &line)) = lines.next() {
        let line_no = section.first_line + idx;
        if let Some((ticks, info)) = fence_open(line) {
            let mut content = Vec::new();
            let mut closed = false;
            for (_, &inner) in lines.by_ref() {
                if is_fence_close(inner, ticks) {
                    closed = true;
                    break;
                }
                content.push(inner);
            }
            if !closed {
                return Err(FixtureError::malformed(
                    "fenced block is never closed",
                    Some(line_no),
                ));
            }
            events.push(Event::Block(FencedBlock {
                info,
                line: line_no,
                lines: content,
            }));
        } else if let Some(level) = heading_level(line) {
            events.push(Event::Heading(level));
        }
    }

    Ok(events)
}

/// Locate the head block and the optional body block of a section.
///
/// The body block is the first `json` block after the head block and before
/// the next top-level heading. A second head block anywhere in the section is
/// an error.
pub(crate) fn locate_blocks<'a>(
    section: &Section<'a>,
    role: Role,
) -> Result<MessageBlocks<'a>, FixtureError> {
    let mut events = scan(section)?.into_iter();

    let head = events
        .by_ref()
        .find_map(|event| match event {
            Event::Block(block) if block.info == HEAD_BLOCK_TAG => Some(block),
            _ => None,
        })
        .ok_or_else(|| {
            FixtureError::malformed(
                format!("{role} section has no ```{HEAD_BLOCK_TAG} block"),
                Some(section.first_line),
            )
        })?;

    let mut body = None;
    let mut past_heading = false;
    for event in events {
        match event {
            Event::Block(block) if block.info == HEAD_BLOCK_TAG => {
                return Err(FixtureError::malformed(
                    format!("{role} section has more than one ```{HEAD_BLOCK_TAG} block"),
                    Some(block.line),
                ));
            }
            Event::Heading(1) => past_heading = true,
            Event::Block(block)
                if block.info == BODY_BLOCK_TAG && !past_heading && body.is_none() =>
            {
                body = Some(block);
            }
            _ => {}
        }
    }

    Ok(MessageBlocks { head, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "# Request\n\n```http request\nGET /items\n```\n\n---\n\n\
                           # Response\n\n```http request\nHTTP/1.1 200 OK\n```\n\n\
                           ```json\n{\"ok\": true}\n```\n";

    #[test]
    fn test_split_sections_line_numbers() {
        let (request, response) = split_sections(FIXTURE).unwrap();
        assert_eq!(request.first_line, 1);
        assert_eq!(request.lines[0], "# Request");
        assert_eq!(response.first_line, 8);
        assert_eq!(response.lines[1], "# Response");
    }

    #[test]
    fn test_split_sections_missing_separator() {
        let err = split_sections("```http request\nGET /\n```\n").unwrap_err();
        assert!(matches!(err, FixtureError::MalformedFixture { .. }));
    }

    #[test]
    fn test_split_sections_duplicate_separator() {
        let err = split_sections("a\n---\nb\n---\nc\n").unwrap_err();
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn test_split_sections_empty_response() {
        let err = split_sections("```http request\nGET /\n```\n---\n   \n").unwrap_err();
        assert!(err.to_string().contains("response section is empty"));
    }

    #[test]
    fn test_separator_inside_fence_is_content() {
        let text = "```text\n---\n```\n```http request\nGET /\n```\n---\n\
                    ```http request\nHTTP/1.1 204 No Content\n```\n";
        let (request, _) = split_sections(text).unwrap();
        assert_eq!(request.lines.len(), 6);
    }

    #[test]
    fn test_unclosed_fence() {
        let err = split_sections("```http request\nGET /\n---\n").unwrap_err();
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_locate_blocks_head_and_body() {
        let (_, response) = split_sections(FIXTURE).unwrap();
        let blocks = locate_blocks(&response, Role::Response).unwrap();
        assert_eq!(blocks.head.lines, vec!["HTTP/1.1 200 OK"]);
        assert_eq!(blocks.head.line, 11);
        let body = blocks.body.unwrap();
        assert_eq!(body.text(), "{\"ok\": true}");
        assert_eq!(body.content_line(), 16);
    }

    #[test]
    fn test_locate_blocks_without_body() {
        let (request, _) = split_sections(FIXTURE).unwrap();
        let blocks = locate_blocks(&request, Role::Request).unwrap();
        assert!(blocks.body.is_none());
    }

    #[test]
    fn test_body_after_top_level_heading_is_ignored() {
        let section = Section {
            first_line: 1,
            lines: vec!["```http request", "GET /", "```", "# Notes", "```json", "{}", "```"],
        };
        let blocks = locate_blocks(&section, Role::Request).unwrap();
        assert!(blocks.body.is_none());
    }

    #[test]
    fn test_body_before_head_is_ignored() {
        let section = Section {
            first_line: 1,
            lines: vec!["```json", "{}", "```", "```http request", "GET /", "```"],
        };
        let blocks = locate_blocks(&section, Role::Request).unwrap();
        assert!(blocks.body.is_none());
    }

    #[test]
    fn test_second_head_block_is_rejected() {
        let section = Section {
            first_line: 1,
            lines: vec![
                "```http request",
                "GET /a",
                "```",
                "```http request",
                "DELETE /b",
                "```",
            ],
        };
        let err = locate_blocks(&section, Role::Request).unwrap_err();
        assert!(matches!(err, FixtureError::MalformedFixture { .. }));
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn test_second_head_block_after_body_is_rejected() {
        let section = Section {
            first_line: 10,
            lines: vec![
                "```http request",
                "GET /a",
                "```",
                "```json",
                "{}",
                "```",
                "# Notes",
                "```http request",
                "GET /b",
                "```",
            ],
        };
        let err = locate_blocks(&section, Role::Request).unwrap_err();
        assert_eq!(err.line(), Some(17));
    }

    #[test]
    fn test_missing_head_block() {
        let section = Section {
            first_line: 3,
            lines: vec!["```http", "GET /", "```"],
        };
        let err = locate_blocks(&section, Role::Request).unwrap_err();
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(heading_level("# Request"), Some(1));
        assert_eq!(heading_level("## Body"), Some(2));
        assert_eq!(heading_level("#hashtag"), None);
        assert_eq!(heading_level("plain"), None);
    }
}
