//! Story text contract with the language model.
//!
//! The model is instructed to answer with one `<title>` tag followed by
//! `<page>` tags. [`parse_story`] extracts them; a reply without a single
//! page is the only rejected shape.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// System instruction sent with every story generation request.
pub const STORY_INSTRUCTION: &str = "\
You are a well-known storybook writer for kids. Your task is to take the given kid's response \
from a quiz to build a storybook with 10-15 pages.
For each page, you must keep the text concise, easy to read for kids, no more than 3 sentences per page.
Your output must strictly follow this format:
<title>Your Story Title Here</title>
<page>Page 1 content here...</page>
<page>Page 2 content here...</page>
...";

/// Title used when the model omits the `<title>` tag or leaves it blank.
pub const DEFAULT_TITLE: &str = "Untitled Story";

/// Fewest pages the instruction asks for.
pub const MIN_EXPECTED_PAGES: usize = 10;

/// Most pages the instruction asks for.
pub const MAX_EXPECTED_PAGES: usize = 15;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title>(.*?)</title>").expect("valid regex"));

static PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<page>(.*?)</page>").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A model reply split into its title and ordered page texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedStory {
    pub title: String,
    /// Page texts in reading order; index 0 becomes page 1.
    pub pages: Vec<String>,
}

impl ParsedStory {
    /// Whether the page count is inside the range the instruction asks for.
    pub fn has_expected_length(&self) -> bool {
        (MIN_EXPECTED_PAGES..=MAX_EXPECTED_PAGES).contains(&self.pages.len())
    }
}

/// The model reply did not contain a single `<page>` tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("AI failed to generate valid page format")]
pub struct StoryFormatError;

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a raw model reply.
///
/// Tags are matched case-insensitively and may span lines. Every
/// non-overlapping `<page>` match is kept in order, trimmed.
pub fn parse_story(raw: &str) -> Result<ParsedStory, StoryFormatError> {
    let title = TITLE_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string();

    let pages: Vec<String> = PAGE_RE
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect();

    if pages.is_empty() {
        return Err(StoryFormatError);
    }

    Ok(ParsedStory { title, pages })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(title: Option<&str>, pages: usize) -> String {
        let mut out = String::new();
        if let Some(t) = title {
            out.push_str(&format!("<title>{t}</title>\n"));
        }
        for n in 1..=pages {
            out.push_str(&format!("<page>Page {n} text.</page>\n"));
        }
        out
    }

    #[test]
    fn parses_title_and_pages_in_order() {
        let parsed = parse_story(&reply(Some("Luna's Leap"), 12)).unwrap();
        assert_eq!(parsed.title, "Luna's Leap");
        assert_eq!(parsed.pages.len(), 12);
        assert_eq!(parsed.pages[0], "Page 1 text.");
        assert_eq!(parsed.pages[11], "Page 12 text.");
        assert!(parsed.has_expected_length());
    }

    #[test]
    fn missing_title_falls_back_to_default() {
        let parsed = parse_story(&reply(None, 3)).unwrap();
        assert_eq!(parsed.title, DEFAULT_TITLE);
        assert!(!parsed.has_expected_length());
    }

    #[test]
    fn blank_title_falls_back_to_default() {
        let parsed = parse_story("<title>   </title><page>One</page>").unwrap();
        assert_eq!(parsed.title, DEFAULT_TITLE);
    }

    #[test]
    fn zero_pages_is_an_error() {
        assert_eq!(
            parse_story("<title>Nothing here</title> just prose"),
            Err(StoryFormatError)
        );
        assert_eq!(parse_story(""), Err(StoryFormatError));
    }

    #[test]
    fn tags_are_case_insensitive_and_span_lines() {
        let raw = "<TITLE>\n  The Moon Boat \n</Title>\n<Page>Line one.\nLine two.</PAGE>";
        let parsed = parse_story(raw).unwrap();
        assert_eq!(parsed.title, "The Moon Boat");
        assert_eq!(parsed.pages, vec!["Line one.\nLine two.".to_string()]);
    }

    #[test]
    fn surrounding_chatter_is_ignored() {
        let raw = "Sure! Here is your story:\n<title>Pip</title>\n<page>A</page>\
                   some noise <page> B </page>\nHope you like it.";
        let parsed = parse_story(raw).unwrap();
        assert_eq!(parsed.pages, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn unterminated_page_tag_is_not_matched() {
        let raw = "<title>T</title><page>complete</page><page>cut off";
        let parsed = parse_story(raw).unwrap();
        assert_eq!(parsed.pages.len(), 1);
    }

    #[test]
    fn first_title_wins() {
        let raw = "<title>First</title><title>Second</title><page>p</page>";
        assert_eq!(parse_story(raw).unwrap().title, "First");
    }
}
