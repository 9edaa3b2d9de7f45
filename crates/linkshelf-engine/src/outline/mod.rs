//! Flat, offset-indexed view of a markdown notes document.
//!
//! The outline is the parse side of the engine: one pass over the source
//! produces ordered headings and ordered link-entry lines, all addressed by
//! byte spans into the original text. Nothing here mutates; the editing
//! side plans against this snapshot and the offset tracker owns every
//! coordinate adjustment after that.

pub mod span;

pub use span::Span;

use std::sync::LazyLock;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;

/// Index of a heading within one [`Outline`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadingRef(pub usize);

/// Index of a link entry within one [`Outline`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkRef(pub usize);

/// A section marker: a heading line that groups the content below it.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    /// Heading text, trimmed of surrounding whitespace.
    pub text: String,
    /// Heading level (1-6).
    pub level: u8,
    /// Byte offset of the heading line start.
    pub anchor: usize,
    /// Full heading line(s), including the terminating newline.
    pub line_span: Span,
    /// Position in document order; the synthetic bucket is always 0.
    pub order: usize,
    /// True for the synthesized fallback bucket, which has no line of its
    /// own and can never be an insertion target.
    pub synthetic: bool,
}

/// A link-entry line: a line whose content is a lone outbound link, plus
/// the heading that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEntry {
    /// The link target.
    pub url: String,
    /// The whole entry line, including the terminating newline (or up to
    /// end of text for a final unterminated line).
    pub span: Span,
    /// Nearest preceding heading in document order.
    pub owner: HeadingRef,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

// An entry line is either a bare URL (angle brackets allowed) or a single
// markdown link, optionally behind a list marker.
static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<?(https?://[^\s>]+)>?$").expect("bare URL pattern"));
static LINK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*+]\s+)?\[[^\]]*\]\((https?://[^)\s]+)\)$").expect("link line pattern")
});

/// Offset-indexed snapshot of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    text: String,
    headings: Vec<Heading>,
    links: Vec<LinkEntry>,
}

impl Outline {
    /// Parse raw document bytes into an outline.
    ///
    /// The synthetic fallback bucket named `fallback_heading` is created
    /// first and owns any content that precedes the first real heading, so
    /// every link entry has an owner even in a heading-less document.
    pub fn from_bytes(bytes: &[u8], fallback_heading: &str) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::parse(text, fallback_heading))
    }

    fn parse(text: &str, fallback_heading: &str) -> Self {
        let mut headings = vec![Heading {
            text: fallback_heading.to_string(),
            level: 1,
            anchor: 0,
            line_span: Span::new(0, 0),
            order: 0,
            synthetic: true,
        }];
        let mut masked: Vec<Span> = Vec::new();

        let parser = Parser::new_ext(text, Options::empty());
        let mut heading_start: Option<usize> = None;
        let mut heading_level = 1u8;
        let mut heading_text = String::new();
        for (event, range) in parser.into_offset_iter() {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    heading_start = Some(range.start);
                    heading_level = heading_level_to_u8(level);
                    heading_text.clear();
                }
                Event::Text(t) | Event::Code(t) if heading_start.is_some() => {
                    heading_text.push_str(&t);
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(start) = heading_start.take() {
                        let anchor = line_start(text, start);
                        let line_span = Span::new(anchor, past_line_end(text, range.end));
                        let order = headings.len();
                        headings.push(Heading {
                            text: heading_text.trim().to_string(),
                            level: heading_level,
                            anchor,
                            line_span,
                            order,
                            synthetic: false,
                        });
                    }
                }
                Event::Start(Tag::CodeBlock(_)) => {
                    masked.push(Span::new(range.start, range.end));
                }
                _ => {}
            }
        }

        // Line scan for entry lines, walking headings and masks in step.
        let mut links = Vec::new();
        let mut owner = HeadingRef(0);
        let mut next_heading = 1; // headings[0] is synthetic, has no line
        let mut pos = 0;
        for line in text.split_inclusive('\n') {
            let span = Span::new(pos, pos + line.len());
            pos = span.end;

            while next_heading < headings.len() && headings[next_heading].anchor < span.end {
                owner = HeadingRef(next_heading);
                next_heading += 1;
            }
            if headings[owner.0].line_span.end > span.start {
                continue; // still inside the owner's heading line(s)
            }
            if masked.iter().any(|m| m.contains(span.start)) {
                continue;
            }

            if let Some(url) = entry_url(line.trim()) {
                links.push(LinkEntry {
                    url,
                    span,
                    owner,
                });
            }
        }

        Self {
            text: text.to_string(),
            headings,
            links,
        }
    }

    /// Total length accounting: byte length of the parsed text.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn headings(&self) -> &[Heading] {
        &self.headings
    }

    pub fn links(&self) -> &[LinkEntry] {
        &self.links
    }

    pub fn heading(&self, r: HeadingRef) -> &Heading {
        &self.headings[r.0]
    }

    pub fn link(&self, r: LinkRef) -> &LinkEntry {
        &self.links[r.0]
    }

    /// First physical heading whose text matches `text`, case-insensitive.
    pub fn heading_by_text(&self, text: &str) -> Option<HeadingRef> {
        let wanted = text.trim();
        self.headings
            .iter()
            .position(|h| !h.synthetic && h.text.eq_ignore_ascii_case(wanted))
            .map(HeadingRef)
    }

    /// The designated fallback bucket: the physical heading carrying the
    /// fallback text when the document has one, else the synthetic bucket.
    pub fn fallback(&self) -> HeadingRef {
        self.heading_by_text(&self.headings[0].text)
            .unwrap_or(HeadingRef(0))
    }

    /// Content region of a section: from the end of the heading line to the
    /// start of the next heading line (or end of text).
    pub fn section_span(&self, r: HeadingRef) -> Span {
        let start = self.headings[r.0].line_span.end;
        let end = self
            .headings
            .iter()
            .filter(|h| !h.synthetic && h.anchor >= start && h.order > self.headings[r.0].order)
            .map(|h| h.anchor)
            .min()
            .unwrap_or(self.text.len());
        Span::new(start, end.max(start))
    }

    /// Non-blank line spans within a section, in document order. Each span
    /// includes its terminating newline where one exists.
    pub fn section_entry_lines(&self, r: HeadingRef) -> Vec<Span> {
        let section = self.section_span(r);
        let mut out = Vec::new();
        let mut pos = section.start;
        for line in self.text[section.start..section.end].split_inclusive('\n') {
            let span = Span::new(pos, pos + line.len());
            pos = span.end;
            if !line.trim().is_empty() {
                out.push(span);
            }
        }
        out
    }
}

fn entry_url(trimmed: &str) -> Option<String> {
    if trimmed.is_empty() {
        return None;
    }
    if let Some(caps) = LINK_LINE.captures(trimmed) {
        return Some(caps[1].to_string());
    }
    BARE_URL
        .captures(trimmed)
        .map(|caps| caps[1].to_string())
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

fn past_line_end(text: &str, offset: usize) -> usize {
    if offset > 0 && text.as_bytes().get(offset - 1) == Some(&b'\n') {
        return offset;
    }
    text[offset..]
        .find('\n')
        .map(|i| offset + i + 1)
        .unwrap_or(text.len())
}
