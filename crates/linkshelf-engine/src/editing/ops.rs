use std::fmt;

/// Paragraph-level styling a store can apply to a range.
///
/// The planner only ever emits `Normal`: relocated entries must not inherit
/// bullet or heading styling from their insertion context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    Normal,
}

impl ParagraphStyle {
    /// Rewrite `text` so every line carries this style.
    pub fn apply(self, text: &str) -> String {
        match self {
            ParagraphStyle::Normal => text
                .split_inclusive('\n')
                .map(|line| {
                    let (content, newline) = match line.strip_suffix('\n') {
                        Some(c) => (c, "\n"),
                        None => (line, ""),
                    };
                    format!("{}{newline}", normalize_line(content))
                })
                .collect(),
        }
    }
}

/// One primitive document mutation.
///
/// Every offset is expressed in the pre-batch coordinate space: the
/// positions of the document as it was parsed, before any operation of the
/// batch is applied. Translation to effective positions happens exactly
/// once, in the offset tracker, at apply time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    InsertText { at: usize, text: String },
    DeleteRange { start: usize, end: usize },
    SetStyle { start: usize, end: usize, style: ParagraphStyle },
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOp::InsertText { at, text } => {
                write!(f, "insert {} bytes at {at}", text.len())
            }
            EditOp::DeleteRange { start, end } => write!(f, "delete {start}..{end}"),
            EditOp::SetStyle { start, end, style } => {
                write!(f, "style {start}..{end} as {style:?}")
            }
        }
    }
}

/// Strip block markers (quote marks, list bullets, heading hashes) and the
/// indentation that carried them, leaving flush-left plain text.
pub(crate) fn normalize_line(line: &str) -> &str {
    let mut s = line.trim_start();
    loop {
        let rest = if let Some(r) = s.strip_prefix('>') {
            r
        } else if let Some(r) = strip_list_marker(s) {
            r
        } else if let Some(r) = strip_heading_marker(s) {
            r
        } else {
            break;
        };
        s = rest.trim_start();
    }
    s
}

fn strip_list_marker(s: &str) -> Option<&str> {
    for marker in ["- ", "* ", "+ "] {
        if let Some(r) = s.strip_prefix(marker) {
            return Some(r);
        }
    }
    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &s[digits..];
        if let Some(r) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(r);
        }
    }
    None
}

fn strip_heading_marker(s: &str) -> Option<&str> {
    let hashes = s.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&hashes) {
        s[hashes..].strip_prefix(' ')
    } else {
        None
    }
}
