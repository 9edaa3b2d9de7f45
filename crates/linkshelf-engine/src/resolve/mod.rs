//! Maps raw classifier output onto the document's own headings.
//!
//! Matching is tiered: exact text, then the configured keyword table, then
//! fuzzy similarity, then the fallback bucket. Given the same input and the
//! same heading set the result never varies, so reclassifying an already
//! organized document is a no-op.

use similar::TextDiff;

use crate::outline::{HeadingRef, Outline};

/// One externally configured matching rule: if any keyword fragment occurs
/// in the lowered raw category, the named heading wins.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRule {
    pub heading: String,
    pub keywords: Vec<String>,
}

/// Ordered keyword rules. Order is significant: the first matching rule
/// wins, so collisions between keyword sets resolve by configuration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordTable {
    rules: Vec<KeywordRule>,
}

impl KeywordTable {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}

/// Which tier produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Keyword,
    Fuzzy,
    Fallback,
}

/// Tiered category-to-heading resolver.
#[derive(Debug, Clone)]
pub struct Resolver {
    table: KeywordTable,
    threshold: f64,
}

impl Resolver {
    pub const DEFAULT_THRESHOLD: f64 = 0.6;

    pub fn new(table: KeywordTable, threshold: f64) -> Self {
        Self { table, threshold }
    }

    /// Resolve a raw category string to a heading of `outline`.
    ///
    /// Never fails: when no tier clears, the outline's fallback bucket is
    /// returned with [`MatchTier::Fallback`] so the caller can count the
    /// miss.
    pub fn resolve(&self, raw: &str, outline: &Outline) -> (HeadingRef, MatchTier) {
        let raw = raw.trim();
        let lowered = raw.to_lowercase();
        let fallback = outline.fallback();

        if let Some(r) = self.exact(raw, outline) {
            return (r, MatchTier::Exact);
        }
        if let Some(r) = self.keyword(&lowered, outline) {
            return (r, MatchTier::Keyword);
        }
        if let Some(r) = self.fuzzy(&lowered, outline, fallback) {
            return (r, MatchTier::Fuzzy);
        }
        (fallback, MatchTier::Fallback)
    }

    fn exact(&self, raw: &str, outline: &Outline) -> Option<HeadingRef> {
        outline
            .headings()
            .iter()
            .position(|h| !h.synthetic && h.text.eq_ignore_ascii_case(raw))
            .map(HeadingRef)
    }

    fn keyword(&self, lowered: &str, outline: &Outline) -> Option<HeadingRef> {
        for rule in &self.table.rules {
            // Rules naming a heading the document lacks are inert.
            let Some(heading) = outline.heading_by_text(&rule.heading) else {
                continue;
            };
            for kw in &rule.keywords {
                let kw = kw.trim().to_lowercase();
                if !kw.is_empty() && lowered.contains(&kw) {
                    return Some(heading);
                }
            }
        }
        None
    }

    fn fuzzy(&self, lowered: &str, outline: &Outline, fallback: HeadingRef) -> Option<HeadingRef> {
        let mut best: Option<(HeadingRef, f64)> = None;
        for (i, h) in outline.headings().iter().enumerate() {
            if h.synthetic || HeadingRef(i) == fallback {
                continue;
            }
            let ratio =
                TextDiff::from_chars(lowered, h.text.to_lowercase().as_str()).ratio() as f64;
            // Strictly-greater keeps the earliest heading on ties.
            if ratio >= self.threshold && best.map_or(true, |(_, b)| ratio > b) {
                best = Some((HeadingRef(i), ratio));
            }
        }
        best.map(|(r, _)| r)
    }
}
