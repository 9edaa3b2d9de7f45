//! Reference application of an operation batch to document text.
//!
//! This is what the file store runs at commit time, and what the tests run
//! to check round-trips. Operations arrive in pre-batch coordinates and in
//! batch order; a fresh tracker translates each one against the shifts of
//! everything applied before it. Any failure aborts with no partial
//! result.

use xi_rope::Rope;

use super::ops::{EditOp, ParagraphStyle};
use super::tracker::{OffsetInvalidated, OffsetTracker};

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error(transparent)]
    OffsetInvalidated(#[from] OffsetInvalidated),
    #[error("operation range {start}..{end} is out of bounds for document of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

/// Apply a batch to `text`, returning the rewritten document.
pub fn apply_batch(text: &str, ops: &[EditOp]) -> Result<String, ApplyError> {
    let mut rope = Rope::from(text);
    let mut tracker = OffsetTracker::new();

    for op in ops {
        match op {
            EditOp::DeleteRange { start, end } => {
                let s = tracker.translate(*start)?;
                let e = tracker.translate(*end)?;
                check_bounds(s, e, rope.len())?;
                rope.edit(s..e, "");
            }
            EditOp::InsertText { at, text } => {
                let p = tracker.translate(*at)?;
                check_bounds(p, p, rope.len())?;
                rope.edit(p..p, text.as_str());
            }
            EditOp::SetStyle { start, end, style } => {
                let (s, e) = tracker.resolve_style_span(*start, *end)?;
                check_bounds(s, e, rope.len())?;
                if s < e {
                    let styled = style.apply(&rope.slice_to_cow(s..e));
                    // Styling markdown is a text rewrite; if it changed the
                    // length, later translations must see the shift.
                    tracker.adjust(*start, styled.len() as i64 - (e - s) as i64);
                    rope.edit(s..e, styled.as_str());
                }
            }
        }
        tracker.record(op)?;
    }

    Ok(rope.to_string())
}

fn check_bounds(start: usize, end: usize, len: usize) -> Result<(), ApplyError> {
    if start > end || end > len {
        return Err(ApplyError::OutOfBounds { start, end, len });
    }
    Ok(())
}
