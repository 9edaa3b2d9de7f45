//! The shift table: sole authority for translating pre-batch offsets into
//! effective offsets while a batch is applied.
//!
//! Every insertion and deletion recorded here contributes a breakpoint; a
//! translation is the original offset plus every delta whose breakpoint
//! lies at or before it. Positions strictly inside a deleted range are
//! invalidated and refuse to translate rather than returning a stale
//! position. Nothing outside this type is allowed to do offset arithmetic
//! across operations.

use super::ops::EditOp;
use crate::outline::Span;

/// A pre-batch offset referenced a region already deleted in this batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("offset {offset} falls inside a range deleted earlier in this batch")]
pub struct OffsetInvalidated {
    pub offset: usize,
}

#[derive(Debug, Clone, Copy)]
struct InsertRecord {
    at: usize,
    effective_start: usize,
    len: usize,
}

/// Translates pre-batch offsets through the operations recorded so far.
#[derive(Debug, Default)]
pub struct OffsetTracker {
    /// Breakpoints sorted by original offset, deltas merged per offset.
    breakpoints: Vec<(usize, i64)>,
    /// Deleted intervals in original coordinates, sorted and disjoint.
    deleted: Vec<Span>,
    /// Insertions in record order, for zero-width style resolution.
    inserts: Vec<InsertRecord>,
}

impl OffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a pre-batch offset to its effective position once all recorded
    /// operations have been applied.
    ///
    /// Boundary positions of a deleted range are shared with the adjacent
    /// content and stay valid; both translate to the collapse point.
    pub fn translate(&self, offset: usize) -> Result<usize, OffsetInvalidated> {
        if self
            .deleted
            .iter()
            .any(|d| offset > d.start && offset < d.end)
        {
            return Err(OffsetInvalidated { offset });
        }
        let mut shifted = offset as i64;
        for &(bp, delta) in &self.breakpoints {
            if bp > offset {
                break;
            }
            shifted += delta;
        }
        debug_assert!(shifted >= 0, "translation drove offset {offset} negative");
        Ok(shifted as usize)
    }

    /// Record an operation as logically applied. Must be called in batch
    /// order, after the operation's own offsets have been validated.
    pub fn record(&mut self, op: &EditOp) -> Result<(), OffsetInvalidated> {
        match op {
            EditOp::DeleteRange { start, end } => {
                let span = Span::new(*start, *end);
                if self.is_deleted(span) {
                    return Err(OffsetInvalidated { offset: *start });
                }
                self.translate(*start)?;
                self.translate(*end)?;
                self.push_delta(*end, -((end - start) as i64));
                let at = self
                    .deleted
                    .partition_point(|d| d.start < span.start);
                self.deleted.insert(at, span);
            }
            EditOp::InsertText { at, text } => {
                let effective_start = self.translate(*at)?;
                self.push_delta(*at, text.len() as i64);
                self.inserts.push(InsertRecord {
                    at: *at,
                    effective_start,
                    len: text.len(),
                });
            }
            EditOp::SetStyle { .. } => {}
        }
        Ok(())
    }

    /// Resolve a style span to effective coordinates.
    ///
    /// A zero-width span at an insertion anchor designates the block most
    /// recently inserted at that anchor; without a matching insertion it
    /// collapses to nothing. Non-empty spans translate end-for-end.
    pub fn resolve_style_span(
        &self,
        start: usize,
        end: usize,
    ) -> Result<(usize, usize), OffsetInvalidated> {
        if start == end {
            if let Some(rec) = self.inserts.iter().rev().find(|r| r.at == start) {
                return Ok((rec.effective_start, rec.effective_start + rec.len));
            }
            let p = self.translate(start)?;
            return Ok((p, p));
        }
        Ok((self.translate(start)?, self.translate(end)?))
    }

    /// True if the span lies entirely within a single deleted interval.
    pub fn is_deleted(&self, span: Span) -> bool {
        self.deleted
            .iter()
            .any(|d| d.start <= span.start && span.end <= d.end)
    }

    /// Apply-side correction for a store whose styling physically rewrites
    /// text. Plan-produced batches never need this (styling is
    /// length-preserving by construction), but the tracker stays correct
    /// for hand-built batches.
    pub(crate) fn adjust(&mut self, at: usize, delta: i64) {
        if delta != 0 {
            self.push_delta(at, delta);
        }
    }

    fn push_delta(&mut self, at: usize, delta: i64) {
        match self.breakpoints.binary_search_by_key(&at, |&(bp, _)| bp) {
            Ok(i) => self.breakpoints[i].1 += delta,
            Err(i) => self.breakpoints.insert(i, (at, delta)),
        }
    }
}
