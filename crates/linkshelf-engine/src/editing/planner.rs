//! Turns resolved assignments into ordered edit-operation batches.
//!
//! Planning is pure and sequential: assignments are visited in document
//! order against one shared [`OffsetTracker`], so each emitted operation
//! already accounts for the shifts of everything planned before it. The
//! operations themselves stay in pre-batch coordinates; only the tracker
//! may turn them into effective positions.

use super::ops::{self, EditOp, ParagraphStyle};
use super::tracker::{OffsetInvalidated, OffsetTracker};
use crate::outline::{HeadingRef, LinkRef, Outline, Span};
use crate::resolve::{MatchTier, Resolver};

/// Classifier output for one link, ready for resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub link: LinkRef,
    pub raw_category: String,
    pub annotation: String,
}

/// A link with its resolved destination heading.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub link: LinkRef,
    pub target: HeadingRef,
    pub tier: MatchTier,
    pub annotation: String,
}

/// Why an assignment produced no operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The link already sits under its resolved heading.
    AlreadyPlaced,
    /// The resolved heading has no physical line to insert beneath.
    NoInsertionPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkipReport {
    pub url: String,
    pub reason: SkipReason,
}

/// Outcome of planning a single assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Planned {
    Ops(Vec<EditOp>),
    Skipped(SkipReason),
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    OffsetInvalidated(#[from] OffsetInvalidated),
}

/// Everything one planning pass produced.
#[derive(Debug, Default)]
pub struct BatchPlan {
    /// Ordered operations, pre-batch coordinates throughout.
    pub ops: Vec<EditOp>,
    pub moved: usize,
    pub skipped: Vec<SkipReport>,
    /// Links that only resolved via the fallback tier.
    pub fallback_misses: Vec<String>,
}

/// Plan the relocation of one link beneath its assigned heading.
///
/// Emits the delete/insert/style triple, registering each operation with
/// the tracker before returning so later assignments see the shifts.
pub fn plan_relocation(
    outline: &Outline,
    assignment: &Assignment,
    tracker: &mut OffsetTracker,
) -> Result<Planned, PlanError> {
    let link = outline.link(assignment.link);
    if assignment.target == link.owner {
        return Ok(Planned::Skipped(SkipReason::AlreadyPlaced));
    }
    if outline.heading(assignment.target).synthetic {
        return Ok(Planned::Skipped(SkipReason::NoInsertionPoint));
    }

    let mut ops = Vec::with_capacity(3);

    let delete = EditOp::DeleteRange {
        start: link.span.start,
        end: link.span.end,
    };
    tracker.record(&delete)?;
    ops.push(delete);

    let anchor = insertion_anchor(outline, assignment.target, tracker);
    tracker.translate(anchor)?;
    let insert = EditOp::InsertText {
        at: anchor,
        text: render_block(outline, link.span, &assignment.annotation, anchor),
    };
    tracker.record(&insert)?;
    ops.push(insert);

    let style = EditOp::SetStyle {
        start: anchor,
        end: anchor,
        style: ParagraphStyle::Normal,
    };
    tracker.record(&style)?;
    ops.push(style);

    Ok(Planned::Ops(ops))
}

/// Plan a whole batch of classifications against one document snapshot.
///
/// Pure: no network, no store. Assignments are resolved and planned in
/// ascending link offset order regardless of the order classifications
/// arrive in.
pub fn plan_batch(
    outline: &Outline,
    resolver: &Resolver,
    classified: &[Classified],
) -> Result<BatchPlan, PlanError> {
    let mut ordered: Vec<&Classified> = classified.iter().collect();
    ordered.sort_by_key(|c| outline.link(c.link).span.start);

    let mut tracker = OffsetTracker::new();
    let mut plan = BatchPlan::default();
    for c in ordered {
        let (target, tier) = resolver.resolve(&c.raw_category, outline);
        if tier == MatchTier::Fallback {
            plan.fallback_misses.push(outline.link(c.link).url.clone());
        }
        let assignment = Assignment {
            link: c.link,
            target,
            tier,
            annotation: c.annotation.clone(),
        };
        match plan_relocation(outline, &assignment, &mut tracker)? {
            Planned::Ops(ops) => {
                plan.moved += 1;
                plan.ops.extend(ops);
            }
            Planned::Skipped(reason) => plan.skipped.push(SkipReport {
                url: outline.link(c.link).url.clone(),
                reason,
            }),
        }
    }
    Ok(plan)
}

/// Plan an alphabetical sort of one section's entry lines by URL key.
///
/// Returns an empty batch when the section is already sorted or too small
/// to reorder, so repeated runs settle immediately.
pub fn plan_section_sort(outline: &Outline, heading: HeadingRef) -> Vec<EditOp> {
    if outline.heading(heading).synthetic {
        return Vec::new();
    }
    let lines = outline.section_entry_lines(heading);
    if lines.len() < 2 {
        return Vec::new();
    }

    let keyed: Vec<(String, Span)> = lines
        .iter()
        .map(|s| (sort_key(&outline.text()[s.start..s.end]), *s))
        .collect();
    if keyed.windows(2).all(|w| w[0].0 <= w[1].0) {
        return Vec::new();
    }
    let mut sorted = keyed.clone();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut ops: Vec<EditOp> = keyed
        .iter()
        .map(|(_, span)| EditOp::DeleteRange {
            start: span.start,
            end: span.end,
        })
        .collect();
    let mut block = String::new();
    for (_, span) in &sorted {
        let line = &outline.text()[span.start..span.end];
        block.push_str(line);
        if !line.ends_with('\n') {
            block.push('\n');
        }
    }
    ops.push(EditOp::InsertText {
        at: lines[0].start,
        text: block,
    });
    ops
}

/// The offset immediately after the last surviving entry of the target
/// section, or after the heading line when the section is empty.
/// Survivorship is judged against this batch's deletions, so the anchor is
/// always a live position.
fn insertion_anchor(outline: &Outline, target: HeadingRef, tracker: &OffsetTracker) -> usize {
    outline
        .section_entry_lines(target)
        .iter()
        .rev()
        .find(|span| !tracker.is_deleted(**span))
        .map(|span| span.end)
        .unwrap_or_else(|| outline.heading(target).line_span.end)
}

fn render_block(outline: &Outline, link_span: Span, annotation: &str, anchor: usize) -> String {
    let entry_line = outline.text()[link_span.start..link_span.end].trim_end_matches('\n');
    let mut block = String::new();
    if anchor > 0 && !outline.text()[..anchor].ends_with('\n') {
        block.push('\n');
    }
    block.push_str(ops::normalize_line(entry_line));
    block.push('\n');
    let annotation = annotation.trim();
    if !annotation.is_empty() {
        block.push_str(annotation);
        block.push('\n');
    }
    block
}

fn sort_key(line: &str) -> String {
    let t = line.trim();
    let rest = t.split_once("://").map(|(_, r)| r).unwrap_or(t);
    rest.to_lowercase()
}
