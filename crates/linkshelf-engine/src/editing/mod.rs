/*!
 * # Editing core
 *
 * The mutation side of the engine. The outline gives an immutable snapshot
 * of the document; everything here turns decisions about that snapshot
 * into an ordered batch of primitive operations that can be applied later,
 * possibly by an external store.
 *
 * Three rules keep the batches stable under order-dependent mutation:
 *
 * 1. **Pre-batch coordinates everywhere.** Every `EditOp` refers to the
 *    document as parsed. Nothing re-derives offsets mid-batch.
 * 2. **One tracker, two sides.** The planner registers each operation with
 *    an [`OffsetTracker`] as it plans, so later assignments see earlier
 *    shifts; the apply layer replays the batch through a fresh tracker at
 *    commit time. The tracker is the only component allowed to translate
 *    an offset.
 * 3. **Plan in document order.** `plan_batch` visits links by ascending
 *    start offset, which keeps the tracker's breakpoint table monotonic
 *    and the whole pass deterministic.
 *
 * - **`ops`**: the `EditOp` tagged enum and paragraph styling.
 * - **`tracker`**: the shift table; invalidation of deleted regions.
 * - **`planner`**: relocation and section-sort planning.
 * - **`apply`**: reference application against an `xi_rope::Rope`.
 */

pub mod apply;
pub mod ops;
pub mod planner;
pub mod tracker;

pub use apply::{ApplyError, apply_batch};
pub use ops::{EditOp, ParagraphStyle};
pub use planner::{
    Assignment, BatchPlan, Classified, PlanError, Planned, SkipReason, SkipReport, plan_batch,
    plan_relocation, plan_section_sort,
};
pub use tracker::{OffsetInvalidated, OffsetTracker};
