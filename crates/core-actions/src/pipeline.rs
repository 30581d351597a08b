//! Commit of one action's transformation batch.
//!
//! Two phases, in this order:
//! 1. Every transformation is resolved against the pre-edit buffer. Targets
//!    outside the buffer and edits overlapping an already accepted one are
//!    dropped and reported; the rest go to the buffer as one atomic batch.
//! 2. The cursor is carried through the accepted edits, then the cursor diffs
//!    of the accepted transformations are summed (enqueue order) and applied
//!    against the post-edit buffer.

use core_state::Transformation;
use core_text::{BufferError, Position, PositionDiff, TextBuffer, TextEdit};
use tracing::{error, trace, warn};

/// A transformation skipped at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedTransformation {
    pub transformation: Transformation,
    pub reason: BufferError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub cursor: Position,
    pub applied: usize,
    pub dropped: Vec<DroppedTransformation>,
}

struct Accepted {
    start: usize,
    end: usize,
    inserted: usize,
}

pub fn commit_transformations<B: TextBuffer + ?Sized>(
    buf: &mut B,
    batch: Vec<Transformation>,
    cursor: Position,
) -> CommitReport {
    let cursor = cursor.clamp_to(buf);
    if batch.is_empty() {
        return CommitReport {
            cursor,
            applied: 0,
            dropped: Vec::new(),
        };
    }

    let mut edits: Vec<TextEdit> = Vec::with_capacity(batch.len());
    let mut accepted: Vec<Accepted> = Vec::with_capacity(batch.len());
    let mut dropped = Vec::new();
    let mut diff = PositionDiff::default();

    for t in batch {
        let resolved = t.resolve_edit(buf).and_then(|edit| {
            let (start, end) = buf.edit_offsets(&edit)?;
            if accepted.iter().any(|a| start < a.end && a.start < end) {
                return Err(BufferError::Overlapping { range: edit.range });
            }
            Ok((edit, start, end))
        });
        match resolved {
            Ok((edit, start, end)) => {
                trace!(target: "actions.transform", kind = t.kind(), start, end, "accept");
                if let Some(d) = t.diff() {
                    diff = diff + d;
                }
                accepted.push(Accepted {
                    start,
                    end,
                    inserted: edit.text.chars().count(),
                });
                edits.push(edit);
            }
            Err(reason) => {
                warn!(target: "actions.transform", kind = t.kind(), %reason, "transformation_dropped");
                dropped.push(DroppedTransformation {
                    transformation: t,
                    reason,
                });
            }
        }
    }

    let offset = buf.offset_at(cursor).unwrap_or_default();
    let carried = carry_offset(offset, &accepted);

    if let Err(e) = buf.apply_edits(&edits) {
        // The host rejected a batch that validated against its own offsets.
        error!(target: "actions.transform", error = %e, edits = edits.len(), "batch_rejected");
        return CommitReport {
            cursor,
            applied: 0,
            dropped,
        };
    }

    let cursor = buf.position_at(carried).translate(diff).clamp_to(buf);
    trace!(target: "actions.transform", applied = edits.len(), dropped = dropped.len(), cursor = %cursor, "commit");
    CommitReport {
        cursor,
        applied: edits.len(),
        dropped,
    }
}

/// Map a pre-edit offset through non-overlapping edits given in pre-edit
/// coordinates. Insertions at the offset push it right; an edit spanning it
/// pulls it back to the edit start.
fn carry_offset(offset: usize, edits: &[Accepted]) -> usize {
    let mut base = offset;
    let mut shift: isize = 0;
    for a in edits {
        if a.end <= offset {
            shift += a.inserted as isize - (a.end - a.start) as isize;
        } else if a.start < offset {
            base = a.start;
        }
    }
    if shift >= 0 {
        base.saturating_add(shift.unsigned_abs())
    } else {
        base.saturating_sub(shift.unsigned_abs())
    }
}
