//! Declarative edit intents queued by actions.
//!
//! A `Transformation` names what should happen in pre-edit coordinates plus an
//! optional cursor diff. Nothing here touches the buffer; resolution against a
//! concrete buffer (`resolve_edit`) is only used by the commit pipeline.

use core_text::{BufferError, Position, PositionDiff, Range, TextBuffer, TextEdit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformation {
    InsertText {
        position: Position,
        text: String,
        diff: Option<PositionDiff>,
    },
    /// Delete the single character before `position`. At column 0 this
    /// removes the preceding line break.
    DeleteText {
        position: Position,
        diff: Option<PositionDiff>,
    },
    DeleteRange {
        range: Range,
        diff: Option<PositionDiff>,
    },
    ReplaceText {
        range: Range,
        text: String,
        diff: Option<PositionDiff>,
    },
}

impl Transformation {
    pub fn insert(position: Position, text: impl Into<String>) -> Self {
        Transformation::InsertText {
            position,
            text: text.into(),
            diff: None,
        }
    }

    pub fn replace(range: Range, text: impl Into<String>) -> Self {
        Transformation::ReplaceText {
            range,
            text: text.into(),
            diff: None,
        }
    }

    pub fn delete_range(range: Range) -> Self {
        Transformation::DeleteRange { range, diff: None }
    }

    /// Attach a cursor diff, replacing any existing one.
    pub fn with_diff(mut self, d: PositionDiff) -> Self {
        match &mut self {
            Transformation::InsertText { diff, .. }
            | Transformation::DeleteText { diff, .. }
            | Transformation::DeleteRange { diff, .. }
            | Transformation::ReplaceText { diff, .. } => *diff = Some(d),
        }
        self
    }

    pub fn diff(&self) -> Option<PositionDiff> {
        match self {
            Transformation::InsertText { diff, .. }
            | Transformation::DeleteText { diff, .. }
            | Transformation::DeleteRange { diff, .. }
            | Transformation::ReplaceText { diff, .. } => *diff,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Transformation::InsertText { .. } => "insert_text",
            Transformation::DeleteText { .. } => "delete_text",
            Transformation::DeleteRange { .. } => "delete_range",
            Transformation::ReplaceText { .. } => "replace_text",
        }
    }

    /// Turn the intent into a concrete edit against `buf` as it is now.
    pub fn resolve_edit<B: TextBuffer + ?Sized>(&self, buf: &B) -> Result<TextEdit, BufferError> {
        let edit = match self {
            Transformation::InsertText { position, text, .. } => {
                TextEdit::insert(*position, text.clone())
            }
            Transformation::DeleteText { position, .. } => {
                let start = if position.character > 0 {
                    position.left()
                } else if position.line > 0 {
                    let prev = position.line - 1;
                    Position::new(prev, buf.line_len(prev))
                } else {
                    return Err(BufferError::OutOfRange { pos: *position });
                };
                TextEdit::delete(Range::new(start, *position))
            }
            Transformation::DeleteRange { range, .. } => TextEdit::delete(*range),
            Transformation::ReplaceText { range, text, .. } => {
                TextEdit::replace(*range, text.clone())
            }
        };
        // Validate both ends now so callers can drop the one bad intent.
        buf.edit_offsets(&edit)?;
        Ok(edit)
    }
}

/// Ordered batch of transformations for the in-flight action.
#[derive(Debug, Default, Clone)]
pub struct Transformer {
    pending: Vec<Transformation>,
}

impl Transformer {
    pub fn add_transformation(&mut self, t: Transformation) {
        self.pending.push(t);
    }

    /// Take the batch, leaving the transformer empty.
    pub fn take(&mut self) -> Vec<Transformation> {
        std::mem::take(&mut self.pending)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transformation> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
