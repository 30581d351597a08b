//! Text buffer collaborator interface plus a rope-backed reference buffer.
//!
//! The engine never owns persistent storage. It reads line lengths and
//! content through [`TextBuffer`] and hands back batches of [`TextEdit`]s that
//! the implementor must apply atomically. [`Buffer`] is the in-tree
//! implementation backed by `ropey::Rope`; hosts embedding the engine supply
//! their own.

use ropey::Rope;
use thiserror::Error;
use tracing::trace;

pub mod motion;
mod position;

pub use position::{Position, PositionDiff, Range};

/// One (range, replacement) pair expressed in pre-edit coordinates.
///
/// An empty range is an insertion, an empty `text` is a deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range,
    pub text: String,
}

impl TextEdit {
    pub fn insert(at: Position, text: impl Into<String>) -> Self {
        Self {
            range: Range::empty(at),
            text: text.into(),
        }
    }

    pub fn delete(range: Range) -> Self {
        Self {
            range,
            text: String::new(),
        }
    }

    pub fn replace(range: Range, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("position {pos} is outside the buffer")]
    OutOfRange { pos: Position },
    #[error("edit {range} overlaps another edit in the same batch")]
    Overlapping { range: Range },
}

/// Narrow read/apply surface the engine needs from a host text buffer.
///
/// Line terminators are a single `'\n'` and are never counted in
/// `line_len`. Offsets are absolute `char` indices.
pub trait TextBuffer {
    fn line_count(&self) -> usize;

    /// Length of `line` in chars, terminator excluded. Zero for missing lines.
    fn line_len(&self, line: usize) -> usize;

    /// Content of `line` without its terminator.
    fn line_text(&self, line: usize) -> Option<String>;

    /// Apply every edit or none of them. Ranges are interpreted against the
    /// buffer as it was before the call.
    fn apply_edits(&mut self, edits: &[TextEdit]) -> Result<(), BufferError>;

    /// Full buffer content.
    fn text(&self) -> String;

    fn len_chars(&self) -> usize {
        let lines = self.line_count();
        (0..lines).map(|l| self.line_len(l)).sum::<usize>() + lines.saturating_sub(1)
    }

    /// Absolute offset of `pos`, or `None` when it lies outside the buffer.
    fn offset_at(&self, pos: Position) -> Option<usize> {
        if pos.line >= self.line_count() || pos.character > self.line_len(pos.line) {
            return None;
        }
        let before: usize = (0..pos.line).map(|l| self.line_len(l) + 1).sum();
        Some(before + pos.character)
    }

    /// Inverse of `offset_at`; offsets past the end clamp to the last position.
    fn position_at(&self, offset: usize) -> Position {
        let mut remaining = offset;
        let lines = self.line_count();
        for line in 0..lines {
            let len = self.line_len(line);
            if remaining <= len {
                return Position::new(line, remaining);
            }
            remaining -= len + 1;
        }
        let last = lines.saturating_sub(1);
        Position::new(last, self.line_len(last))
    }

    /// Resolve an edit into an absolute `[start, end)` offset pair.
    fn edit_offsets(&self, edit: &TextEdit) -> Result<(usize, usize), BufferError> {
        let start = self
            .offset_at(edit.range.start)
            .ok_or(BufferError::OutOfRange {
                pos: edit.range.start,
            })?;
        let end = self
            .offset_at(edit.range.end)
            .ok_or(BufferError::OutOfRange {
                pos: edit.range.end,
            })?;
        Ok((start, end))
    }
}

/// A text buffer backed by a `ropey::Rope`.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
    pub name: String,
}

impl Buffer {
    /// Construct a buffer from an in-memory string slice. `\r\n` line endings
    /// are normalized to `\n`.
    pub fn from_str(name: impl Into<String>, content: &str) -> Result<Self, BufferError> {
        let normalized;
        let content = if content.contains('\r') {
            normalized = content.replace("\r\n", "\n");
            normalized.as_str()
        } else {
            content
        };
        Ok(Self {
            rope: Rope::from_str(content),
            name: name.into(),
        })
    }
}

impl TextBuffer for Buffer {
    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line_len(&self, idx: usize) -> usize {
        if idx >= self.rope.len_lines() {
            return 0;
        }
        let line = self.rope.line(idx);
        let len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }

    fn line_text(&self, idx: usize) -> Option<String> {
        if idx >= self.rope.len_lines() {
            return None;
        }
        let mut s = self.rope.line(idx).to_string();
        if s.ends_with('\n') {
            s.pop();
        }
        Some(s)
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn offset_at(&self, pos: Position) -> Option<usize> {
        if pos.line >= self.rope.len_lines() || pos.character > self.line_len(pos.line) {
            return None;
        }
        Some(self.rope.line_to_char(pos.line) + pos.character)
    }

    fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        Position::new(line, offset - self.rope.line_to_char(line))
    }

    fn apply_edits(&mut self, edits: &[TextEdit]) -> Result<(), BufferError> {
        let mut resolved = Vec::with_capacity(edits.len());
        for edit in edits {
            let (start, end) = self.edit_offsets(edit)?;
            resolved.push((start, end, edit));
        }
        // Stable sort keeps same-offset insertions in submission order.
        resolved.sort_by_key(|(start, end, _)| (*start, *end));
        for pair in resolved.windows(2) {
            let (_, prev_end, _) = pair[0];
            let (next_start, _, next) = pair[1];
            if next_start < prev_end {
                return Err(BufferError::Overlapping { range: next.range });
            }
        }
        for (start, end, edit) in resolved.iter().rev() {
            if start < end {
                self.rope.remove(*start..*end);
            }
            if !edit.text.is_empty() {
                self.rope.insert(*start, &edit.text);
            }
            trace!(target: "text.edit", start, end, inserted = edit.text.chars().count(), "apply_edit");
        }
        Ok(())
    }

    fn text(&self) -> String {
        self.rope.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_buffer_and_read_line() {
        let b = Buffer::from_str("test", "hello\nworld").unwrap();
        assert_eq!(b.line_count(), 2);
        assert_eq!(b.line_text(0).unwrap(), "hello");
        assert_eq!(b.line_text(1).unwrap(), "world");
        assert_eq!(b.line_len(0), 5);
        assert_eq!(b.line_len(9), 0);
    }

    #[test]
    fn crlf_is_normalized() {
        let b = Buffer::from_str("t", "a\r\nb").unwrap();
        assert_eq!(b.text(), "a\nb");
        assert_eq!(b.line_len(0), 1);
    }

    #[test]
    fn only_line_feed_breaks_lines() {
        let b = Buffer::from_str("t", "x\u{c}\ny").unwrap();
        assert_eq!(b.line_count(), 2);
        assert_eq!(b.line_len(0), 2);
        assert_eq!(b.line_text(0).unwrap(), "x\u{c}");
        assert_eq!(b.offset_at(Position::new(1, 0)), Some(3));

        let b = Buffer::from_str("t", "ab\rcd\u{b}e\u{85}f\u{2028}g\u{2029}h").unwrap();
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.line_len(0), 13);
        assert_eq!(b.position_at(5), Position::new(0, 5));
        assert_eq!(b.offset_at(Position::new(0, 13)), Some(13));
    }

    #[test]
    fn offsets_round_trip_through_lines() {
        let b = Buffer::from_str("t", "ab\ncde\n").unwrap();
        assert_eq!(b.offset_at(Position::new(1, 2)), Some(5));
        assert_eq!(b.position_at(5), Position::new(1, 2));
        assert_eq!(b.offset_at(Position::new(0, 3)), None);
        assert_eq!(b.offset_at(Position::new(3, 0)), None);
        assert_eq!(b.position_at(99), Position::new(2, 0));
    }

    #[test]
    fn default_offset_helpers_match_rope() {
        struct Lines(Vec<&'static str>);
        impl TextBuffer for Lines {
            fn line_count(&self) -> usize {
                self.0.len()
            }
            fn line_len(&self, line: usize) -> usize {
                self.0.get(line).map(|l| l.chars().count()).unwrap_or(0)
            }
            fn line_text(&self, line: usize) -> Option<String> {
                self.0.get(line).map(|l| l.to_string())
            }
            fn apply_edits(&mut self, _edits: &[TextEdit]) -> Result<(), BufferError> {
                Ok(())
            }
            fn text(&self) -> String {
                self.0.join("\n")
            }
        }
        let lines = Lines(vec!["ab", "cde", ""]);
        let rope = Buffer::from_str("t", "ab\ncde\n").unwrap();
        for offset in 0..rope.len_chars() {
            assert_eq!(lines.position_at(offset), rope.position_at(offset));
            let pos = rope.position_at(offset);
            assert_eq!(lines.offset_at(pos), rope.offset_at(pos));
        }
        assert_eq!(lines.len_chars(), rope.len_chars());
    }

    #[test]
    fn batch_uses_pre_edit_coordinates() {
        let mut b = Buffer::from_str("t", "abcdef").unwrap();
        b.apply_edits(&[
            TextEdit::replace(Range::new(Position::new(0, 0), Position::new(0, 1)), "XY"),
            TextEdit::delete(Range::new(Position::new(0, 4), Position::new(0, 6))),
        ])
        .unwrap();
        assert_eq!(b.text(), "XYbcd");
    }

    #[test]
    fn same_point_inserts_keep_submission_order() {
        let mut b = Buffer::from_str("t", "ab").unwrap();
        b.apply_edits(&[
            TextEdit::insert(Position::new(0, 1), "X"),
            TextEdit::insert(Position::new(0, 1), "Y"),
        ])
        .unwrap();
        assert_eq!(b.text(), "aXYb");
    }

    #[test]
    fn invalid_batch_leaves_buffer_untouched() {
        let mut b = Buffer::from_str("t", "abc").unwrap();
        let err = b
            .apply_edits(&[
                TextEdit::insert(Position::new(0, 0), "Z"),
                TextEdit::delete(Range::new(Position::new(0, 2), Position::new(0, 9))),
            ])
            .unwrap_err();
        assert_eq!(
            err,
            BufferError::OutOfRange {
                pos: Position::new(0, 9)
            }
        );
        assert_eq!(b.text(), "abc");

        let err = b
            .apply_edits(&[
                TextEdit::delete(Range::new(Position::new(0, 0), Position::new(0, 2))),
                TextEdit::replace(Range::new(Position::new(0, 1), Position::new(0, 3)), "q"),
            ])
            .unwrap_err();
        assert!(matches!(err, BufferError::Overlapping { .. }));
        assert_eq!(b.text(), "abc");
    }

    #[test]
    fn deleting_a_newline_joins_lines() {
        let mut b = Buffer::from_str("t", "ab\ncd").unwrap();
        b.apply_edits(&[TextEdit::delete(Range::new(
            Position::new(0, 2),
            Position::new(1, 0),
        ))])
        .unwrap();
        assert_eq!(b.text(), "abcd");
        assert_eq!(b.line_count(), 1);
    }
}
