//! Buffer coordinates: `Position`, `PositionDiff`, and `Range`.
//!
//! All three are plain `Copy` values. Movement never mutates a position in
//! place; every helper returns a fresh value. Columns are counted in `char`s
//! and never include the line terminator.

use std::fmt;
use std::ops::Add;

use crate::TextBuffer;

/// A (line, character) coordinate inside a buffer.
///
/// Ordering is document order: line first, then character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub const fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }

    pub const fn origin() -> Self {
        Self {
            line: 0,
            character: 0,
        }
    }

    /// One character to the left, saturating at column 0 of the same line.
    pub fn left(self) -> Self {
        Self {
            line: self.line,
            character: self.character.saturating_sub(1),
        }
    }

    /// One character to the right, clamped at the end of the line.
    pub fn right<B: TextBuffer + ?Sized>(self, buf: &B) -> Self {
        if self.is_line_end(buf) {
            return self;
        }
        Self {
            line: self.line,
            character: self.character + 1,
        }
    }

    /// True when no character sits under this position on its line.
    pub fn is_line_end<B: TextBuffer + ?Sized>(&self, buf: &B) -> bool {
        self.character >= buf.line_len(self.line)
    }

    pub fn is_before(&self, other: &Position) -> bool {
        self < other
    }

    pub fn is_before_or_equal(&self, other: &Position) -> bool {
        self <= other
    }

    pub fn is_after(&self, other: &Position) -> bool {
        self > other
    }

    pub fn is_after_or_equal(&self, other: &Position) -> bool {
        self >= other
    }

    pub fn with_character(self, character: usize) -> Self {
        Self {
            line: self.line,
            character,
        }
    }

    /// Apply a signed delta. Components saturate at zero; callers clamp to
    /// the buffer afterwards.
    pub fn translate(self, diff: PositionDiff) -> Self {
        Self {
            line: offset(self.line, diff.line),
            character: offset(self.character, diff.character),
        }
    }

    /// Clamp to the nearest valid position of `buf` (line end inclusive).
    pub fn clamp_to<B: TextBuffer + ?Sized>(self, buf: &B) -> Self {
        let line_count = buf.line_count();
        if line_count == 0 {
            return Self::origin();
        }
        let line = self.line.min(line_count - 1);
        let character = self.character.min(buf.line_len(line));
        Self { line, character }
    }
}

fn offset(base: usize, delta: isize) -> usize {
    if delta >= 0 {
        base.saturating_add(delta.unsigned_abs())
    } else {
        base.saturating_sub(delta.unsigned_abs())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

/// A declarative, relative cursor adjustment.
///
/// Diffs are resolved against the buffer *after* a transformation batch has
/// been applied, never while edits are still being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PositionDiff {
    pub line: isize,
    pub character: isize,
}

impl PositionDiff {
    pub const fn new(line: isize, character: isize) -> Self {
        Self { line, character }
    }

    /// Shorthand for a same-line horizontal adjustment.
    pub const fn character(character: isize) -> Self {
        Self { line: 0, character }
    }

    pub fn is_zero(&self) -> bool {
        self.line == 0 && self.character == 0
    }
}

impl Add for PositionDiff {
    type Output = PositionDiff;

    fn add(self, rhs: PositionDiff) -> PositionDiff {
        PositionDiff {
            line: self.line + rhs.line,
            character: self.character + rhs.character,
        }
    }
}

/// An ordered span between two positions (`start <= end`).
///
/// Whether the end is inclusive depends on the consumer; text edits treat it
/// as exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Construct a range, swapping the endpoints if they arrive out of order.
    pub fn new(a: Position, b: Position) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Zero-width range at `pos` (an insertion point).
    pub fn empty(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Half-open containment test.
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos < self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
