//! Cursor motion helpers.
//!
//! These operate purely on a `TextBuffer` + `Position` pair and are free of
//! editor state. Each helper returns a new position.

use crate::{Position, TextBuffer};

/// Normalize a position for Vim Normal-mode semantics: a cursor resting past
/// the last character of a non-empty line is pulled back onto that character
/// (block cursor behavior). Empty lines and in-range positions are unchanged.
pub fn normalize_normal_mode_position<B: TextBuffer + ?Sized>(buf: &B, pos: Position) -> Position {
    let pos = pos.clamp_to(buf);
    let len = buf.line_len(pos.line);
    if len > 0 && pos.character >= len {
        return pos.with_character(len - 1);
    }
    pos
}

pub fn line_start(pos: Position) -> Position {
    pos.with_character(0)
}

/// Position just past the last character (the insertion point at EOL).
pub fn line_end<B: TextBuffer + ?Sized>(buf: &B, pos: Position) -> Position {
    pos.with_character(buf.line_len(pos.line))
}

/// Position of the last character, or column 0 for an empty line.
pub fn last_char<B: TextBuffer + ?Sized>(buf: &B, pos: Position) -> Position {
    pos.with_character(buf.line_len(pos.line).saturating_sub(1))
}

/// First non-whitespace character of the line (line end when all blank).
pub fn first_non_blank<B: TextBuffer + ?Sized>(buf: &B, pos: Position) -> Position {
    let text = buf.line_text(pos.line).unwrap_or_default();
    let col = text
        .chars()
        .position(|c| !c.is_whitespace())
        .unwrap_or_else(|| text.chars().count());
    pos.with_character(col)
}

/// Move right `count` characters without leaving the line. In Normal mode
/// the last reachable column is the last character, otherwise line end.
pub fn right_n<B: TextBuffer + ?Sized>(
    buf: &B,
    pos: Position,
    count: usize,
    allow_line_end: bool,
) -> Position {
    let len = buf.line_len(pos.line);
    let max = if allow_line_end {
        len
    } else {
        len.saturating_sub(1)
    };
    pos.with_character(pos.character.saturating_add(count).min(max))
}

pub fn left_n(pos: Position, count: usize) -> Position {
    pos.with_character(pos.character.saturating_sub(count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Buffer;

    #[test]
    fn normalize_pulls_back_from_eol() {
        let b = Buffer::from_str("t", "abc\n\nxy").unwrap();
        assert_eq!(
            normalize_normal_mode_position(&b, Position::new(0, 3)),
            Position::new(0, 2)
        );
        assert_eq!(
            normalize_normal_mode_position(&b, Position::new(1, 0)),
            Position::new(1, 0)
        );
        assert_eq!(
            normalize_normal_mode_position(&b, Position::new(9, 9)),
            Position::new(2, 1)
        );
    }

    #[test]
    fn line_boundaries() {
        let b = Buffer::from_str("t", "  hi").unwrap();
        let p = Position::new(0, 3);
        assert_eq!(line_start(p), Position::new(0, 0));
        assert_eq!(line_end(&b, p), Position::new(0, 4));
        assert_eq!(last_char(&b, p), Position::new(0, 3));
        assert_eq!(first_non_blank(&b, p), Position::new(0, 2));
    }

    #[test]
    fn horizontal_counts_clamp() {
        let b = Buffer::from_str("t", "abcd").unwrap();
        let p = Position::new(0, 1);
        assert_eq!(right_n(&b, p, 10, false), Position::new(0, 3));
        assert_eq!(right_n(&b, p, 10, true), Position::new(0, 4));
        assert_eq!(left_n(p, 5), Position::new(0, 0));
    }
}
