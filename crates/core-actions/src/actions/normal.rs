//! Normal-mode commands: mode entry, a handful of motions and deletions, and
//! the `.` repeat trigger.

use crate::action::{Action, ActionContext, ActionError};
use core_state::{Mode, Transformation};
use core_text::{Position, Range, TextBuffer, motion};

const NORMAL: &[Mode] = &[Mode::Normal];
const NORMAL_AND_VISUAL: &[Mode] = &[
    Mode::Normal,
    Mode::Visual,
    Mode::VisualLine,
    Mode::VisualBlock,
];

pub struct EnterReplaceMode;

impl Action for EnterReplaceMode {
    fn name(&self) -> &'static str {
        "enter_replace_mode"
    }

    fn keys(&self) -> &[&'static str] {
        &["R"]
    }

    fn modes(&self) -> &[Mode] {
        NORMAL
    }

    fn can_be_repeated_with_dot(&self) -> bool {
        true
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        ctx.set_mode(Mode::Replace);
        Ok(())
    }
}

/// Where `i`, `a`, `I`, `A` place the cursor before entering Insert.
#[derive(Debug, Clone, Copy)]
enum InsertAt {
    Cursor,
    AfterCursor,
    FirstNonBlank,
    LineEnd,
}

pub struct EnterInsertMode {
    name: &'static str,
    keys: &'static [&'static str],
    at: InsertAt,
}

impl EnterInsertMode {
    pub fn insert() -> Self {
        Self {
            name: "insert",
            keys: &["i", "<Insert>"],
            at: InsertAt::Cursor,
        }
    }

    pub fn append() -> Self {
        Self {
            name: "append",
            keys: &["a"],
            at: InsertAt::AfterCursor,
        }
    }

    pub fn insert_at_line_start() -> Self {
        Self {
            name: "insert_at_line_start",
            keys: &["I"],
            at: InsertAt::FirstNonBlank,
        }
    }

    pub fn append_at_line_end() -> Self {
        Self {
            name: "append_at_line_end",
            keys: &["A"],
            at: InsertAt::LineEnd,
        }
    }
}

impl Action for EnterInsertMode {
    fn name(&self) -> &'static str {
        self.name
    }

    fn keys(&self) -> &[&'static str] {
        self.keys
    }

    fn modes(&self) -> &[Mode] {
        NORMAL
    }

    fn can_be_repeated_with_dot(&self) -> bool {
        true
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        let pos = ctx.position;
        let target = match self.at {
            InsertAt::Cursor => pos,
            InsertAt::AfterCursor => motion::right_n(ctx.buffer, pos, 1, true),
            InsertAt::FirstNonBlank => motion::first_non_blank(ctx.buffer, pos),
            InsertAt::LineEnd => motion::line_end(ctx.buffer, pos),
        };
        ctx.move_cursor(target);
        ctx.set_mode(Mode::Insert);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Motion {
    Left,
    Right,
    LineStart,
    LastChar,
}

pub struct MoveCursor {
    name: &'static str,
    keys: &'static [&'static str],
    motion: Motion,
}

impl MoveCursor {
    pub fn left() -> Self {
        Self {
            name: "move_left",
            keys: &["h", "<Left>"],
            motion: Motion::Left,
        }
    }

    pub fn right() -> Self {
        Self {
            name: "move_right",
            keys: &["l", "<Right>"],
            motion: Motion::Right,
        }
    }

    pub fn line_start() -> Self {
        Self {
            name: "move_line_start",
            keys: &["0", "<Home>"],
            motion: Motion::LineStart,
        }
    }

    pub fn line_end() -> Self {
        Self {
            name: "move_line_end",
            keys: &["$", "<End>"],
            motion: Motion::LastChar,
        }
    }
}

impl Action for MoveCursor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn keys(&self) -> &[&'static str] {
        self.keys
    }

    fn modes(&self) -> &[Mode] {
        NORMAL_AND_VISUAL
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        let pos = ctx.position;
        let count = ctx.count_or_one();
        let target = match self.motion {
            Motion::Left => motion::left_n(pos, count),
            Motion::Right => motion::right_n(ctx.buffer, pos, count, false),
            Motion::LineStart => motion::line_start(pos),
            Motion::LastChar => motion::last_char(ctx.buffer, pos),
        };
        ctx.move_cursor(target);
        Ok(())
    }
}

pub struct DeleteCharUnderCursor;

impl Action for DeleteCharUnderCursor {
    fn name(&self) -> &'static str {
        "delete_char_under_cursor"
    }

    fn keys(&self) -> &[&'static str] {
        &["x", "<Del>"]
    }

    fn modes(&self) -> &[Mode] {
        NORMAL
    }

    fn can_be_repeated_with_dot(&self) -> bool {
        true
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        let pos = ctx.position;
        let len = ctx.buffer.line_len(pos.line);
        if pos.character >= len {
            return Ok(());
        }
        let end = pos.with_character((pos.character + ctx.count_or_one()).min(len));
        ctx.enqueue(Transformation::delete_range(Range::new(pos, end)));
        Ok(())
    }
}

pub struct DeleteLine;

impl Action for DeleteLine {
    fn name(&self) -> &'static str {
        "delete_line"
    }

    fn keys(&self) -> &[&'static str] {
        &["dd"]
    }

    fn modes(&self) -> &[Mode] {
        NORMAL
    }

    fn can_be_repeated_with_dot(&self) -> bool {
        true
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        let line = ctx.position.line;
        let last = ctx.buffer.line_count().saturating_sub(1);
        let end_line = line.saturating_add(ctx.count_or_one() - 1).min(last);
        let (range, cursor) = line_span(ctx.buffer, line, end_line, last);
        ctx.move_cursor(cursor);
        ctx.enqueue(Transformation::delete_range(range));
        Ok(())
    }
}

/// Range covering lines `first..=last_deleted` including one line break, and
/// the cursor the deletion should leave behind.
fn line_span(buf: &dyn TextBuffer, first: usize, last_deleted: usize, last: usize) -> (Range, Position) {
    let end_of = |l: usize| Position::new(l, buf.line_len(l));
    if last_deleted < last {
        let start = Position::new(first, 0);
        (Range::new(start, Position::new(last_deleted + 1, 0)), start)
    } else if first > 0 {
        // Deleting through the end: eat the break before `first` instead.
        (
            Range::new(end_of(first - 1), end_of(last_deleted)),
            Position::new(first - 1, 0),
        )
    } else {
        (
            Range::new(Position::origin(), end_of(last_deleted)),
            Position::origin(),
        )
    }
}

pub struct DeleteToLineEnd;

impl Action for DeleteToLineEnd {
    fn name(&self) -> &'static str {
        "delete_to_line_end"
    }

    fn keys(&self) -> &[&'static str] {
        &["D"]
    }

    fn modes(&self) -> &[Mode] {
        NORMAL
    }

    fn can_be_repeated_with_dot(&self) -> bool {
        true
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        let pos = ctx.position;
        let end = motion::line_end(ctx.buffer, pos);
        if end != pos {
            ctx.enqueue(Transformation::delete_range(Range::new(pos, end)));
        }
        Ok(())
    }
}

/// Mode switch with no other effect (`:`, `/`).
pub struct EnterMode {
    name: &'static str,
    keys: &'static [&'static str],
    target: Mode,
}

impl EnterMode {
    pub fn command_line() -> Self {
        Self {
            name: "enter_command_line",
            keys: &[":"],
            target: Mode::CommandLine,
        }
    }

    pub fn search() -> Self {
        Self {
            name: "enter_search",
            keys: &["/"],
            target: Mode::SearchInProgress,
        }
    }
}

impl Action for EnterMode {
    fn name(&self) -> &'static str {
        self.name
    }

    fn keys(&self) -> &[&'static str] {
        self.keys
    }

    fn modes(&self) -> &[Mode] {
        NORMAL
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        ctx.set_mode(self.target);
        Ok(())
    }
}

pub struct RepeatLastChange;

impl Action for RepeatLastChange {
    fn name(&self) -> &'static str {
        "repeat_last_change"
    }

    fn keys(&self) -> &[&'static str] {
        &["."]
    }

    fn modes(&self) -> &[Mode] {
        NORMAL
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        ctx.request_repeat();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::VimState;
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    fn exec_at(action: &dyn Action, text: &str, pos: Position, count: Option<usize>) -> VimState {
        let b = Buffer::from_str("t", text).unwrap();
        let mut st = VimState::new(pos);
        st.recorded_state.count = count;
        let mut ctx = ActionContext::new(pos, &mut st, &b, &[]);
        action.exec(&mut ctx).unwrap();
        st
    }

    #[test]
    fn append_variants_position_cursor() {
        let st = exec_at(&EnterInsertMode::append(), "abc", Position::new(0, 1), None);
        assert_eq!(st.mode(), Mode::Insert);
        assert_eq!(st.cursor(), Position::new(0, 2));
        let st = exec_at(&EnterInsertMode::append_at_line_end(), "abc", Position::new(0, 0), None);
        assert_eq!(st.cursor(), Position::new(0, 3));
        let st = exec_at(&EnterInsertMode::insert_at_line_start(), "  abc", Position::new(0, 4), None);
        assert_eq!(st.cursor(), Position::new(0, 2));
    }

    #[test]
    fn x_with_count_stops_at_line_end() {
        let st = exec_at(&DeleteCharUnderCursor, "abc", Position::new(0, 1), Some(5));
        let queued: Vec<_> = st.recorded_state.transformer.iter().cloned().collect();
        assert_eq!(
            queued,
            vec![Transformation::delete_range(Range::new(
                Position::new(0, 1),
                Position::new(0, 3)
            ))]
        );
        let st = exec_at(&DeleteCharUnderCursor, "", Position::origin(), None);
        assert!(st.recorded_state.transformer.is_empty());
    }

    #[test]
    fn line_spans_cover_one_break() {
        let b = Buffer::from_str("t", "a\nb\nc").unwrap();
        assert_eq!(
            line_span(&b, 0, 0, 2),
            (
                Range::new(Position::new(0, 0), Position::new(1, 0)),
                Position::new(0, 0)
            )
        );
        assert_eq!(
            line_span(&b, 2, 2, 2),
            (
                Range::new(Position::new(1, 1), Position::new(2, 1)),
                Position::new(1, 0)
            )
        );
        assert_eq!(
            line_span(&b, 0, 2, 2),
            (
                Range::new(Position::new(0, 0), Position::new(2, 1)),
                Position::new(0, 0)
            )
        );
    }

    #[test]
    fn motions_respect_count() {
        let st = exec_at(&MoveCursor::right(), "abcdef", Position::new(0, 0), Some(3));
        assert_eq!(st.cursor(), Position::new(0, 3));
        let st = exec_at(&MoveCursor::left(), "abcdef", Position::new(0, 2), Some(9));
        assert_eq!(st.cursor(), Position::new(0, 0));
        let st = exec_at(&MoveCursor::line_end(), "abcdef", Position::new(0, 2), None);
        assert_eq!(st.cursor(), Position::new(0, 5));
    }
}
