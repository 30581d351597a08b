//! Built-in action catalog.
//!
//! The Replace-mode set is complete; the rest is a small working subset that
//! exercises every path through the engine (counts, multi-key patterns,
//! wildcards, mode changes, dot-repeat).

use crate::action::Action;

pub mod insert;
pub mod modes;
pub mod normal;
pub mod replace;

/// The registration table, in registration order.
pub fn builtin_actions() -> Vec<Box<dyn Action>> {
    vec![
        // Replace
        Box::new(replace::ExitReplaceMode),
        Box::new(replace::ReplaceModeToInsertMode),
        Box::new(replace::BackspaceInReplaceMode),
        Box::new(replace::ReplaceInReplaceMode),
        // Insert
        Box::new(insert::InsertCharacter),
        Box::new(insert::BackspaceInInsertMode),
        Box::new(insert::ExitInsertMode),
        Box::new(insert::InsertModeToReplaceMode),
        // Normal
        Box::new(normal::EnterReplaceMode),
        Box::new(normal::EnterInsertMode::insert()),
        Box::new(normal::EnterInsertMode::append()),
        Box::new(normal::EnterInsertMode::insert_at_line_start()),
        Box::new(normal::EnterInsertMode::append_at_line_end()),
        Box::new(normal::MoveCursor::left()),
        Box::new(normal::MoveCursor::right()),
        Box::new(normal::MoveCursor::line_start()),
        Box::new(normal::MoveCursor::line_end()),
        Box::new(normal::DeleteCharUnderCursor),
        Box::new(normal::DeleteLine),
        Box::new(normal::DeleteToLineEnd),
        Box::new(normal::EnterMode::command_line()),
        Box::new(normal::EnterMode::search()),
        Box::new(normal::RepeatLastChange),
        // Visual, command line, search
        Box::new(modes::ToggleVisual::charwise()),
        Box::new(modes::ToggleVisual::linewise()),
        Box::new(modes::ToggleVisual::blockwise()),
        Box::new(modes::EscapeToNormal),
    ]
}
