//! Replace mode (`R`): overwrite characters, restore them on backspace, and
//! multiply the typed text on exit when a count was given.

use crate::action::{Action, ActionContext, ActionError};
use core_state::{Mode, Transformation};
use core_text::{PositionDiff, Range};
use tracing::trace;

const REPLACE: &[Mode] = &[Mode::Replace];

pub struct ExitReplaceMode;

impl Action for ExitReplaceMode {
    fn name(&self) -> &'static str {
        "exit_replace_mode"
    }

    fn keys(&self) -> &[&'static str] {
        &["<Esc>", "<C-c>", "<C-[>"]
    }

    fn modes(&self) -> &[Mode] {
        REPLACE
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        let position = ctx.position;
        let rs = ctx.state.replace_state_mut()?;
        let times = rs.times_to_repeat();
        let typed = rs.typed_text();
        if times > 1 && !typed.is_empty() {
            trace!(target: "state.replace", times, typed = typed.len(), "repeat_on_exit");
            ctx.enqueue(
                Transformation::insert(position, typed.repeat(times - 1))
                    .with_diff(PositionDiff::character(-1)),
            );
        } else {
            ctx.move_cursor(position.left());
        }
        ctx.set_mode(Mode::Normal);
        Ok(())
    }
}

pub struct ReplaceModeToInsertMode;

impl Action for ReplaceModeToInsertMode {
    fn name(&self) -> &'static str {
        "replace_mode_to_insert_mode"
    }

    fn keys(&self) -> &[&'static str] {
        &["<Insert>"]
    }

    fn modes(&self) -> &[Mode] {
        REPLACE
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        ctx.set_mode(Mode::Insert);
        Ok(())
    }
}

pub struct BackspaceInReplaceMode;

impl Action for BackspaceInReplaceMode {
    fn name(&self) -> &'static str {
        "backspace_in_replace_mode"
    }

    fn keys(&self) -> &[&'static str] {
        &["<BS>", "<C-h>"]
    }

    fn modes(&self) -> &[Mode] {
        REPLACE
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        let position = ctx.position;
        let rs = ctx.state.replace_state_mut()?;
        let start = rs.start_position();
        rs.pop_char();

        if position.is_before_or_equal(&start) {
            // Nothing typed before the origin; walk left and move the origin along.
            let left = position.left();
            rs.rebase_start(left);
            ctx.move_cursor(left);
        } else if position.line > start.line || position.character > rs.original_chars().len() {
            // Typed past the original text: remove instead of restoring.
            ctx.enqueue(Transformation::DeleteText {
                position,
                diff: None,
            });
        } else {
            let left = position.left();
            let restored = rs.original_char(left.character);
            match restored {
                Some(c) => ctx.enqueue(
                    Transformation::replace(Range::new(left, position), c)
                        .with_diff(PositionDiff::character(-1)),
                ),
                None => ctx.enqueue(Transformation::DeleteText {
                    position,
                    diff: None,
                }),
            }
        }
        Ok(())
    }
}

pub struct ReplaceInReplaceMode;

impl Action for ReplaceInReplaceMode {
    fn name(&self) -> &'static str {
        "replace_in_replace_mode"
    }

    fn keys(&self) -> &[&'static str] {
        &["<character>"]
    }

    fn modes(&self) -> &[Mode] {
        REPLACE
    }

    fn can_be_repeated_with_dot(&self) -> bool {
        true
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        let c = ctx.typed_char().ok_or(ActionError::MissingCharacter {
            action: self.name(),
        })?;
        let position = ctx.position;
        let at_line_end = position.is_line_end(ctx.buffer);
        let right = position.right(ctx.buffer);
        ctx.state.replace_state_mut()?.push_char(c);

        if !at_line_end && c != '\n' {
            ctx.enqueue(
                Transformation::replace(Range::new(position, right), c)
                    .with_diff(PositionDiff::character(1)),
            );
        } else {
            ctx.enqueue(Transformation::insert(position, c));
        }
        Ok(())
    }
}
