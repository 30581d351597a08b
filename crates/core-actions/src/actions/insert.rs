use crate::action::{Action, ActionContext, ActionError};
use core_state::{Mode, Transformation};
use core_text::Position;

const INSERT: &[Mode] = &[Mode::Insert];

pub struct InsertCharacter;

impl Action for InsertCharacter {
    fn name(&self) -> &'static str {
        "insert_character"
    }

    fn keys(&self) -> &[&'static str] {
        &["<character>"]
    }

    fn modes(&self) -> &[Mode] {
        INSERT
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        let c = ctx.typed_char().ok_or(ActionError::MissingCharacter {
            action: self.name(),
        })?;
        ctx.enqueue(Transformation::insert(ctx.position, c));
        Ok(())
    }
}

pub struct BackspaceInInsertMode;

impl Action for BackspaceInInsertMode {
    fn name(&self) -> &'static str {
        "backspace_in_insert_mode"
    }

    fn keys(&self) -> &[&'static str] {
        &["<BS>", "<C-h>"]
    }

    fn modes(&self) -> &[Mode] {
        INSERT
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        // Start of buffer: nothing to delete.
        if ctx.position != Position::origin() {
            ctx.enqueue(Transformation::DeleteText {
                position: ctx.position,
                diff: None,
            });
        }
        Ok(())
    }
}

pub struct ExitInsertMode;

impl Action for ExitInsertMode {
    fn name(&self) -> &'static str {
        "exit_insert_mode"
    }

    fn keys(&self) -> &[&'static str] {
        &["<Esc>", "<C-c>", "<C-[>"]
    }

    fn modes(&self) -> &[Mode] {
        INSERT
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        ctx.move_cursor(ctx.position.left());
        ctx.set_mode(Mode::Normal);
        Ok(())
    }
}

pub struct InsertModeToReplaceMode;

impl Action for InsertModeToReplaceMode {
    fn name(&self) -> &'static str {
        "insert_mode_to_replace_mode"
    }

    fn keys(&self) -> &[&'static str] {
        &["<Insert>"]
    }

    fn modes(&self) -> &[Mode] {
        INSERT
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        ctx.set_mode(Mode::Replace);
        Ok(())
    }
}
