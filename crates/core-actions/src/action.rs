//! The unit of behavior the registry dispatches to.

use core_events::KeyToken;
use core_state::{Mode, StateError, Transformation, VimState};
use core_text::{Position, TextBuffer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("{action} needs a typed character but the keys pressed carry none")]
    MissingCharacter { action: &'static str },
}

/// A registered command.
///
/// Key patterns use Vim notation (`"dd"`, `"<Esc>"`, `"<C-[>"`) with
/// `<character>` standing for any one typed character. Patterns are parsed
/// once when the registry is built.
pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;

    /// Alternative key patterns, any of which triggers the action.
    fn keys(&self) -> &[&'static str];

    fn modes(&self) -> &[Mode];

    /// Whether the change this action starts is replayed by `.`.
    fn can_be_repeated_with_dot(&self) -> bool {
        false
    }

    /// Mutate `ctx.state` and/or queue transformations. Must not touch the
    /// buffer; the engine commits the queued batch after this returns.
    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError>;
}

/// Everything an action may read or mutate during one execution.
pub struct ActionContext<'a> {
    /// Cursor at the moment the action fired.
    pub position: Position,
    pub state: &'a mut VimState,
    pub buffer: &'a dyn TextBuffer,
    /// Keys that resolved to this action.
    pub keys_pressed: &'a [KeyToken],
    repeat_requested: bool,
}

impl<'a> ActionContext<'a> {
    pub fn new(
        position: Position,
        state: &'a mut VimState,
        buffer: &'a dyn TextBuffer,
        keys_pressed: &'a [KeyToken],
    ) -> Self {
        Self {
            position,
            state,
            buffer,
            keys_pressed,
            repeat_requested: false,
        }
    }

    pub fn count(&self) -> Option<usize> {
        self.state.recorded_state.count
    }

    pub fn count_or_one(&self) -> usize {
        self.state.recorded_state.count_or_one()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.state.set_mode(mode, self.buffer);
    }

    pub fn move_cursor(&mut self, pos: Position) {
        self.state.cursor_stop = pos;
    }

    pub fn enqueue(&mut self, t: Transformation) {
        self.state.recorded_state.transformer.add_transformation(t);
    }

    /// Character typed by the last key of the match (`<character>` slots).
    pub fn typed_char(&self) -> Option<char> {
        self.keys_pressed.last().and_then(KeyToken::typed_char)
    }

    /// Ask the engine to replay the last recorded change after this action.
    pub fn request_repeat(&mut self) {
        self.repeat_requested = true;
    }

    pub fn repeat_requested(&self) -> bool {
        self.repeat_requested
    }
}
