//! Session state threaded through every action execution.
//!
//! One `VimState` exists per editing session. The engine owns it and lends
//! `&mut` access to exactly one action at a time, so nothing in here locks.
//!
//! Mode sub-state:
//! - `ReplaceState` exists if and only if the mode is `Replace`. Both halves
//!   change together inside `VimState::set_mode`; there is no other way to
//!   switch modes.
//! - Actions that need a sub-state ask for it through the `*_mut` accessors,
//!   which return `StateError` instead of fabricating an empty one.
//!
//! Pending edits live in `RecordedState::transformer` until the engine commits
//! them (see `core-actions::pipeline`).

use core_events::KeyToken;
use core_text::{Position, TextBuffer};
use std::fmt;
use thiserror::Error;
use tracing::debug;

mod repeat;
mod replace;
mod transform;

pub use repeat::{DotRepeatRecorder, RecordedChange};
pub use replace::ReplaceState;
pub use transform::{Transformation, Transformer};

/// Upper bound for an accumulated count prefix.
pub const COUNT_MAX: usize = 999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Normal,
    Insert,
    Replace,
    Visual,
    VisualLine,
    VisualBlock,
    CommandLine,
    SearchInProgress,
}

impl Mode {
    pub const ALL: [Mode; 8] = [
        Mode::Normal,
        Mode::Insert,
        Mode::Replace,
        Mode::Visual,
        Mode::VisualLine,
        Mode::VisualBlock,
        Mode::CommandLine,
        Mode::SearchInProgress,
    ];

    pub fn is_visual(self) -> bool {
        matches!(self, Mode::Visual | Mode::VisualLine | Mode::VisualBlock)
    }

    /// Modes whose cursor sits on a character rather than between characters.
    pub fn has_block_cursor(self) -> bool {
        self == Mode::Normal || self.is_visual()
    }

    /// Modes in which digits build a count prefix.
    pub fn accepts_count(self) -> bool {
        self == Mode::Normal || self.is_visual()
    }

    /// Status line text, empty for Normal.
    pub fn status_label(self) -> &'static str {
        match self {
            Mode::Normal => "",
            Mode::Insert => "-- INSERT --",
            Mode::Replace => "-- REPLACE --",
            Mode::Visual => "-- VISUAL --",
            Mode::VisualLine => "-- VISUAL LINE --",
            Mode::VisualBlock => "-- VISUAL BLOCK --",
            Mode::CommandLine => ":",
            Mode::SearchInProgress => "/",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Normal => "Normal",
            Mode::Insert => "Insert",
            Mode::Replace => "Replace",
            Mode::Visual => "Visual",
            Mode::VisualLine => "VisualLine",
            Mode::VisualBlock => "VisualBlock",
            Mode::CommandLine => "CommandLine",
            Mode::SearchInProgress => "SearchInProgress",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("replace state is missing while in {mode} mode")]
    MissingReplaceState { mode: Mode },
}

/// Per-action scratch state, cleared by the engine after every dispatch.
#[derive(Debug, Default)]
pub struct RecordedState {
    /// Count prefix typed before the action, if any.
    pub count: Option<usize>,
    /// Keys that resolved to the action being executed.
    pub action_keys: Vec<KeyToken>,
    /// Transformations queued by the action being executed.
    pub transformer: Transformer,
}

impl RecordedState {
    /// Append a digit to the count prefix, saturating at `COUNT_MAX`.
    pub fn push_count_digit(&mut self, digit: u32) -> usize {
        let next = self
            .count
            .unwrap_or(0)
            .saturating_mul(10)
            .saturating_add(digit as usize)
            .min(COUNT_MAX);
        self.count = Some(next);
        next
    }

    /// Count with the implicit default of one.
    pub fn count_or_one(&self) -> usize {
        self.count.unwrap_or(1).max(1)
    }

    pub fn reset(&mut self) {
        self.count = None;
        self.action_keys.clear();
        self.transformer.clear();
    }
}

#[derive(Debug)]
pub struct VimState {
    mode: Mode,
    /// Anchor of the selection (equal to `cursor_stop` outside Visual modes).
    pub cursor_start: Position,
    /// The cursor proper.
    pub cursor_stop: Position,
    replace_state: Option<ReplaceState>,
    pub recorded_state: RecordedState,
    pub dot_repeat: DotRepeatRecorder,
}

impl Default for VimState {
    fn default() -> Self {
        Self::new(Position::origin())
    }
}

impl VimState {
    pub fn new(cursor: Position) -> Self {
        Self {
            mode: Mode::Normal,
            cursor_start: cursor,
            cursor_stop: cursor,
            replace_state: None,
            recorded_state: RecordedState::default(),
            dot_repeat: DotRepeatRecorder::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cursor(&self) -> Position {
        self.cursor_stop
    }

    /// Move the cursor and collapse the selection onto it.
    pub fn set_cursor(&mut self, pos: Position) {
        self.cursor_start = pos;
        self.cursor_stop = pos;
    }

    /// The single mode transition point.
    ///
    /// Entering Replace captures the cursor line as the original text and the
    /// pending count as the repeat count. Leaving Replace drops that state.
    /// Setting the current mode again is a no-op.
    pub fn set_mode<B: TextBuffer + ?Sized>(&mut self, mode: Mode, buf: &B) {
        if mode == self.mode {
            return;
        }
        let from = self.mode;
        if from == Mode::Replace {
            self.replace_state = None;
        }
        if mode == Mode::Replace {
            let start = self.cursor_stop;
            let original: Vec<char> = buf
                .line_text(start.line)
                .unwrap_or_default()
                .chars()
                .collect();
            self.replace_state = Some(ReplaceState::new(
                start,
                original,
                self.recorded_state.count_or_one(),
            ));
        }
        if !mode.is_visual() {
            self.cursor_start = self.cursor_stop;
        }
        self.mode = mode;
        debug!(target: "state.mode", from = %from, to = %mode, "mode_set");
    }

    pub fn replace_state(&self) -> Option<&ReplaceState> {
        self.replace_state.as_ref()
    }

    pub fn replace_state_mut(&mut self) -> Result<&mut ReplaceState, StateError> {
        let mode = self.mode;
        self.replace_state
            .as_mut()
            .ok_or(StateError::MissingReplaceState { mode })
    }
}
