use core_text::Position;
use tracing::trace;

/// Bookkeeping for an active Replace-mode session.
///
/// `new_chars` is a stack: typing pushes, backspace pops. Popping an empty
/// stack does nothing, so the stack can never hold fewer entries than zero or
/// more than the number of keys typed since Replace was entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceState {
    start_position: Position,
    original_chars: Vec<char>,
    new_chars: Vec<char>,
    times_to_repeat: usize,
}

impl ReplaceState {
    pub fn new(start_position: Position, original_chars: Vec<char>, times_to_repeat: usize) -> Self {
        Self {
            start_position,
            original_chars,
            new_chars: Vec::new(),
            times_to_repeat: times_to_repeat.max(1),
        }
    }

    /// Where Replace began (moved back by backspacing past it).
    pub fn start_position(&self) -> Position {
        self.start_position
    }

    pub fn rebase_start(&mut self, pos: Position) {
        trace!(target: "state.replace", from = %self.start_position, to = %pos, "rebase_start");
        self.start_position = pos;
    }

    /// Characters of the line as it was when Replace began.
    pub fn original_chars(&self) -> &[char] {
        &self.original_chars
    }

    pub fn original_char(&self, index: usize) -> Option<char> {
        self.original_chars.get(index).copied()
    }

    pub fn new_chars(&self) -> &[char] {
        &self.new_chars
    }

    pub fn push_char(&mut self, c: char) {
        self.new_chars.push(c);
        trace!(target: "state.replace", ch = %c.escape_debug(), depth = self.new_chars.len(), "push");
    }

    pub fn pop_char(&mut self) -> Option<char> {
        let popped = self.new_chars.pop();
        trace!(target: "state.replace", popped = popped.is_some(), depth = self.new_chars.len(), "pop");
        popped
    }

    pub fn times_to_repeat(&self) -> usize {
        self.times_to_repeat
    }

    /// Everything typed so far, in order.
    pub fn typed_text(&self) -> String {
        self.new_chars.iter().collect()
    }
}
