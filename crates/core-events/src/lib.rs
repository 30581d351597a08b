//! Core event types for the modal engine.
//!
//! Hosts deliver keystrokes as discrete [`KeyToken`]s. Tokens are either
//! produced directly by a host adapter or parsed from Vim key notation
//! (`"3Rxy<Esc>"`) via [`parse_key_sequence`].

use std::sync::atomic::AtomicU64;
use std::time::Instant;

mod notation;

pub use notation::{KeyParseError, parse_key, parse_key_sequence};

// -------------------------------------------------------------------------------------------------
// Channel Policy
// -------------------------------------------------------------------------------------------------
// The session loop consumes a bounded mpsc channel sized by `EVENT_CHANNEL_CAP`. Producers await
// capacity rather than dropping keys: losing a keystroke would desynchronize the pending key
// sequence from what the user typed.
// -------------------------------------------------------------------------------------------------
pub const EVENT_CHANNEL_CAP: usize = 8192;

// Simple atomic counters (relaxed fetch_add). Inspected by tests and the binary's exit summary.
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static KEYPRESS_TOTAL: AtomicU64 = AtomicU64::new(0); // total keypress events consumed
pub static KEYPRESS_REPEAT: AtomicU64 = AtomicU64::new(0); // keypress events flagged as repeat

/// Top-level event enum consumed by a session loop.
#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    Shutdown,
}

/// Normalized input events.
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// Logical key press with timestamp and repeat flag.
    ///
    /// Invariants:
    /// * `KeyEventExt::timestamp` must be monotonic per producer.
    /// * `KeyEventExt::repeat` is `true` only for host auto-repeat events.
    KeyPress(KeyEventExt),
}

/// Rich keypress metadata.
///
/// Constructors ensure timestamps are monotonically increasing when called in
/// event order, but callers may also provide explicit instants (useful for
/// tests or replay paths).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyEventExt {
    pub token: KeyToken,
    pub repeat: bool,
    pub timestamp: Instant,
}

impl KeyEventExt {
    /// Create a `KeyEventExt` using the current instant and `repeat = false`.
    pub fn new(token: KeyToken) -> Self {
        Self::from_parts(token, false, Instant::now())
    }

    /// Create a `KeyEventExt` using the current instant and explicit repeat bit.
    pub fn with_repeat(token: KeyToken, repeat: bool) -> Self {
        Self::from_parts(token, repeat, Instant::now())
    }

    /// Create a `KeyEventExt` with caller supplied timestamp (primarily for tests).
    pub fn from_parts(token: KeyToken, repeat: bool, timestamp: Instant) -> Self {
        Self {
            token,
            repeat,
            timestamp,
        }
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ModMask: u16 { const CTRL=1; const ALT=2; const SHIFT=4; const META=8; const SUPER=16; }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Enter,
    Esc,
    Backspace,
    Tab,
    F(u8),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
}

/// Canonical logical key tokens.
///
/// `KeyToken::Chord` wraps a base token plus modifier mask, so `<C-c>` and a
/// plain `c` never compare equal. Space is `Char(' ')`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Char(char),
    Named(NamedKey),
    Chord { base: Box<KeyToken>, mods: ModMask },
}

impl KeyToken {
    pub fn ctrl(c: char) -> Self {
        KeyToken::Chord {
            base: Box::new(KeyToken::Char(c)),
            mods: ModMask::CTRL,
        }
    }

    pub const fn named(key: NamedKey) -> Self {
        KeyToken::Named(key)
    }

    /// The character this key inserts when typed as text, if any.
    ///
    /// Printable characters map to themselves; `<CR>` yields `'\n'` and
    /// `<Tab>` yields `'\t'`. Chords and other named keys insert nothing.
    pub fn typed_char(&self) -> Option<char> {
        match self {
            KeyToken::Char(c) if !c.is_control() => Some(*c),
            KeyToken::Named(NamedKey::Enter) => Some('\n'),
            KeyToken::Named(NamedKey::Tab) => Some('\t'),
            _ => None,
        }
    }

    /// ASCII digit value for plain digit keys (count prefixes).
    pub fn digit(&self) -> Option<u32> {
        match self {
            KeyToken::Char(c) => c.to_digit(10),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn key_event_ext_new_defaults() {
        let token = KeyToken::Char('a');
        let evt = KeyEventExt::new(token.clone());
        assert_eq!(evt.token, token);
        assert!(!evt.repeat, "new() must default repeat to false");
        assert!(evt.timestamp <= Instant::now());
    }

    #[test]
    fn key_event_ext_with_repeat_and_from_parts() {
        let token = KeyToken::Named(NamedKey::Enter);
        let ts = Instant::now();
        let evt = KeyEventExt::from_parts(token.clone(), true, ts);
        assert_eq!(evt.token, token);
        assert!(evt.repeat);
        assert_eq!(evt.timestamp, ts);

        let repeat_evt = KeyEventExt::with_repeat(token.clone(), false);
        assert_eq!(repeat_evt.token, token);
        assert!(!repeat_evt.repeat);
        assert!(repeat_evt.timestamp >= ts);
    }

    #[test]
    fn typed_char_covers_text_keys_only() {
        assert_eq!(KeyToken::Char('x').typed_char(), Some('x'));
        assert_eq!(KeyToken::Char(' ').typed_char(), Some(' '));
        assert_eq!(KeyToken::named(NamedKey::Enter).typed_char(), Some('\n'));
        assert_eq!(KeyToken::named(NamedKey::Tab).typed_char(), Some('\t'));
        assert_eq!(KeyToken::named(NamedKey::Esc).typed_char(), None);
        assert_eq!(KeyToken::ctrl('c').typed_char(), None);
        assert_eq!(KeyToken::Char('\u{7}').typed_char(), None);
    }

    #[test]
    fn chord_is_distinct_from_base() {
        assert_ne!(KeyToken::ctrl('c'), KeyToken::Char('c'));
        match KeyToken::ctrl('[') {
            KeyToken::Chord { base, mods } => {
                assert_eq!(*base, KeyToken::Char('['));
                assert_eq!(mods, ModMask::CTRL);
            }
            other => panic!("expected chord token, got {:?}", other),
        }
    }

    #[test]
    fn digit_only_for_plain_chars() {
        assert_eq!(KeyToken::Char('7').digit(), Some(7));
        assert_eq!(KeyToken::Char('x').digit(), None);
        assert_eq!(KeyToken::named(NamedKey::F(1)).digit(), None);
    }
}
