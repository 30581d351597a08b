//! Vim key notation: `x`, `<Esc>`, `<C-c>`, `<C-[>`, `<BS>`, `<lt>`.

use std::fmt;

use thiserror::Error;

use crate::{KeyToken, ModMask, NamedKey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("empty key notation")]
    Empty,
    #[error("unknown key name <{0}>")]
    UnknownKey(String),
    #[error("expected exactly one key in {0:?}")]
    NotSingleKey(String),
}

/// Parse one key in notation form (`"a"`, `"<Esc>"`, `"<C-h>"`).
pub fn parse_key(input: &str) -> Result<KeyToken, KeyParseError> {
    let mut keys = parse_key_sequence(input)?;
    if keys.len() != 1 {
        return Err(KeyParseError::NotSingleKey(input.to_string()));
    }
    keys.pop().ok_or(KeyParseError::Empty)
}

/// Parse a whole key sequence. A `<` that is not closed by `>` is taken
/// literally, as Vim does; a closed but unknown `<name>` is an error.
pub fn parse_key_sequence(input: &str) -> Result<Vec<KeyToken>, KeyParseError> {
    if input.is_empty() {
        return Err(KeyParseError::Empty);
    }
    let mut out = Vec::new();
    let mut rest = input;
    while let Some(c) = rest.chars().next() {
        if c == '<'
            && let Some(close) = rest[1..].find('>')
            && close > 0
        {
            let inner = &rest[1..1 + close];
            out.push(parse_bracketed(inner)?);
            rest = &rest[close + 2..];
            continue;
        }
        out.push(KeyToken::Char(c));
        rest = &rest[c.len_utf8()..];
    }
    Ok(out)
}

fn parse_bracketed(inner: &str) -> Result<KeyToken, KeyParseError> {
    let mut mods = ModMask::empty();
    let mut name = inner;
    // Modifier prefixes: `C-`, `A-`/`M-`, `S-`, `D-`. A trailing `-` is a key (`<C-->`).
    loop {
        let mut chars = name.chars();
        let (Some(m), Some('-')) = (chars.next(), chars.next()) else {
            break;
        };
        if name.len() <= 2 {
            break;
        }
        let bit = match m.to_ascii_uppercase() {
            'C' => ModMask::CTRL,
            'A' | 'M' => ModMask::ALT,
            'S' => ModMask::SHIFT,
            'D' => ModMask::SUPER,
            _ => break,
        };
        mods |= bit;
        name = &name[2..];
    }
    let base = base_key(name, !mods.is_empty())
        .ok_or_else(|| KeyParseError::UnknownKey(inner.to_string()))?;
    if mods.is_empty() {
        return Ok(base);
    }
    Ok(KeyToken::Chord {
        base: Box::new(base),
        mods,
    })
}

fn base_key(name: &str, has_mods: bool) -> Option<KeyToken> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        // `<x>` alone is not valid notation; `<C-x>` is. Ctrl chords are case-insensitive.
        if !has_mods {
            return None;
        }
        return Some(KeyToken::Char(c.to_ascii_lowercase()));
    }
    let lower = name.to_ascii_lowercase();
    let key = match lower.as_str() {
        "esc" => KeyToken::Named(NamedKey::Esc),
        "cr" | "enter" | "return" => KeyToken::Named(NamedKey::Enter),
        "bs" | "backspace" => KeyToken::Named(NamedKey::Backspace),
        "tab" => KeyToken::Named(NamedKey::Tab),
        "space" => KeyToken::Char(' '),
        "insert" => KeyToken::Named(NamedKey::Insert),
        "del" | "delete" => KeyToken::Named(NamedKey::Delete),
        "up" => KeyToken::Named(NamedKey::Up),
        "down" => KeyToken::Named(NamedKey::Down),
        "left" => KeyToken::Named(NamedKey::Left),
        "right" => KeyToken::Named(NamedKey::Right),
        "home" => KeyToken::Named(NamedKey::Home),
        "end" => KeyToken::Named(NamedKey::End),
        "pageup" => KeyToken::Named(NamedKey::PageUp),
        "pagedown" => KeyToken::Named(NamedKey::PageDown),
        "lt" => KeyToken::Char('<'),
        "bar" => KeyToken::Char('|'),
        "bslash" => KeyToken::Char('\\'),
        f if f.starts_with('f') => {
            let n: u8 = f[1..].parse().ok()?;
            if !(1..=12).contains(&n) {
                return None;
            }
            KeyToken::Named(NamedKey::F(n))
        }
        _ => return None,
    };
    Some(key)
}

fn named_str(key: NamedKey) -> String {
    match key {
        NamedKey::Enter => "CR".into(),
        NamedKey::Esc => "Esc".into(),
        NamedKey::Backspace => "BS".into(),
        NamedKey::Tab => "Tab".into(),
        NamedKey::F(n) => format!("F{n}"),
        NamedKey::Up => "Up".into(),
        NamedKey::Down => "Down".into(),
        NamedKey::Left => "Left".into(),
        NamedKey::Right => "Right".into(),
        NamedKey::Home => "Home".into(),
        NamedKey::End => "End".into(),
        NamedKey::PageUp => "PageUp".into(),
        NamedKey::PageDown => "PageDown".into(),
        NamedKey::Insert => "Insert".into(),
        NamedKey::Delete => "Del".into(),
    }
}

fn inner_str(token: &KeyToken) -> String {
    match token {
        KeyToken::Char('<') => "lt".into(),
        KeyToken::Char(' ') => "Space".into(),
        KeyToken::Char(c) => c.to_string(),
        KeyToken::Named(n) => named_str(*n),
        KeyToken::Chord { base, .. } => inner_str(base),
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyToken::Char('<') | KeyToken::Char(' ') | KeyToken::Named(_) => {
                write!(f, "<{}>", inner_str(self))
            }
            KeyToken::Char(c) => write!(f, "{c}"),
            KeyToken::Chord { base, mods } => {
                f.write_str("<")?;
                for (bit, prefix) in [
                    (ModMask::CTRL, "C-"),
                    (ModMask::ALT, "A-"),
                    (ModMask::SHIFT, "S-"),
                    (ModMask::META, "M-"),
                    (ModMask::SUPER, "D-"),
                ] {
                    if mods.contains(bit) {
                        f.write_str(prefix)?;
                    }
                }
                write!(f, "{}>", inner_str(base))
            }
        }
    }
}
