//! core-keymap: key-sequence mapping engine.
//!
//! Design principles:
//! - Pure and deterministic: resolution depends only on the key buffer and the
//!   compiled trie, never on registration order for non-overlapping patterns.
//! - Keymaps are compiled into a compressed trie for cache locality; callers
//!   keep one trie per mode.
//! - Ambiguity is surfaced, not decided: a complete mapping that is also the
//!   prefix of a longer one is reported with `ambiguous: true` and the caller
//!   applies its own bounded-wait policy.
//! - No side effects: logging only at TRACE for traversal steps.

use core_events::{KeyParseError, KeyToken, parse_key_sequence};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::trace;

/// Notation for the single-character wildcard inside a pattern.
pub const ANY_CHAR_NOTATION: &str = "<character>";

// -------------------------------------------------------------------------------------------------
// Key Token Pattern
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyTokenPattern {
    /// Exactly this key.
    Key(KeyToken),
    /// Any key that types a character (see `KeyToken::typed_char`).
    AnyChar,
}

impl KeyTokenPattern {
    pub fn matches(&self, key: &KeyToken) -> bool {
        match self {
            KeyTokenPattern::Key(k) => k == key,
            KeyTokenPattern::AnyChar => key.typed_char().is_some(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, KeyTokenPattern::AnyChar)
    }
}

pub type KeySequence = SmallVec<[KeyTokenPattern; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("key pattern is empty")]
    Empty,
    #[error(transparent)]
    Key(#[from] KeyParseError),
}

/// Parse a pattern such as `"<Esc>"`, `"dd"`, or `"r<character>"`.
pub fn parse_pattern(notation: &str) -> Result<KeySequence, PatternError> {
    let mut out = KeySequence::new();
    let mut rest = notation;
    while !rest.is_empty() {
        let lower = rest.to_ascii_lowercase();
        match lower.find(ANY_CHAR_NOTATION) {
            Some(0) => {
                out.push(KeyTokenPattern::AnyChar);
                rest = &rest[ANY_CHAR_NOTATION.len()..];
            }
            Some(idx) => {
                push_literal(&mut out, &rest[..idx])?;
                rest = &rest[idx..];
            }
            None => {
                push_literal(&mut out, rest)?;
                rest = "";
            }
        }
    }
    if out.is_empty() {
        return Err(PatternError::Empty);
    }
    Ok(out)
}

fn push_literal(out: &mut KeySequence, notation: &str) -> Result<(), PatternError> {
    for key in parse_key_sequence(notation)? {
        out.push(KeyTokenPattern::Key(key));
    }
    Ok(())
}

// -------------------------------------------------------------------------------------------------
// Mapping Specification
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct MappingSpec<T> {
    pub sequence: KeySequence,
    pub output: T,
}

// -------------------------------------------------------------------------------------------------
// Trie Representation
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone)]
struct Edge {
    pat: KeyTokenPattern,
    next: usize,
}

#[derive(Debug, Clone)]
struct Node {
    terminal: Option<usize>, // index into mappings vec
    edges: SmallVec<[Edge; 4]>,
}

impl Node {
    fn new() -> Self {
        Self {
            terminal: None,
            edges: SmallVec::new(),
        }
    }
}

#[derive(Debug)]
pub struct MappingTrie<T> {
    nodes: Vec<Node>,
    mappings: Vec<MappingSpec<T>>,
    wildcards: Vec<usize>, // wildcard count per mapping (specificity)
}

struct Walk {
    /// (keys consumed, mapping index) of the deepest terminal reached.
    last_terminal: Option<(usize, usize)>,
    consumed_all: bool,
    /// Whether any live branch can still be extended.
    has_more: bool,
}

impl<T: Clone> MappingTrie<T> {
    pub fn build(specs: Vec<MappingSpec<T>>) -> Self {
        let wildcards = specs
            .iter()
            .map(|m| m.sequence.iter().filter(|p| p.is_wildcard()).count())
            .collect();
        let mut trie = MappingTrie {
            nodes: vec![Node::new()],
            mappings: specs,
            wildcards,
        };
        for (idx, m) in trie.mappings.iter().enumerate() {
            let mut cur = 0usize;
            for pat in &m.sequence {
                // find or create edge
                let next = if let Some(e) = trie.nodes[cur].edges.iter().find(|e| e.pat == *pat) {
                    e.next
                } else {
                    let new_idx = trie.nodes.len();
                    trie.nodes.push(Node::new());
                    trie.nodes[cur].edges.push(Edge {
                        pat: pat.clone(),
                        next: new_idx,
                    });
                    new_idx
                };
                cur = next;
            }
            if trie.nodes[cur].terminal.is_some() {
                // Identical pattern registered twice: later mapping overrides earlier.
                trace!(
                    target: "input.map",
                    mapping_index = idx,
                    node = cur,
                    "terminal_override"
                );
            }
            trie.nodes[cur].terminal = Some(idx);
        }
        trie
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Resolve the accumulated buffer while more keys may still arrive.
    pub fn resolve(&self, buffer: &[KeyToken]) -> Resolution<T> {
        if buffer.is_empty() {
            return Resolution::NeedMore;
        }
        let walk = self.walk(buffer);
        match walk.last_terminal {
            Some((consumed, mi)) if consumed == buffer.len() => Resolution::Matched {
                consumed,
                output: self.mappings[mi].output.clone(),
                ambiguous: walk.has_more,
            },
            _ if walk.consumed_all && walk.has_more => Resolution::NeedMore,
            Some((consumed, mi)) => Resolution::Matched {
                consumed,
                output: self.mappings[mi].output.clone(),
                ambiguous: false,
            },
            None => Resolution::NoMatch,
        }
    }

    /// Resolve the buffer knowing no further key will extend it (the wait
    /// expired): the deepest complete mapping wins, otherwise nothing matches.
    pub fn resolve_final(&self, buffer: &[KeyToken]) -> Resolution<T> {
        if buffer.is_empty() {
            return Resolution::NoMatch;
        }
        match self.walk(buffer).last_terminal {
            Some((consumed, mi)) => Resolution::Matched {
                consumed,
                output: self.mappings[mi].output.clone(),
                ambiguous: false,
            },
            None => Resolution::NoMatch,
        }
    }

    fn walk(&self, buffer: &[KeyToken]) -> Walk {
        let mut active: SmallVec<[usize; 4]> = SmallVec::new();
        active.push(0);
        let mut last_terminal = None;
        let mut consumed_all = true;
        for (i, key) in buffer.iter().enumerate() {
            let mut next: SmallVec<[usize; 4]> = SmallVec::new();
            for &node_idx in &active {
                for edge in &self.nodes[node_idx].edges {
                    if edge.pat.matches(key) && !next.contains(&edge.next) {
                        next.push(edge.next);
                    }
                }
            }
            if next.is_empty() {
                trace!(target: "input.map", step = i, key = %key, "dead_end");
                consumed_all = false;
                active.clear();
                break;
            }
            trace!(target: "input.map", step = i, key = %key, branches = next.len(), "advance");
            active = next;
            if let Some(mi) = self.best_terminal(&active) {
                last_terminal = Some((i + 1, mi));
            }
        }
        let has_more = active.iter().any(|&n| !self.nodes[n].edges.is_empty());
        Walk {
            last_terminal,
            consumed_all,
            has_more,
        }
    }

    /// Most specific terminal among live nodes: fewest wildcards first, then
    /// the later registration.
    fn best_terminal(&self, active: &[usize]) -> Option<usize> {
        active
            .iter()
            .filter_map(|&n| self.nodes[n].terminal)
            .min_by_key(|&mi| (self.wildcards[mi], std::cmp::Reverse(mi)))
    }
}

// -------------------------------------------------------------------------------------------------
// Resolution Result
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// A complete mapping covering the first `consumed` keys. `ambiguous`
    /// means the whole buffer matched and a longer mapping is still possible.
    Matched {
        consumed: usize,
        output: T,
        ambiguous: bool,
    },
    /// Strict prefix of one or more mappings; no complete mapping yet.
    NeedMore,
    /// Nothing registered starts with this buffer.
    NoMatch,
}
