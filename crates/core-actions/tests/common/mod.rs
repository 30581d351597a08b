#![allow(dead_code)] // Shared across several integration tests; each test binary uses a subset of helpers.

use core_actions::{
    Action, ActionContext, ActionError, ActionRegistry, Engine, KeyOutcome, ModeObserver,
    builtin_actions,
};
use core_events::{KeyToken, parse_key_sequence};
use core_state::{Mode, Transformation};
use core_text::{Buffer, Position};
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing_subscriber::fmt::MakeWriter;

pub fn keys(notation: &str) -> Vec<KeyToken> {
    if notation.is_empty() {
        return Vec::new();
    }
    parse_key_sequence(notation).expect("valid key notation")
}

/// Engine over the built-in catalog with the cursor at `(line, character)`.
pub fn engine_at(text: &str, line: usize, character: usize) -> Engine<Buffer> {
    Engine::new(Buffer::from_str("t", text).unwrap())
        .unwrap()
        .with_cursor(Position::new(line, character))
}

/// Engine over the built-in catalog followed by `extra` (later entries win).
pub fn engine_with(text: &str, extra: Vec<Box<dyn Action>>) -> Engine<Buffer> {
    let mut actions = builtin_actions();
    actions.extend(extra);
    let registry = ActionRegistry::from_actions(actions).unwrap();
    Engine::with_registry(Arc::new(registry), Buffer::from_str("t", text).unwrap())
}

/// Feed `notation` at a single instant, panicking on engine errors.
pub fn run(engine: &mut Engine<Buffer>, notation: &str) -> Vec<KeyOutcome> {
    run_at(engine, notation, Instant::now())
}

pub fn run_at(engine: &mut Engine<Buffer>, notation: &str, now: Instant) -> Vec<KeyOutcome> {
    engine.handle_keys(keys(notation), now).expect("engine error")
}

/// Names of every action executed across `outcomes`, in order.
pub fn executed(outcomes: &[KeyOutcome]) -> Vec<&'static str> {
    outcomes
        .iter()
        .filter_map(|o| match o {
            KeyOutcome::Executed(reports) => Some(reports.iter().map(|r| r.action)),
            _ => None,
        })
        .flatten()
        .collect()
}

pub fn text(engine: &Engine<Buffer>) -> String {
    core_text::TextBuffer::text(engine.buffer())
}

/// Test action with a fixed name and patterns that does nothing but match.
pub struct Tag {
    pub name: &'static str,
    pub keys: Vec<&'static str>,
    pub modes: Vec<Mode>,
}

impl Tag {
    pub fn normal(name: &'static str, keys: &[&'static str]) -> Box<dyn Action> {
        Box::new(Tag {
            name,
            keys: keys.to_vec(),
            modes: vec![Mode::Normal],
        })
    }
}

impl Action for Tag {
    fn name(&self) -> &'static str {
        self.name
    }
    fn keys(&self) -> &[&'static str] {
        &self.keys
    }
    fn modes(&self) -> &[Mode] {
        &self.modes
    }
    fn exec(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Queues a fixed batch of transformations.
pub struct Queue {
    pub key: &'static str,
    pub batch: Vec<Transformation>,
}

impl Action for Queue {
    fn name(&self) -> &'static str {
        "queue"
    }
    fn keys(&self) -> &[&'static str] {
        std::slice::from_ref(&self.key)
    }
    fn modes(&self) -> &[Mode] {
        &[Mode::Normal]
    }
    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        for t in &self.batch {
            ctx.enqueue(t.clone());
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct ModeLog {
    pub changes: Arc<Mutex<Vec<(Mode, Mode)>>>,
}

impl ModeLog {
    pub fn snapshot(&self) -> Vec<(Mode, Mode)> {
        self.changes.lock().unwrap().clone()
    }
}

impl ModeObserver for ModeLog {
    fn on_mode_change(&self, from: Mode, to: Mode) {
        self.changes.lock().unwrap().push((from, to));
    }
}

#[derive(Clone)]
pub struct BufferWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl BufferWriter {
    pub fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (Self { inner: buf.clone() }, buf)
    }
}

pub struct LockedWriter<'a> {
    guard: MutexGuard<'a, Vec<u8>>,
}

impl<'a> Write for LockedWriter<'a> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for BufferWriter {
    type Writer = LockedWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LockedWriter {
            guard: self.inner.lock().expect("log buffer poisoned"),
        }
    }
}
