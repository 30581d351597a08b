//! Key handling for one editing session.
//!
//! Flow per key:
//! 1. Count digits (Normal/Visual, nothing accumulated yet) go to the count
//!    prefix and stop there.
//! 2. Otherwise the key joins the accumulation buffer, which is resolved
//!    against the registry for the current mode.
//! 3. An unambiguous match is dispatched: the action runs, its batch is
//!    committed, the cursor is normalized for the resulting mode, observers
//!    hear about mode changes, and the dot-repeat recorder is updated. Keys
//!    left over from an overshoot are resolved again in the (possibly new)
//!    mode.
//! 4. A sequence that may still grow waits. The wait is bounded by
//!    `timeoutlen` measured from the key that started it; on expiry
//!    (`flush_pending`, or the next key arriving late) the longest complete
//!    match is committed or the buffer is dropped.

use crate::action::{ActionContext, ActionError};
use crate::pipeline::{self, DroppedTransformation};
use crate::registry::{ActionId, ActionRegistry, RegistryError};
use core_config::InputConfig;
use core_events::{KEYPRESS_TOTAL, KeyToken};
use core_keymap::Resolution;
use core_state::{Mode, VimState};
use core_text::{Position, TextBuffer, motion};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, trace};

/// Receives mode changes after the batch that caused them has committed.
pub trait ModeObserver: Send {
    fn on_mode_change(&self, from: Mode, to: Mode);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub action: &'static str,
    pub mode_before: Mode,
    pub mode_after: Mode,
    pub cursor: Position,
    pub applied: usize,
    pub dropped: Vec<DroppedTransformation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The accumulated keys matched nothing and were discarded.
    NoMatch,
    /// Waiting for more keys; `deadline` is `None` when the wait is unbounded.
    Pending { deadline: Option<Instant> },
    /// The key extended the count prefix.
    CountPending { count: usize },
    /// One or more actions ran (several after an overshoot or a `.`).
    Executed(Vec<ExecutionReport>),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("action {action} failed")]
    Action {
        action: &'static str,
        #[source]
        source: ActionError,
    },
}

enum Stop {
    Drained,
    Waiting,
    Reset,
}

pub struct Engine<B: TextBuffer> {
    registry: Arc<ActionRegistry>,
    buffer: B,
    state: VimState,
    pending: Vec<KeyToken>,
    pending_since: Option<Instant>,
    timeout: Option<Duration>,
    observers: Vec<Box<dyn ModeObserver>>,
    replaying: bool,
}

impl<B: TextBuffer> Engine<B> {
    /// Engine over the built-in catalog with default input settings.
    pub fn new(buffer: B) -> Result<Self, RegistryError> {
        Ok(Self::with_registry(Arc::new(ActionRegistry::builtin()?), buffer))
    }

    pub fn with_registry(registry: Arc<ActionRegistry>, buffer: B) -> Self {
        Self {
            registry,
            buffer,
            state: VimState::default(),
            pending: Vec::new(),
            pending_since: None,
            timeout: InputConfig::default().timeout_duration(),
            observers: Vec::new(),
            replaying: false,
        }
    }

    pub fn with_config(mut self, input: &InputConfig) -> Self {
        self.timeout = input.timeout_duration();
        self
    }

    pub fn with_cursor(mut self, pos: Position) -> Self {
        self.set_cursor(pos);
        self
    }

    pub fn add_mode_observer(&mut self, observer: Box<dyn ModeObserver>) {
        self.observers.push(observer);
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn cursor(&self) -> Position {
        self.state.cursor()
    }

    /// Move the cursor from outside (mouse, host navigation).
    pub fn set_cursor(&mut self, pos: Position) {
        let pos = if self.state.mode().has_block_cursor() {
            motion::normalize_normal_mode_position(&self.buffer, pos)
        } else {
            pos.clamp_to(&self.buffer)
        };
        self.state.set_cursor(pos);
    }

    pub fn state(&self) -> &VimState {
        &self.state
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    pub fn into_buffer(self) -> B {
        self.buffer
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    /// Keys accumulated but not yet resolved.
    pub fn pending_keys(&self) -> &[KeyToken] {
        &self.pending
    }

    /// When the current wait expires; `None` when idle or waiting unbounded.
    pub fn pending_deadline(&self) -> Option<Instant> {
        if self.pending.is_empty() {
            return None;
        }
        self.pending_since
            .zip(self.timeout)
            .map(|(since, wait)| since + wait)
    }

    pub fn handle_key(&mut self, key: KeyToken, now: Instant) -> Result<KeyOutcome, EngineError> {
        KEYPRESS_TOTAL.fetch_add(1, Ordering::Relaxed);
        let mut reports = Vec::new();
        if self.pending_deadline().is_some_and(|deadline| now >= deadline) {
            trace!(target: "actions.dispatch", "deadline_elapsed_before_key");
            self.resolve_pending(now, true, &mut reports)?;
        }

        if self.pending.is_empty()
            && self.state.mode().accepts_count()
            && let Some(digit) = key.digit()
            && (digit != 0 || self.state.recorded_state.count.is_some())
        {
            let count = self.state.recorded_state.push_count_digit(digit);
            trace!(target: "actions.dispatch", count, "count_prefix_extend");
            if reports.is_empty() {
                return Ok(KeyOutcome::CountPending { count });
            }
            return Ok(KeyOutcome::Executed(reports));
        }

        self.pending.push(key);
        let stop = self.resolve_pending(now, false, &mut reports)?;
        Ok(self.outcome(stop, reports))
    }

    pub fn handle_keys<I>(&mut self, keys: I, now: Instant) -> Result<Vec<KeyOutcome>, EngineError>
    where
        I: IntoIterator<Item = KeyToken>,
    {
        keys.into_iter().map(|k| self.handle_key(k, now)).collect()
    }

    /// Stop waiting: commit the longest complete match in the buffer, or drop
    /// the buffer when there is none. Keys after the committed match are
    /// resolved again and may start a new wait.
    pub fn flush_pending(&mut self, now: Instant) -> Result<KeyOutcome, EngineError> {
        if self.pending.is_empty() {
            return Ok(KeyOutcome::NoMatch);
        }
        debug!(target: "actions.dispatch", keys = %notation(&self.pending), "flush_pending");
        let mut reports = Vec::new();
        let stop = self.resolve_pending(now, true, &mut reports)?;
        Ok(self.outcome(stop, reports))
    }

    fn outcome(&self, stop: Stop, reports: Vec<ExecutionReport>) -> KeyOutcome {
        if !reports.is_empty() {
            return KeyOutcome::Executed(reports);
        }
        match stop {
            Stop::Waiting => KeyOutcome::Pending {
                deadline: self.pending_deadline(),
            },
            Stop::Drained | Stop::Reset => KeyOutcome::NoMatch,
        }
    }

    fn reset_accumulation(&mut self) {
        self.pending.clear();
        self.pending_since = None;
        self.state.recorded_state.count = None;
    }

    fn resolve_pending(
        &mut self,
        now: Instant,
        mut force: bool,
        reports: &mut Vec<ExecutionReport>,
    ) -> Result<Stop, EngineError> {
        while !self.pending.is_empty() {
            let mode = self.state.mode();
            let resolution = if force {
                self.registry.resolve_final(mode, &self.pending)
            } else {
                self.registry.resolve(mode, &self.pending)
            };
            // Only the first resolution after a timeout is final; leftovers
            // are ordinary input again.
            force = false;
            match resolution {
                Resolution::Matched {
                    consumed,
                    output,
                    ambiguous: false,
                } => {
                    let keys: Vec<KeyToken> = self.pending.drain(..consumed).collect();
                    self.pending_since = None;
                    self.dispatch(output, keys, now, reports)?;
                }
                Resolution::Matched { .. } | Resolution::NeedMore => {
                    if self.pending_since.is_none() {
                        self.pending_since = Some(now);
                    }
                    trace!(
                        target: "actions.dispatch",
                        mode = %mode,
                        keys = %notation(&self.pending),
                        "awaiting_more"
                    );
                    return Ok(Stop::Waiting);
                }
                Resolution::NoMatch => {
                    debug!(
                        target: "actions.dispatch",
                        mode = %mode,
                        keys = %notation(&self.pending),
                        "no_match"
                    );
                    self.reset_accumulation();
                    return Ok(Stop::Reset);
                }
            }
        }
        Ok(Stop::Drained)
    }

    fn dispatch(
        &mut self,
        id: ActionId,
        keys: Vec<KeyToken>,
        now: Instant,
        reports: &mut Vec<ExecutionReport>,
    ) -> Result<(), EngineError> {
        let registry = Arc::clone(&self.registry);
        let Some(action) = registry.action(id) else {
            self.reset_accumulation();
            return Ok(());
        };
        let name = action.name();
        let mode_before = self.state.mode();
        let count = self.state.recorded_state.count;
        self.state.recorded_state.action_keys = keys.clone();

        let position = self.state.cursor();
        let mut ctx = ActionContext::new(position, &mut self.state, &self.buffer, &keys);
        let result = action.exec(&mut ctx);
        let repeat = ctx.repeat_requested();
        if let Err(source) = result {
            error!(
                target: "actions.dispatch",
                action = name,
                mode = %mode_before,
                error = %source,
                "action_failed"
            );
            self.state.recorded_state.reset();
            self.pending.clear();
            self.pending_since = None;
            return Err(EngineError::Action {
                action: name,
                source,
            });
        }

        let batch = self.state.recorded_state.transformer.take();
        let commit = pipeline::commit_transformations(&mut self.buffer, batch, self.state.cursor());
        let mode_after = self.state.mode();
        let cursor = if mode_after.has_block_cursor() {
            motion::normalize_normal_mode_position(&self.buffer, commit.cursor)
        } else {
            commit.cursor
        };
        self.state.cursor_stop = cursor;
        if !mode_after.is_visual() {
            self.state.cursor_start = cursor;
        }
        debug!(
            target: "actions.dispatch",
            action = name,
            keys = %notation(&keys),
            from = %mode_before,
            to = %mode_after,
            cursor = %cursor,
            applied = commit.applied,
            dropped = commit.dropped.len(),
            "executed"
        );

        if mode_before != mode_after {
            for observer in &self.observers {
                observer.on_mode_change(mode_before, mode_after);
            }
        }
        if !self.replaying && !repeat {
            self.record_change(
                action.can_be_repeated_with_dot(),
                mode_before,
                mode_after,
                count,
                &keys,
            );
        }
        self.state.recorded_state.reset();
        reports.push(ExecutionReport {
            action: name,
            mode_before,
            mode_after,
            cursor,
            applied: commit.applied,
            dropped: commit.dropped,
        });

        if repeat && !self.replaying {
            self.replay_last_change(count, now, reports)?;
        }
        Ok(())
    }

    fn record_change(
        &mut self,
        repeatable: bool,
        mode_before: Mode,
        mode_after: Mode,
        count: Option<usize>,
        keys: &[KeyToken],
    ) {
        let recorder = &mut self.state.dot_repeat;
        if recorder.is_recording() {
            recorder.extend(keys);
        } else if repeatable && mode_before == Mode::Normal {
            recorder.begin(count, keys);
        }
        if mode_after == Mode::Normal {
            recorder.finish();
        }
    }

    fn replay_last_change(
        &mut self,
        count: Option<usize>,
        now: Instant,
        reports: &mut Vec<ExecutionReport>,
    ) -> Result<(), EngineError> {
        let Some(change) = self.state.dot_repeat.last().cloned() else {
            debug!(target: "actions.dispatch", "nothing_to_repeat");
            return Ok(());
        };
        debug!(
            target: "actions.dispatch",
            keys = %notation(&change.keys),
            count = ?count.or(change.count),
            "repeat_last_change"
        );
        let outer = std::mem::take(&mut self.pending);
        let outer_since = self.pending_since.take();
        self.replaying = true;
        self.state.recorded_state.count = count.or(change.count);

        let result = self.replay_keys(&change.keys, now, reports);

        self.replaying = false;
        if result.is_ok() {
            self.pending = outer;
            self.pending_since = outer_since;
        }
        result
    }

    fn replay_keys(
        &mut self,
        keys: &[KeyToken],
        now: Instant,
        reports: &mut Vec<ExecutionReport>,
    ) -> Result<(), EngineError> {
        for key in keys {
            self.pending.push(key.clone());
            self.resolve_pending(now, false, reports)?;
        }
        // A replayed change never waits for keys that are not coming.
        while !self.pending.is_empty() {
            self.resolve_pending(now, true, reports)?;
        }
        Ok(())
    }
}

fn notation(keys: &[KeyToken]) -> String {
    keys.iter().map(ToString::to_string).collect()
}
