use core_actions::{Engine, EngineError, KeyOutcome};
use core_config::InputConfig;
use core_events::{
    CHANNEL_SEND_FAILURES, EVENT_CHANNEL_CAP, Event, InputEvent, KEYPRESS_REPEAT, KeyEventExt,
    KeyToken,
};
use core_state::Mode;
use core_text::{Position, TextBuffer};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{Notify, mpsc};
use tokio::task;
use tracing::{Instrument, debug, info, trace, warn};

/// Updates are small; the host is expected to drain them promptly.
pub const UPDATE_CHANNEL_CAP: usize = 1024;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("session is no longer accepting events")]
pub struct SessionClosed;

/// Producer side of a running session.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    sender: mpsc::Sender<Event>,
    shutdown: SessionShutdown,
}

impl SessionHandle {
    /// Queue one event, waiting for channel capacity.
    pub async fn send(&self, event: Event) -> Result<(), SessionClosed> {
        if self.sender.send(event).await.is_err() {
            CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
            return Err(SessionClosed);
        }
        Ok(())
    }

    pub async fn send_key(&self, token: KeyToken) -> Result<(), SessionClosed> {
        self.send(Event::Input(InputEvent::KeyPress(KeyEventExt::new(token))))
            .await
    }

    pub async fn send_keys<I>(&self, tokens: I) -> Result<(), SessionClosed>
    where
        I: IntoIterator<Item = KeyToken>,
    {
        for token in tokens {
            self.send_key(token).await?;
        }
        Ok(())
    }

    /// Ask the session to stop after the events already queued.
    pub async fn close(&self) -> Result<(), SessionClosed> {
        self.send(Event::Shutdown).await
    }

    /// Stop immediately, abandoning queued events.
    pub fn abort(&self) {
        self.shutdown.signal();
    }

    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.sender.clone()
    }
}

#[derive(Clone, Debug)]
struct SessionShutdown {
    notify: Arc<Notify>,
}

impl SessionShutdown {
    fn new() -> Self {
        Self {
            notify: Arc::new(Notify::new()),
        }
    }

    fn signal(&self) {
        self.notify.notify_one();
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// What caused an update to be emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    Key(KeyOutcome),
    /// The ambiguity deadline passed with no further key.
    Timeout(KeyOutcome),
    /// An action failed; the engine already reset its pending state.
    Failed { action: &'static str, error: String },
}

/// Engine snapshot taken after each processed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpdate {
    pub mode: Mode,
    pub cursor: Position,
    pub kind: UpdateKind,
}

impl SessionUpdate {
    pub fn outcome(&self) -> Option<&KeyOutcome> {
        match &self.kind {
            UpdateKind::Key(o) | UpdateKind::Timeout(o) => Some(o),
            UpdateKind::Failed { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExitReason {
    Running,
    ShutdownEvent,
    ShutdownSignal,
    ChannelClosed,
}

impl ExitReason {
    fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Running => "running",
            ExitReason::ShutdownEvent => "shutdown_event",
            ExitReason::ShutdownSignal => "shutdown_signal",
            ExitReason::ChannelClosed => "channel_closed",
        }
    }
}

/// Spawn the task that owns `engine` for the lifetime of one session.
///
/// Events are handled strictly one at a time. While a key sequence is
/// ambiguous the task waits for the next event or the engine's deadline,
/// whichever comes first. The engine is handed back through the
/// `JoinHandle` once the session ends.
pub fn spawn_session<B>(
    engine: Engine<B>,
    config: &InputConfig,
) -> (
    SessionHandle,
    mpsc::Receiver<SessionUpdate>,
    task::JoinHandle<Engine<B>>,
)
where
    B: TextBuffer + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAP);
    let (update_tx, update_rx) = mpsc::channel(UPDATE_CHANNEL_CAP);
    let shutdown = SessionShutdown::new();
    let task = SessionTask {
        engine: engine.with_config(config),
        receiver,
        updates: update_tx,
        shutdown: shutdown.clone(),
        exit_reason: ExitReason::Running,
        processed: 0,
    };
    let span = tracing::debug_span!(target: "input.session", "session_task");
    let join = task::spawn(task.run().instrument(span));
    (SessionHandle { sender, shutdown }, update_rx, join)
}

struct SessionTask<B: TextBuffer> {
    engine: Engine<B>,
    receiver: mpsc::Receiver<Event>,
    updates: mpsc::Sender<SessionUpdate>,
    shutdown: SessionShutdown,
    exit_reason: ExitReason,
    processed: u64,
}

impl<B: TextBuffer> SessionTask<B> {
    async fn run(mut self) -> Engine<B> {
        info!(target: "input.session", "session_started");
        loop {
            let deadline = self.engine.pending_deadline();
            let event = tokio::select! {
                biased;
                _ = self.shutdown.wait() => {
                    self.exit_reason = ExitReason::ShutdownSignal;
                    break;
                }
                event = self.receiver.recv() => event,
                _ = wait_for(deadline) => {
                    self.on_deadline().await;
                    continue;
                }
            };

            match event {
                Some(Event::Input(InputEvent::KeyPress(key))) => self.on_key(key).await,
                Some(Event::Shutdown) => {
                    self.exit_reason = ExitReason::ShutdownEvent;
                    break;
                }
                None => {
                    self.exit_reason = ExitReason::ChannelClosed;
                    break;
                }
            }
        }
        info!(
            target: "input.session",
            reason = self.exit_reason.as_str(),
            processed = self.processed,
            pending = self.engine.pending_keys().len(),
            "session_stopped"
        );
        self.engine
    }

    async fn on_key(&mut self, key: KeyEventExt) {
        self.processed += 1;
        if key.repeat {
            KEYPRESS_REPEAT.fetch_add(1, Ordering::Relaxed);
        }
        trace!(target: "input.session", key = %key.token, "key_received");
        let result = self.engine.handle_key(key.token, key.timestamp);
        self.publish(result.map(UpdateKind::Key)).await;
    }

    async fn on_deadline(&mut self) {
        debug!(
            target: "input.session",
            pending = self.engine.pending_keys().len(),
            "ambiguity_deadline"
        );
        let result = self.engine.flush_pending(Instant::now());
        self.publish(result.map(UpdateKind::Timeout)).await;
    }

    async fn publish(&mut self, result: Result<UpdateKind, EngineError>) {
        let kind = result.unwrap_or_else(|err| {
            let EngineError::Action { action, ref source } = err;
            warn!(target: "input.session", action, error = %source, "action_failed");
            UpdateKind::Failed {
                action,
                error: source.to_string(),
            }
        });
        let update = SessionUpdate {
            mode: self.engine.mode(),
            cursor: self.engine.cursor(),
            kind,
        };
        // The host may stop listening and still expect its keys to be applied.
        if self.updates.send(update).await.is_err() {
            trace!(target: "input.session", "update_receiver_gone");
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}
