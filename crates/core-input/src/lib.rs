//! Async per-session input service.
//!
//! A session is one tokio task that owns an [`core_actions::Engine`]. Hosts
//! push key events through a [`SessionHandle`] and observe the engine through
//! a stream of [`SessionUpdate`]s. Pending ambiguous sequences are flushed by
//! the task itself when their deadline passes, so hosts never need a timer.

mod session;

pub use session::{
    SessionClosed, SessionHandle, SessionUpdate, UPDATE_CHANNEL_CAP, UpdateKind, spawn_session,
};
