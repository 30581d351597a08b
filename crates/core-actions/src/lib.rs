//! Modal command engine: actions, their registry, the transformation commit
//! pipeline, and the per-session `Engine` tying them together.
//!
//! Layering:
//! * `action`   - the `Action` trait and the context an execution sees.
//! * `registry` - explicit registration table compiled into per-mode tries.
//! * `actions`  - built-in catalog (Replace mode in full, plus a working
//!   subset of Normal/Insert/Visual commands).
//! * `pipeline` - applies a queued batch atomically and resolves cursor diffs.
//! * `engine`   - key accumulation, counts, bounded ambiguity wait, dispatch,
//!   dot-repeat.
//!
//! Actions never touch the buffer. They mutate `VimState` and queue
//! `Transformation`s; the engine commits the batch after the action returns.

mod action;
pub mod actions;
mod engine;
pub mod pipeline;
mod registry;

pub use action::{Action, ActionContext, ActionError};
pub use actions::builtin_actions;
pub use engine::{Engine, EngineError, ExecutionReport, KeyOutcome, ModeObserver};
pub use pipeline::{CommitReport, DroppedTransformation, commit_transformations};
pub use registry::{ActionId, ActionRegistry, RegistryError};
