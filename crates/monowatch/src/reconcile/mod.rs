//! Reconciling raw observations into a deduplicated event feed and a
//! persisted game snapshot.

mod event;
mod log;
mod message;
mod pipeline;
mod reconciler;
mod snapshot;
mod translate;

pub use event::{ActionKind, GameEvent, Record, SYSTEM_PLAYER};
pub use log::EventLog;
pub use message::describe;
pub use pipeline::EventPipeline;
pub use reconciler::{
    DEFAULT_EVENT_CAPACITY, Reconciler, Recorded, SharedReconciler, default_ignored_prompts,
};
pub use snapshot::{BoardSquare, GameSnapshot, GlobalState, PlayerState};
pub use translate::Translator;
