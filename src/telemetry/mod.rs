//! Observation of the matchmaking process.
//!
//! The engine optionally reports every step it takes to a [`StepObserver`].
//! Observers are pure sinks: they see snapshots, never live structures, and
//! cannot influence control flow. The built-in [`Recorder`] buffers the
//! current operation's steps and run-wide statistics for replay frontends.

pub mod recorder;
pub mod step;

pub use recorder::{Recorder, RecorderStats};
pub use step::{
    GameSnapshot, HeapAction, HeapSnapshot, PlayerSnapshot, QueueAction, QueueSnapshot, StepEvent,
};

/// A sink for step events. Implementations must be shareable with the
/// engine's background worker, and panicking inside `record_event` is a
/// programmer error the engine will not catch.
pub trait StepObserver: Send + Sync {
    fn record_event(&self, event: StepEvent);
}
