use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::step::StepEvent;
use super::StepObserver;

/// Statistics accumulated across every recorded step of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecorderStats {
    pub queue_size: Vec<usize>,
    pub heap_size: Vec<usize>,
    pub max_wait_time: Vec<f64>,
    pub min_imbalance: Vec<f64>,
    pub min_priority: Vec<f64>,
}

#[derive(Debug, Default)]
struct RecorderInner {
    steps: Vec<StepEvent>,
    current_operation: Option<u64>,
    stats: RecorderStats,
}

/// The built-in step observer.
///
/// Keeps the steps of the current public operation (the buffer resets when a
/// step with a new operation number arrives) for replay, and per-step
/// statistics for the whole run. The buffers are mutex-guarded: frontends
/// read them while the engine's worker thread appends, and every read takes
/// a consistent snapshot.
#[derive(Debug, Default)]
pub struct Recorder {
    inner: Mutex<RecorderInner>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps of the most recent operation, in emission order.
    pub fn steps(&self) -> Vec<StepEvent> {
        self.inner.lock().unwrap().steps.clone()
    }

    /// Run-wide statistics series.
    pub fn stats(&self) -> RecorderStats {
        self.inner.lock().unwrap().stats.clone()
    }

    /// The current step buffer serialized for downstream consumers.
    pub fn steps_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.steps())
    }
}

impl StepObserver for Recorder {
    fn record_event(&self, event: StepEvent) {
        let mut inner = self.inner.lock().unwrap();
        if inner.current_operation != Some(event.operation) {
            inner.steps.clear();
            inner.current_operation = Some(event.operation);
        }

        inner.stats.queue_size.push(event.queue.state.len());
        inner.stats.heap_size.push(event.heap.state.len());
        let max_wait = event
            .queue
            .state
            .iter()
            .map(|p| p.wait_time)
            .fold(0.0, f64::max);
        inner.stats.max_wait_time.push(max_wait);
        if let Some(root) = event.heap.state.first() {
            inner.stats.min_imbalance.push(root.imbalance);
            if let Some(priority) = root.priority {
                inner.stats.min_priority.push(priority);
            }
        }

        inner.steps.push(event);
    }
}
