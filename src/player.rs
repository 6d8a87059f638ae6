use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use crate::clock::Clock;

/// Shared handle to a player. The pool, the candidate heap, and the match
/// list all hold clones of the same allocation, so a player removed from the
/// pool stays observable (for wait-time statistics) as long as any finalized
/// match references it.
pub type PlayerRef = Arc<Player>;

/// A player waiting for (or removed from) the matchmaking queue.
///
/// Identity is the id alone; the total order is `(skill, id)` ascending so
/// that equal skills tie-break deterministically.
#[derive(Debug)]
pub struct Player {
    id: u64,
    skill: u32,
    enqueue_time: f64,
    dequeue_time: OnceLock<f64>,
}

impl Player {
    /// Create a player, capturing its enqueue time from `clock`.
    pub fn new(id: u64, skill: u32, clock: &Clock) -> Self {
        Self {
            id,
            skill,
            enqueue_time: clock.now(),
            dequeue_time: OnceLock::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn skill(&self) -> u32 {
        self.skill
    }

    pub fn enqueue_time(&self) -> f64 {
        self.enqueue_time
    }

    pub fn dequeue_time(&self) -> Option<f64> {
        self.dequeue_time.get().copied()
    }

    /// Seconds spent in the queue: up to the dequeue time once exited,
    /// otherwise up to the present.
    pub fn wait_time(&self, clock: &Clock) -> f64 {
        match self.dequeue_time.get() {
            Some(dequeued) => dequeued - self.enqueue_time,
            None => clock.now() - self.enqueue_time,
        }
    }

    /// Stamp the dequeue time. Callers invoke this exactly once, when the
    /// player leaves the pool.
    pub fn mark_exited(&self, clock: &Clock) {
        let already_exited = self.dequeue_time.set(clock.now()).is_err();
        debug_assert!(!already_exited, "player {} exited twice", self.id);
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Player {}

impl Hash for Player {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Player {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Player {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.skill, self.id).cmp(&(other.skill, other.id))
    }
}
