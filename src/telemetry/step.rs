//! Step events.
//!
//! Every mutation the engine performs on the pool or the heap is reported to
//! the installed observer as a [`StepEvent`]: full snapshots of the pool,
//! the heap (in array order), and the match list, plus metadata describing
//! what the step did. Events are plain serializable data so downstream
//! consumers (replay frontends, analysis scripts) can take them off-process.

use serde::{Deserialize, Serialize};

/// What a step did to the player queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAction {
    #[default]
    Idle,
    Insert,
    Remove,
    /// An anchor's window is being searched.
    Anchor,
    GameFound,
    GameNotFound,
}

/// What a step did to the candidate game heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeapAction {
    #[default]
    Idle,
    Insert,
    Remove,
    /// The root game was finalized into a match.
    Create,
}

/// A player as captured at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: u64,
    pub skill: u32,
    pub enqueue_time: f64,
    pub wait_time: f64,
}

/// A candidate game (or finalized match) as captured at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub anchor_id: u64,
    pub team_x: Vec<PlayerSnapshot>,
    pub team_y: Vec<PlayerSnapshot>,
    pub imbalance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
}

/// The queue half of a step: the ordered pool plus what happened to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Pool contents in rank order.
    pub state: Vec<PlayerSnapshot>,
    pub action: QueueAction,
    /// Rank of the player the action refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_player: Option<usize>,
    /// Rank range [start, end) of the searched window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<(usize, usize)>,
    /// Ranks of the found game's team X.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_x: Option<Vec<usize>>,
    /// Ranks of the found game's team Y.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_y: Option<Vec<usize>>,
}

/// The heap half of a step: the heap in array order plus what happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapSnapshot {
    pub state: Vec<GameSnapshot>,
    pub action: HeapAction,
    /// Heap index of the game the action refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_game: Option<usize>,
}

/// One step of the matchmaking process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    /// Sequence number of the public operation this step belongs to.
    /// Observers that replay one operation at a time reset their buffers
    /// when it changes.
    pub operation: u64,
    pub queue: QueueSnapshot,
    pub heap: HeapSnapshot,
    /// Matches finalized so far.
    pub matches: Vec<GameSnapshot>,
}
