//! Prelude module with commonly used types and traits
//!
//! Import this module to get the essential types for using teamforge:
//!
//! ```rust
//! use teamforge::prelude::*;
//! ```

pub use crate::{
    clock::Clock,
    engine::{EngineConfig, MatchEngine, Parameters, PartitionStrategy},
    error::{Result, TeamForgeError},
    game::CandidateGame,
    heap::CandidateHeap,
    player::{Player, PlayerRef},
    pool::PlayerPool,
    scoring::ScoringParams,
    telemetry::{
        GameSnapshot, HeapAction, PlayerSnapshot, QueueAction, Recorder, RecorderStats,
        StepEvent, StepObserver,
    },
};

// Re-export common external dependencies
pub use std::sync::Arc;
