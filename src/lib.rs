//! teamforge
//!
//! An incremental matchmaking engine. Players enter a skill-ordered waiting
//! pool; every arrival or departure recomputes the best possible game of the
//! anchors it affects, and an indexed min-heap always knows the fairest game
//! currently available. Finalizing a match pops that game, removes its
//! players, and cascades the updates.
//!
//! # Quick Start
//!
//! ```rust
//! use teamforge::prelude::*;
//!
//! fn main() -> Result<()> {
//!     // 2v2, 1-norm fairness and uniformity, light fairness weight.
//!     let engine = MatchEngine::new_unrestricted(2, 1.0, 1.0, 0.1, false, false)?;
//!
//!     for skill in [1000, 1010, 1020, 1030] {
//!         engine.insert_manual(skill)?;
//!     }
//!
//!     let game = engine.create_match()?.expect("four players admit a match");
//!     assert_eq!(game.team_x().len(), 2);
//!     assert_eq!(game.team_y().len(), 2);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod engine;
pub mod error;
pub mod game;
pub mod heap;
pub mod player;
pub mod pool;
pub mod scoring;
pub mod telemetry;

// Re-export commonly used types
pub use clock::Clock;
pub use engine::{EngineConfig, MatchEngine, Parameters, PartitionStrategy, EXECUTION_TIMEOUT};
pub use error::{Result, TeamForgeError};
pub use game::CandidateGame;
pub use heap::CandidateHeap;
pub use player::{Player, PlayerRef};
pub use pool::PlayerPool;
pub use scoring::ScoringParams;
pub use telemetry::{Recorder, RecorderStats, StepEvent, StepObserver};

/// Prelude module for convenient imports
pub mod prelude;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
