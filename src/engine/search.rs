//! Windowed anchor search.
//!
//! The best game anchored at a player is found by enumerating every
//! (2k−1)-subset of the players in the anchor's skill window and asking the
//! partition solver for the best split of each. Any game is enumerated
//! exactly once across the whole pool: it is only visible from its
//! lowest-skill member, because windows look strictly upward in rank.

use std::time::{Duration, Instant};

use itertools::Itertools;
use tracing::{info, warn};

use crate::engine::partition::PartitionStrategy;
use crate::game::CandidateGame;
use crate::player::PlayerRef;
use crate::scoring::ScoringParams;

/// Result of one anchor search.
#[derive(Debug)]
pub(crate) struct SearchOutcome {
    /// Best game found, or None when the window cannot seat a full game.
    pub best: Option<CandidateGame>,
    /// Splits evaluated across all subsets, for diagnostics.
    pub enumerated: usize,
    /// Whether the wall-clock budget cut the enumeration short. The best
    /// found so far is still returned; a timeout is never an error.
    pub timed_out: bool,
}

pub(crate) fn best_window_game(
    anchor: &PlayerRef,
    window: &[PlayerRef],
    team_size: usize,
    strategy: PartitionStrategy,
    scoring: &ScoringParams,
    budget: Duration,
) -> SearchOutcome {
    let required = 2 * team_size - 1;
    if window.len() < required {
        return SearchOutcome {
            best: None,
            enumerated: 0,
            timed_out: false,
        };
    }

    let started = Instant::now();
    let mut best: Option<CandidateGame> = None;
    let mut best_score = f64::INFINITY;
    let mut enumerated = 0;
    let mut timed_out = false;

    for subset in window.iter().cloned().combinations(required) {
        if started.elapsed() > budget {
            warn!(
                anchor = anchor.id(),
                "search budget exhausted, keeping the best game found so far"
            );
            timed_out = true;
            break;
        }
        if best_score == 0.0 {
            info!(anchor = anchor.id(), "perfect game found, stopping early");
            break;
        }

        let outcome = strategy.solve(anchor, &subset, team_size, scoring);
        enumerated += outcome.enumerated;
        if outcome.score < best_score {
            best_score = outcome.score;
            best = Some(outcome.game);
        }
    }

    info!(
        anchor = anchor.id(),
        enumerated, "finished scoring candidate games for anchor"
    );
    SearchOutcome {
        best,
        enumerated,
        timed_out,
    }
}
