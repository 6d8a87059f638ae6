//! Team partitioning.
//!
//! Given an anchor and the 2k−1 other players of a prospective game, pick
//! the split into two k-player teams that minimizes the active metric.
//! The exact solver enumerates every choice of the anchor's k−1 teammates;
//! the greedy solver builds one split in O(k log k) and may be off by the
//! approximation it trades for.

use itertools::Itertools;

use crate::game::CandidateGame;
use crate::player::PlayerRef;
use crate::scoring::{p_fairness, ScoringParams};

/// How the engine splits a game's players into teams. Fixed at engine
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStrategy {
    /// Enumerate all (2k−1 choose k−1) teammate sets and keep the best.
    Exact,
    /// One pass assigning strongest-first to the fairer side.
    Greedy,
}

/// A solver's answer: the chosen game, its score under the active metric,
/// and how many splits were evaluated to find it.
#[derive(Debug)]
pub(crate) struct PartitionOutcome {
    pub game: CandidateGame,
    pub score: f64,
    pub enumerated: usize,
}

impl PartitionStrategy {
    pub(crate) fn solve(
        self,
        anchor: &PlayerRef,
        rest: &[PlayerRef],
        team_size: usize,
        scoring: &ScoringParams,
    ) -> PartitionOutcome {
        debug_assert_eq!(rest.len(), 2 * team_size - 1);
        match self {
            PartitionStrategy::Exact => exact_split(anchor, rest, team_size, scoring),
            PartitionStrategy::Greedy => greedy_split(anchor, rest, team_size, scoring),
        }
    }
}

fn exact_split(
    anchor: &PlayerRef,
    rest: &[PlayerRef],
    team_size: usize,
    scoring: &ScoringParams,
) -> PartitionOutcome {
    let mut best: Option<CandidateGame> = None;
    let mut best_score = f64::INFINITY;
    let mut enumerated = 0;

    for teammates in (0..rest.len()).combinations(team_size - 1) {
        enumerated += 1;

        let mut in_x = vec![false; rest.len()];
        let mut team_x = Vec::with_capacity(team_size);
        team_x.push(anchor.clone());
        for &slot in &teammates {
            in_x[slot] = true;
            team_x.push(rest[slot].clone());
        }
        let team_y: Vec<PlayerRef> = rest
            .iter()
            .enumerate()
            .filter(|(slot, _)| !in_x[*slot])
            .map(|(_, player)| player.clone())
            .collect();

        let game = CandidateGame::new(anchor.clone(), team_x, team_y, scoring);
        let score = game.sort_score();
        if score < best_score {
            best_score = score;
            best = Some(game);
        }
        if best_score == 0.0 {
            break;
        }
    }

    let game = match best {
        Some(game) => game,
        // 2k−1 players always admit at least one split.
        None => unreachable!("partition enumeration produced no candidate"),
    };
    PartitionOutcome {
        game,
        score: best_score,
        enumerated,
    }
}

fn greedy_split(
    anchor: &PlayerRef,
    rest: &[PlayerRef],
    team_size: usize,
    scoring: &ScoringParams,
) -> PartitionOutcome {
    let mut players: Vec<PlayerRef> = Vec::with_capacity(2 * team_size);
    players.push(anchor.clone());
    players.extend(rest.iter().cloned());
    players.sort_by(|a, b| b.cmp(a));

    let mut team_x: Vec<PlayerRef> = Vec::with_capacity(team_size);
    let mut team_y: Vec<PlayerRef> = Vec::with_capacity(team_size);
    for player in players {
        if team_x.len() < team_size && team_y.len() < team_size {
            let mut with_x = team_x.clone();
            with_x.push(player.clone());
            let mut with_y = team_y.clone();
            with_y.push(player);
            if p_fairness(&with_x, &team_y, scoring.p_norm)
                <= p_fairness(&team_x, &with_y, scoring.p_norm)
            {
                team_x = with_x;
            } else {
                team_y = with_y;
            }
        } else if team_x.len() < team_size {
            team_x.push(player);
        } else {
            team_y.push(player);
        }
    }

    // The assignment is label-symmetric, so the anchor may have landed on
    // the second team; swapping the labels changes no score.
    if !team_x.iter().any(|p| p.id() == anchor.id()) {
        std::mem::swap(&mut team_x, &mut team_y);
    }

    let game = CandidateGame::new(anchor.clone(), team_x, team_y, scoring);
    let score = game.sort_score();
    PartitionOutcome {
        game,
        score,
        enumerated: 1,
    }
}
