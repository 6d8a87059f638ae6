//! Score functions for candidate games.
//!
//! A game of teams X and Y is scored by its imbalance
//! `f(X, Y) = α·d_p(X, Y) + v_q(X ∪ Y)`: the weighted inter-team fairness
//! gap plus the intra-game skill spread. Time-sensitive engines extend this
//! to a priority `g(X, Y) = f(X, Y) + β·min enqueue_time`, so games holding
//! an old player sort ahead of fresher, slightly fairer ones.

use crate::player::PlayerRef;

/// Norms and weights shared by every score computation of one engine.
#[derive(Debug, Clone, Copy)]
pub struct ScoringParams {
    /// Fairness norm p (≥ 1, may be `f64::INFINITY`).
    pub p_norm: f64,
    /// Uniformity norm q (≥ 1, may be `f64::INFINITY`).
    pub q_norm: f64,
    /// Fairness weight α (> 0).
    pub fairness_weight: f64,
    /// Queue weight β (≥ 0); present iff the engine is time-sensitive.
    pub queue_weight: Option<f64>,
}

/// p-norm skill of a team. For p = ∞ this is the strongest member's skill;
/// an empty team scores 0 (skills are non-negative).
pub fn team_p_skill(team: &[PlayerRef], p_norm: f64) -> f64 {
    if p_norm.is_infinite() {
        return team.iter().map(|p| f64::from(p.skill())).fold(0.0, f64::max);
    }
    team.iter()
        .map(|p| f64::from(p.skill()).powf(p_norm))
        .sum::<f64>()
        .powf(1.0 / p_norm)
}

/// Absolute difference of the two teams' p-norm skills.
pub fn p_fairness(team_x: &[PlayerRef], team_y: &[PlayerRef], p_norm: f64) -> f64 {
    (team_p_skill(team_x, p_norm) - team_p_skill(team_y, p_norm)).abs()
}

/// Mean skill across all players of a game.
pub fn mean_skill(players: &[PlayerRef]) -> f64 {
    let total: f64 = players.iter().map(|p| f64::from(p.skill())).sum();
    total / players.len() as f64
}

/// q-norm deviation of the game's skills from their mean. For q = ∞ this is
/// the farthest player's distance from the mean.
pub fn q_uniformity(players: &[PlayerRef], q_norm: f64) -> f64 {
    let mean = mean_skill(players);
    if q_norm.is_infinite() {
        return players
            .iter()
            .map(|p| (f64::from(p.skill()) - mean).abs())
            .fold(0.0, f64::max);
    }
    let sum: f64 = players
        .iter()
        .map(|p| (f64::from(p.skill()) - mean).abs().powf(q_norm))
        .sum();
    (sum / players.len() as f64).powf(1.0 / q_norm)
}

/// Imbalance `f(X, Y) = α·d_p(X, Y) + v_q(X ∪ Y)`. Always ≥ 0.
pub fn imbalance(
    team_x: &[PlayerRef],
    team_y: &[PlayerRef],
    p_norm: f64,
    q_norm: f64,
    fairness_weight: f64,
) -> f64 {
    let game_players: Vec<PlayerRef> = team_x.iter().chain(team_y).cloned().collect();
    fairness_weight * p_fairness(team_x, team_y, p_norm) + q_uniformity(&game_players, q_norm)
}

/// Priority `g(X, Y) = f(X, Y) + β·min enqueue_time`. Lower is more urgent:
/// the oldest player in the game drags the minimum down.
pub fn priority(
    team_x: &[PlayerRef],
    team_y: &[PlayerRef],
    queue_weight: f64,
    imbalance: f64,
) -> f64 {
    let oldest = team_x
        .iter()
        .chain(team_y)
        .map(|p| p.enqueue_time())
        .fold(f64::INFINITY, f64::min);
    imbalance + queue_weight * oldest
}
