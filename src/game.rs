use crate::player::PlayerRef;
use crate::scoring::{self, ScoringParams};

/// A candidate game: two disjoint teams of equal size, keyed by its anchor
/// (the lowest-skill member, always on team X), with scores precomputed at
/// construction and frozen thereafter.
#[derive(Debug, Clone)]
pub struct CandidateGame {
    anchor: PlayerRef,
    team_x: Vec<PlayerRef>,
    team_y: Vec<PlayerRef>,
    imbalance: f64,
    priority: Option<f64>,
}

impl CandidateGame {
    /// Build a game and compute its imbalance, plus its priority when the
    /// scoring parameters carry a queue weight.
    pub fn new(
        anchor: PlayerRef,
        mut team_x: Vec<PlayerRef>,
        mut team_y: Vec<PlayerRef>,
        params: &ScoringParams,
    ) -> Self {
        debug_assert_eq!(team_x.len(), team_y.len());
        debug_assert!(team_x.iter().any(|p| p.id() == anchor.id()));
        debug_assert!(team_x.iter().all(|x| team_y.iter().all(|y| x.id() != y.id())));

        team_x.sort();
        team_y.sort();

        let imbalance = scoring::imbalance(
            &team_x,
            &team_y,
            params.p_norm,
            params.q_norm,
            params.fairness_weight,
        );
        let priority = params
            .queue_weight
            .map(|beta| scoring::priority(&team_x, &team_y, beta, imbalance));

        Self {
            anchor,
            team_x,
            team_y,
            imbalance,
            priority,
        }
    }

    pub fn anchor(&self) -> &PlayerRef {
        &self.anchor
    }

    pub fn anchor_id(&self) -> u64 {
        self.anchor.id()
    }

    pub fn team_x(&self) -> &[PlayerRef] {
        &self.team_x
    }

    pub fn team_y(&self) -> &[PlayerRef] {
        &self.team_y
    }

    pub fn imbalance(&self) -> f64 {
        self.imbalance
    }

    pub fn priority(&self) -> Option<f64> {
        self.priority
    }

    /// The value this game sorts by: priority when present, else imbalance.
    pub fn sort_score(&self) -> f64 {
        self.priority.unwrap_or(self.imbalance)
    }

    /// Strictly-less comparison under the game order: priority ascending
    /// when both games carry one, otherwise imbalance ascending.
    pub fn outranks(&self, other: &CandidateGame) -> bool {
        match (self.priority, other.priority) {
            (Some(a), Some(b)) => a < b,
            _ => self.imbalance < other.imbalance,
        }
    }

    /// All 2k players of the game, team X first.
    pub fn players(&self) -> impl Iterator<Item = &PlayerRef> {
        self.team_x.iter().chain(self.team_y.iter())
    }
}
