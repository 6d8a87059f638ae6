use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TeamForgeError};
use crate::scoring::ScoringParams;

/// Soft wall-clock budget for a single anchor search. Exhausting it returns
/// the best game found so far rather than an error.
pub const EXECUTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine configuration. Defaults describe a 2v2 queue scored with 1-norms,
/// a light fairness weight, and the exact partition solver.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Players per team (k), between 1 and 5.
    pub team_size: usize,
    /// Fairness norm p, ≥ 1 (may be `f64::INFINITY`).
    pub p_norm: f64,
    /// Uniformity norm q, ≥ 1 (may be `f64::INFINITY`).
    pub q_norm: f64,
    /// Fairness weight α, > 0.
    pub fairness_weight: f64,
    /// Queue weight β, ≥ 0. Present iff the engine is time-sensitive.
    pub queue_weight: Option<f64>,
    /// Install the built-in step recorder.
    pub recording: bool,
    /// Use the greedy partition solver instead of brute force.
    pub approximate: bool,
    /// Per-anchor-search wall-clock budget.
    pub search_budget: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            team_size: 2,
            p_norm: 1.0,
            q_norm: 1.0,
            fairness_weight: 0.1,
            queue_weight: None,
            recording: false,
            approximate: false,
            search_budget: EXECUTION_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Configuration for an engine that ranks games by imbalance alone.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Configuration for a time-sensitive engine that ranks games by
    /// priority (imbalance plus weighted oldest enqueue time).
    pub fn time_sensitive(queue_weight: f64) -> Self {
        Self {
            queue_weight: Some(queue_weight),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check(
            (1..=5).contains(&self.team_size),
            "team_size",
            self.team_size as f64,
            "between 1 and 5",
        )?;
        check(
            self.p_norm >= 1.0,
            "p_norm",
            self.p_norm,
            "greater than or equal to 1.0",
        )?;
        check(
            self.q_norm >= 1.0,
            "q_norm",
            self.q_norm,
            "greater than or equal to 1.0",
        )?;
        check(
            self.fairness_weight > 0.0,
            "fairness_weight",
            self.fairness_weight,
            "greater than 0.0",
        )?;
        if let Some(queue_weight) = self.queue_weight {
            check(
                queue_weight >= 0.0,
                "queue_weight",
                queue_weight,
                "greater than or equal to 0.0",
            )?;
        }
        Ok(())
    }

    /// Width W of the rank window searched above an anchor:
    /// `⌈4·(1+α)·k^(1+1/q)⌉`.
    pub fn skill_window(&self) -> usize {
        let exponent = 1.0 + 1.0 / self.q_norm;
        (4.0 * (1.0 + self.fairness_weight) * (self.team_size as f64).powf(exponent)).ceil()
            as usize
    }

    /// Windowed players needed before an anchor can produce a game: 2k − 1.
    pub fn required_players(&self) -> usize {
        2 * self.team_size - 1
    }

    pub(crate) fn scoring(&self) -> ScoringParams {
        ScoringParams {
            p_norm: self.p_norm,
            q_norm: self.q_norm,
            fairness_weight: self.fairness_weight,
            queue_weight: self.queue_weight,
        }
    }
}

fn check(ok: bool, name: &'static str, value: f64, requirement: &'static str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(TeamForgeError::InvalidConfig {
            name,
            value,
            requirement,
        })
    }
}

/// The effective parameters of a running engine, as reported to frontends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub team_size: usize,
    pub p_norm: f64,
    pub q_norm: f64,
    pub fairness_weight: f64,
    pub skill_window: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_weight: Option<f64>,
}
