//! The match manager.
//!
//! [`MatchEngine`] owns the ordered pool, the candidate heap, and the match
//! list, and keeps them linked: after every public operation, each pool
//! player whose window can seat a full game has exactly one heap entry (its
//! window-optimal game), and nobody else has one. Mutations therefore do
//! three things: change the pool, recompute the best game of every affected
//! anchor, and reconcile the heap.
//!
//! The engine is single-threaded at the data-structure level. The `_async`
//! variants run one operation on one background worker thread; launching a
//! second while the first is live fails with `Busy`. There is no
//! mid-operation cancellation: an in-flight operation always runs to
//! completion.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use rand_distr::{Distribution, Normal};
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::engine::config::{EngineConfig, Parameters};
use crate::engine::partition::PartitionStrategy;
use crate::engine::search;
use crate::error::{Result, TeamForgeError};
use crate::game::CandidateGame;
use crate::heap::CandidateHeap;
use crate::player::{Player, PlayerRef};
use crate::pool::PlayerPool;
use crate::scoring::ScoringParams;
use crate::telemetry::{
    GameSnapshot, HeapAction, HeapSnapshot, PlayerSnapshot, QueueAction, QueueSnapshot, Recorder,
    StepEvent, StepObserver,
};

/// Metadata attached to one emitted step; snapshots are added by `record`.
#[derive(Default)]
struct StepMeta {
    queue_action: QueueAction,
    heap_action: HeapAction,
    target_player: Option<usize>,
    window: Option<(usize, usize)>,
    team_x: Option<Vec<usize>>,
    team_y: Option<Vec<usize>>,
    target_game: Option<usize>,
}

struct EngineCore {
    config: EngineConfig,
    scoring: ScoringParams,
    strategy: PartitionStrategy,
    clock: Clock,
    pool: PlayerPool,
    games: CandidateHeap,
    matches: Vec<CandidateGame>,
    next_player_id: u64,
    observer: Option<Arc<dyn StepObserver>>,
    operation: u64,
}

impl EngineCore {
    fn begin_operation(&mut self) {
        self.operation += 1;
    }

    fn mint_player(&mut self, skill: u32) -> PlayerRef {
        let id = self.next_player_id;
        self.next_player_id += 1;
        Arc::new(Player::new(id, skill, &self.clock))
    }

    // ----- observation ---------------------------------------------------

    fn record(&self, meta: StepMeta) {
        let Some(observer) = &self.observer else {
            return;
        };
        let event = StepEvent {
            operation: self.operation,
            queue: QueueSnapshot {
                state: self.pool.iter().map(|p| self.player_snapshot(p)).collect(),
                action: meta.queue_action,
                target_player: meta.target_player,
                window: meta.window,
                team_x: meta.team_x,
                team_y: meta.team_y,
            },
            heap: HeapSnapshot {
                state: self
                    .games
                    .as_slice()
                    .iter()
                    .map(|g| self.game_snapshot(g))
                    .collect(),
                action: meta.heap_action,
                target_game: meta.target_game,
            },
            matches: self.matches.iter().map(|g| self.game_snapshot(g)).collect(),
        };
        observer.record_event(event);
    }

    fn player_snapshot(&self, player: &PlayerRef) -> PlayerSnapshot {
        PlayerSnapshot {
            id: player.id(),
            skill: player.skill(),
            enqueue_time: player.enqueue_time(),
            wait_time: player.wait_time(&self.clock),
        }
    }

    fn game_snapshot(&self, game: &CandidateGame) -> GameSnapshot {
        GameSnapshot {
            anchor_id: game.anchor_id(),
            team_x: game.team_x().iter().map(|p| self.player_snapshot(p)).collect(),
            team_y: game.team_y().iter().map(|p| self.player_snapshot(p)).collect(),
            imbalance: game.imbalance(),
            priority: game.priority(),
        }
    }

    fn team_ranks(&self, team: &[PlayerRef]) -> Result<Vec<usize>> {
        team.iter().map(|p| self.pool.rank(p)).collect()
    }

    // ----- anchor maintenance --------------------------------------------

    /// Best game anchored at `player`, or None when the player is outside
    /// the pool or its window cannot seat 2k−1 others.
    fn best_anchored_game(&self, player: &PlayerRef) -> Result<Option<CandidateGame>> {
        if !self.pool.contains(player) {
            return Ok(None);
        }
        let rank = self.pool.rank(player)?;
        let window_start = rank + 1;
        let window_end = (window_start + self.config.skill_window()).min(self.pool.len());
        self.record(StepMeta {
            queue_action: QueueAction::Anchor,
            target_player: Some(rank),
            window: Some((window_start, window_end)),
            ..Default::default()
        });

        let window = self.pool.slice(window_start, window_end)?;
        let outcome = search::best_window_game(
            player,
            &window,
            self.config.team_size,
            self.strategy,
            &self.scoring,
            self.config.search_budget,
        );
        Ok(outcome.best)
    }

    /// Push an anchor's freshly computed best game into the heap.
    fn publish_game(&mut self, anchor: &PlayerRef, game: CandidateGame) -> Result<()> {
        if self.observer.is_some() {
            let team_x = self.team_ranks(game.team_x())?;
            let team_y = self.team_ranks(game.team_y())?;
            self.record(StepMeta {
                queue_action: QueueAction::GameFound,
                team_x: Some(team_x),
                team_y: Some(team_y),
                ..Default::default()
            });
        }
        self.games.push(game);
        self.record(StepMeta {
            heap_action: HeapAction::Insert,
            target_game: self.games.index_of(anchor.id()),
            ..Default::default()
        });
        Ok(())
    }

    /// Recompute one affected anchor: replace its heap entry with the new
    /// best game, or drop the entry when no game remains reachable.
    fn refresh_anchor(&mut self, player: &PlayerRef) -> Result<()> {
        match self.best_anchored_game(player)? {
            Some(game) => self.publish_game(player, game)?,
            None => {
                if self.games.contains(player.id()) {
                    self.record(StepMeta {
                        queue_action: QueueAction::GameNotFound,
                        heap_action: HeapAction::Remove,
                        target_game: self.games.index_of(player.id()),
                        ..Default::default()
                    });
                    self.games.remove(player.id());
                }
            }
        }
        Ok(())
    }

    /// Recompute a set of affected anchors in pool order.
    fn refresh_anchors(&mut self, affected: HashSet<PlayerRef>) -> Result<()> {
        let mut ordered: Vec<PlayerRef> = affected.into_iter().collect();
        ordered.sort();
        for player in &ordered {
            self.refresh_anchor(player)?;
        }
        Ok(())
    }

    /// Players whose windows may reach rank `rank`: the W ranks directly
    /// below it.
    fn affected_below(&self, rank: usize) -> Result<HashSet<PlayerRef>> {
        let window = self.config.skill_window();
        Ok(self
            .pool
            .slice(rank.saturating_sub(window), rank)?
            .into_iter()
            .collect())
    }

    // ----- mutations ------------------------------------------------------

    fn insert_player(&mut self, player: PlayerRef, bulk: bool) -> Result<HashSet<PlayerRef>> {
        self.pool.add(player.clone());
        let rank = self.pool.rank(&player)?;
        self.record(StepMeta {
            queue_action: QueueAction::Insert,
            target_player: Some(rank),
            ..Default::default()
        });
        let affected = self.affected_below(rank)?;

        if !bulk {
            match self.best_anchored_game(&player)? {
                Some(game) => self.publish_game(&player, game)?,
                None => self.record(StepMeta {
                    queue_action: QueueAction::GameNotFound,
                    ..Default::default()
                }),
            }
            self.refresh_anchors(affected.clone())?;
        }
        Ok(affected)
    }

    fn remove_player(&mut self, player: &PlayerRef, bulk: bool) -> Result<HashSet<PlayerRef>> {
        let rank = self.pool.rank(player)?;
        let affected = self.affected_below(rank)?;
        self.record(StepMeta {
            queue_action: QueueAction::Remove,
            target_player: Some(rank),
            ..Default::default()
        });
        self.pool.remove(player)?;
        player.mark_exited(&self.clock);

        if !bulk {
            if self.games.contains(player.id()) {
                self.record(StepMeta {
                    heap_action: HeapAction::Remove,
                    target_game: self.games.index_of(player.id()),
                    ..Default::default()
                });
                self.games.remove(player.id());
            } else {
                self.record(StepMeta::default());
            }
            self.refresh_anchors(affected.clone())?;
        }
        Ok(affected)
    }

    /// Remove a batch of players, deferring anchor recomputation until all
    /// of them are out. The affected set starts as the batch itself so the
    /// refresh pass also clears the removed players' stale heap entries.
    fn remove_players(&mut self, players: HashSet<PlayerRef>) -> Result<()> {
        let mut affected = players.clone();
        let mut ordered: Vec<PlayerRef> = players.into_iter().collect();
        ordered.sort();
        for player in &ordered {
            info!(player = player.id(), "removing player from the queue");
            affected.extend(self.remove_player(player, true)?);
        }
        self.refresh_anchors(affected)
    }

    // ----- public operations ---------------------------------------------

    fn insert_manual(&mut self, skill: u32) -> Result<PlayerRef> {
        self.begin_operation();
        let player = self.mint_player(skill);
        info!(player = player.id(), skill, "adding player to the queue");
        self.insert_player(player.clone(), false)?;
        Ok(player)
    }

    fn insert_many(&mut self, skills: &[u32]) -> Result<Vec<PlayerRef>> {
        self.begin_operation();
        let mut players = Vec::with_capacity(skills.len());
        for &skill in skills {
            players.push(self.mint_player(skill));
        }

        let mut affected: HashSet<PlayerRef> = players.iter().cloned().collect();
        for player in &players {
            info!(player = player.id(), skill = player.skill(), "adding player to the queue");
            affected.extend(self.insert_player(player.clone(), true)?);
        }
        self.refresh_anchors(affected)?;
        Ok(players)
    }

    fn insert_bulk(&mut self, count: usize, mean: f64, std_dev: f64) -> Result<Vec<PlayerRef>> {
        let normal = Normal::new(mean, std_dev).map_err(|_| TeamForgeError::InvalidConfig {
            name: "std_dev",
            value: std_dev,
            requirement: "a finite, non-negative standard deviation",
        })?;
        let mut rng = rand::thread_rng();
        let skills: Vec<u32> = (0..count)
            .map(|_| normal.sample(&mut rng).round().max(0.0) as u32)
            .collect();
        self.insert_many(&skills)
    }

    fn remove(&mut self, player: &PlayerRef) -> Result<()> {
        self.begin_operation();
        info!(player = player.id(), "removing player from the queue");
        self.remove_player(player, false)?;
        Ok(())
    }

    fn create_match(&mut self) -> Result<Option<CandidateGame>> {
        self.begin_operation();
        let Some(game) = self.games.peek().cloned() else {
            self.record(StepMeta {
                queue_action: QueueAction::GameNotFound,
                ..Default::default()
            });
            warn!("no candidate games available to create a match");
            self.record(StepMeta::default());
            return Ok(None);
        };

        self.record(StepMeta {
            heap_action: HeapAction::Create,
            target_game: Some(0),
            ..Default::default()
        });
        self.matches.push(game.clone());
        info!(
            anchor = game.anchor_id(),
            imbalance = game.imbalance(),
            "created match"
        );

        let players: HashSet<PlayerRef> = game.players().cloned().collect();
        self.remove_players(players)?;
        self.record(StepMeta::default());
        info!(heap_size = self.games.len(), "heap size after match creation");
        Ok(Some(game))
    }
}

/// The public face of the engine.
///
/// All synchronous operations run to completion atomically from the
/// caller's perspective; the core sits behind a mutex solely so that the
/// single background worker of the `_async` variants can share it.
pub struct MatchEngine {
    core: Arc<Mutex<EngineCore>>,
    recorder: Option<Arc<Recorder>>,
    worker: Option<JoinHandle<()>>,
}

impl MatchEngine {
    /// Engine ranking games by imbalance alone.
    pub fn new_unrestricted(
        team_size: usize,
        p_norm: f64,
        q_norm: f64,
        fairness_weight: f64,
        recording: bool,
        approximate: bool,
    ) -> Result<Self> {
        Self::from_config(EngineConfig {
            team_size,
            p_norm,
            q_norm,
            fairness_weight,
            recording,
            approximate,
            ..EngineConfig::unrestricted()
        })
    }

    /// Engine ranking games by priority: imbalance plus `queue_weight`
    /// times the oldest player's enqueue time.
    pub fn new_time_sensitive(
        team_size: usize,
        p_norm: f64,
        q_norm: f64,
        fairness_weight: f64,
        queue_weight: f64,
        recording: bool,
        approximate: bool,
    ) -> Result<Self> {
        Self::from_config(EngineConfig {
            team_size,
            p_norm,
            q_norm,
            fairness_weight,
            queue_weight: Some(queue_weight),
            recording,
            approximate,
            ..EngineConfig::default()
        })
    }

    pub fn from_config(config: EngineConfig) -> Result<Self> {
        Self::with_clock(config, Clock::monotonic())
    }

    /// Build an engine on an injected clock; tests pass [`Clock::manual`]
    /// to make enqueue and wait times deterministic.
    pub fn with_clock(config: EngineConfig, clock: Clock) -> Result<Self> {
        config.validate()?;
        clock.reset();

        let recorder = config.recording.then(|| Arc::new(Recorder::new()));
        let observer = recorder
            .clone()
            .map(|recorder| recorder as Arc<dyn StepObserver>);
        let strategy = if config.approximate {
            PartitionStrategy::Greedy
        } else {
            PartitionStrategy::Exact
        };

        let core = EngineCore {
            scoring: config.scoring(),
            strategy,
            clock,
            pool: PlayerPool::new(),
            games: CandidateHeap::new(),
            matches: Vec::new(),
            next_player_id: 0,
            observer,
            operation: 0,
            config,
        };
        info!(
            team_size = core.config.team_size,
            p_norm = core.config.p_norm,
            q_norm = core.config.q_norm,
            fairness_weight = core.config.fairness_weight,
            skill_window = core.config.skill_window(),
            "created match engine"
        );
        core.record(StepMeta::default());

        Ok(Self {
            core: Arc::new(Mutex::new(core)),
            recorder,
            worker: None,
        })
    }

    fn core(&self) -> MutexGuard<'_, EngineCore> {
        self.core.lock().unwrap()
    }

    // ----- synchronous operations ----------------------------------------

    /// Mint a player with the next id and the given skill, insert it, and
    /// bring the heap back to consistency before returning.
    pub fn insert_manual(&self, skill: u32) -> Result<PlayerRef> {
        self.core().insert_manual(skill)
    }

    /// Insert `count` players with skills drawn from a Gaussian (clamped to
    /// ≥ 0 and rounded), deferring anchor recomputation to a single pass.
    pub fn insert_bulk(&self, count: usize, mean: f64, std_dev: f64) -> Result<Vec<PlayerRef>> {
        self.core().insert_bulk(count, mean, std_dev)
    }

    /// Insert players with the given skills under the bulk protocol. The
    /// final pool, heap, and match list are identical to inserting them
    /// one at a time.
    pub fn insert_many(&self, skills: &[u32]) -> Result<Vec<PlayerRef>> {
        self.core().insert_many(skills)
    }

    /// Remove a specific player (exposed primarily for tests; match
    /// creation removes players itself).
    pub fn remove(&self, player: &PlayerRef) -> Result<()> {
        self.core().remove(player)
    }

    /// Finalize the best candidate game: append it to the match list and
    /// remove its players from the pool, cascading anchor updates. Returns
    /// None (and changes nothing) when no candidate game exists.
    pub fn create_match(&self) -> Result<Option<CandidateGame>> {
        self.core().create_match()
    }

    // ----- asynchronous operations ---------------------------------------

    /// Whether the background worker is still running an operation.
    pub fn is_executing_async(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// Block until the current background operation (if any) completes.
    pub fn wait_for_async(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                panic!("asynchronous worker panicked");
            }
        }
    }

    pub fn insert_manual_async(&mut self, skill: u32) -> Result<()> {
        self.spawn(move |core| {
            if let Err(error) = core.insert_manual(skill) {
                error!(%error, "asynchronous insert failed");
            }
        })
    }

    pub fn insert_bulk_async(&mut self, count: usize, mean: f64, std_dev: f64) -> Result<()> {
        self.spawn(move |core| {
            if let Err(error) = core.insert_bulk(count, mean, std_dev) {
                error!(%error, "asynchronous bulk insert failed");
            }
        })
    }

    pub fn create_match_async(&mut self) -> Result<()> {
        self.spawn(move |core| {
            if let Err(error) = core.create_match() {
                error!(%error, "asynchronous match creation failed");
            }
        })
    }

    /// Launch the single background worker. At most one may be live; a
    /// second launch fails with `Busy`.
    fn spawn<F>(&mut self, job: F) -> Result<()>
    where
        F: FnOnce(&mut EngineCore) + Send + 'static,
    {
        if self.is_executing_async() {
            return Err(TeamForgeError::Busy);
        }
        let core = Arc::clone(&self.core);
        self.worker = Some(thread::spawn(move || {
            let mut core = core.lock().unwrap();
            job(&mut core);
        }));
        Ok(())
    }

    // ----- inspection -----------------------------------------------------

    /// The engine's effective parameters.
    pub fn get_parameters(&self) -> Parameters {
        let core = self.core();
        Parameters {
            team_size: core.config.team_size,
            p_norm: core.config.p_norm,
            q_norm: core.config.q_norm,
            fairness_weight: core.config.fairness_weight,
            skill_window: core.config.skill_window(),
            queue_weight: core.config.queue_weight,
        }
    }

    /// Players currently waiting, in pool order.
    pub fn players(&self) -> Vec<PlayerRef> {
        self.core().pool.iter().cloned().collect()
    }

    pub fn pool_len(&self) -> usize {
        self.core().pool.len()
    }

    pub fn heap_len(&self) -> usize {
        self.core().games.len()
    }

    /// The candidate heap in array order.
    pub fn heap_games(&self) -> Vec<CandidateGame> {
        self.core().games.as_slice().to_vec()
    }

    /// Heap index of the game anchored at `anchor_id`, for observers.
    pub fn heap_rank(&self, anchor_id: u64) -> Option<usize> {
        self.core().games.index_of(anchor_id)
    }

    /// The current best candidate game without finalizing it.
    pub fn peek_best(&self) -> Option<CandidateGame> {
        self.core().games.peek().cloned()
    }

    /// Matches finalized so far.
    pub fn matches(&self) -> Vec<CandidateGame> {
        self.core().matches.clone()
    }

    /// The built-in recorder, when the engine was configured with
    /// `recording: true`.
    pub fn recorder(&self) -> Option<Arc<Recorder>> {
        self.recorder.clone()
    }

    /// Replace the step observer. Note that the built-in recorder stops
    /// receiving events once replaced.
    pub fn set_observer(&self, observer: Arc<dyn StepObserver>) {
        let mut core = self.core();
        core.observer = Some(observer);
    }
}
