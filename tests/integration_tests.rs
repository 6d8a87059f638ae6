//! Integration tests for the teamforge engine.
//!
//! These exercise the full insert/remove/create-match protocols and the
//! invariant linking the ordered pool to the candidate game heap.

use std::collections::HashSet;
use std::time::Duration;

use teamforge::prelude::*;
use teamforge::scoring;

/// Default engine (2v2, p = q = 1, α = 0.1, exact solver) on a manual clock.
fn engine() -> MatchEngine {
    MatchEngine::with_clock(EngineConfig::default(), Clock::manual()).unwrap()
}

/// After any public operation: every pool player with at least 2k−1 players
/// in its window anchors exactly one heap entry, nobody else anchors any,
/// the heap array satisfies the min-heap property, and the anchor index is
/// consistent with the array.
fn assert_engine_invariants(engine: &MatchEngine) {
    let params = engine.get_parameters();
    let players = engine.players();
    let games = engine.heap_games();
    let required = 2 * params.team_size - 1;

    let n = players.len();
    for (rank, player) in players.iter().enumerate() {
        let above = (n - rank - 1).min(params.skill_window);
        assert_eq!(
            engine.heap_rank(player.id()).is_some(),
            above >= required,
            "heap membership wrong for player {} at rank {}",
            player.id(),
            rank
        );
    }

    let mut anchors = HashSet::new();
    for (slot, game) in games.iter().enumerate() {
        assert_eq!(engine.heap_rank(game.anchor_id()), Some(slot));
        assert!(anchors.insert(game.anchor_id()), "duplicate anchor in heap");
        if slot > 0 {
            let parent = &games[(slot - 1) / 2];
            assert!(!game.outranks(parent), "heap order violated at slot {slot}");
        }
    }

    // Pool traversal is strictly ascending under (skill, id).
    for pair in players.windows(2) {
        assert!((pair[0].skill(), pair[0].id()) < (pair[1].skill(), pair[1].id()));
    }
}

#[test]
fn scenario_minimal_match() -> Result<()> {
    let engine = engine();
    for skill in [1000, 1010, 1020, 1030] {
        engine.insert_manual(skill)?;
        assert_engine_invariants(&engine);
    }

    let root = engine.peek_best().expect("four players admit a game");
    assert_eq!(root.anchor_id(), 0);
    let team_x: Vec<u64> = root.team_x().iter().map(|p| p.id()).collect();
    let team_y: Vec<u64> = root.team_y().iter().map(|p| p.id()).collect();
    assert_eq!(team_x, vec![0, 3]);
    assert_eq!(team_y, vec![1, 2]);
    // d_1 = 0 for this split; the mean-absolute-deviation spread is 10.
    assert!((root.imbalance() - 10.0).abs() < 1e-12);
    assert_eq!(root.priority(), None);

    let game = engine.create_match()?.expect("root game is finalized");
    assert_eq!(game.anchor_id(), 0);
    assert_eq!(engine.pool_len(), 0);
    assert_eq!(engine.heap_len(), 0);
    assert_eq!(engine.matches().len(), 1);
    assert_engine_invariants(&engine);

    // Finalized match shape: k per team, disjoint, anchor on team X.
    assert_eq!(game.team_x().len(), 2);
    assert_eq!(game.team_y().len(), 2);
    let x_ids: HashSet<u64> = game.team_x().iter().map(|p| p.id()).collect();
    let y_ids: HashSet<u64> = game.team_y().iter().map(|p| p.id()).collect();
    assert!(x_ids.is_disjoint(&y_ids));
    assert!(x_ids.contains(&game.anchor_id()));
    Ok(())
}

#[test]
fn scenario_window_is_a_rank_window() -> Result<()> {
    // The window is counted in ranks, not skill distance: a wild outlier
    // still sits inside the anchor's window.
    for outlier in [100u32, 10_000] {
        let engine = engine();
        engine.insert_many(&[0, 1, 2, outlier])?;

        assert_eq!(engine.heap_len(), 1);
        let root = engine.peek_best().expect("anchor 0 fills its window");
        assert_eq!(root.anchor_id(), 0);
        assert!(root.players().any(|p| p.skill() == outlier));
        assert_engine_invariants(&engine);
    }
    Ok(())
}

#[test]
fn scenario_heap_updates_in_place() -> Result<()> {
    let engine = engine();
    for skill in [1000, 1010, 1020, 1030] {
        engine.insert_manual(skill)?;
    }
    assert_eq!(engine.heap_len(), 1);
    assert!((engine.peek_best().unwrap().imbalance() - 10.0).abs() < 1e-12);

    // A new player between the anchor and its old teammates gives anchor 0
    // a strictly better game, replacing its entry rather than adding one.
    engine.insert_manual(1005)?;
    assert_eq!(engine.heap_len(), 2);
    assert!(engine.heap_rank(0).is_some());
    assert!(engine.heap_rank(4).is_some());

    let games = engine.heap_games();
    let anchor_zero = games.iter().find(|g| g.anchor_id() == 0).unwrap();
    assert!((anchor_zero.imbalance() - 6.75).abs() < 1e-12);
    assert_engine_invariants(&engine);
    Ok(())
}

#[test]
fn scenario_time_sensitive_root_prefers_old_players() {
    // Two 1v1 games, α = 0.5 so imbalance equals the skill gap: game A has
    // the worse gap (5 vs 3) but holds a player enqueued at t = 0, so its
    // priority 5 beats B's 3 + 0.1·100 = 13.
    let clock = Clock::manual();
    let params = ScoringParams {
        p_norm: 1.0,
        q_norm: 1.0,
        fairness_weight: 0.5,
        queue_weight: Some(0.1),
    };
    let old = Arc::new(Player::new(0, 10, &clock));
    let old_foe = Arc::new(Player::new(1, 5, &clock));
    clock.advance(100.0);
    let fresh = Arc::new(Player::new(2, 3, &clock));
    let fresh_foe = Arc::new(Player::new(3, 0, &clock));

    let a = CandidateGame::new(old.clone(), vec![old], vec![old_foe], &params);
    let b = CandidateGame::new(fresh.clone(), vec![fresh], vec![fresh_foe], &params);
    assert_eq!(a.priority(), Some(5.0));
    assert_eq!(b.priority(), Some(13.0));

    let mut heap = CandidateHeap::new();
    heap.push(b);
    heap.push(a);
    assert_eq!(heap.peek().map(|g| g.anchor_id()), Some(0));
}

#[test]
fn time_sensitive_engine_scores_games_with_priority() -> Result<()> {
    let clock = Clock::manual();
    let engine = MatchEngine::with_clock(EngineConfig::time_sensitive(0.1), clock.clone())?;

    engine.insert_manual(1000)?;
    clock.advance(100.0);
    for skill in [1010, 1020, 1030] {
        engine.insert_manual(skill)?;
    }

    // The root game contains the t = 0 player, so β·min enqueue adds zero.
    let root = engine.peek_best().expect("four players admit a game");
    assert_eq!(root.priority(), Some(root.imbalance()));
    assert!((root.imbalance() - 10.0).abs() < 1e-12);

    let params = engine.get_parameters();
    assert_eq!(params.queue_weight, Some(0.1));
    Ok(())
}

#[test]
fn scenario_exact_never_loses_to_greedy() -> Result<()> {
    let skills = [40u32, 45, 47, 52, 60, 71, 77, 85, 96, 99, 103, 111];

    let exact = engine();
    exact.insert_many(&skills)?;
    let greedy = MatchEngine::with_clock(
        EngineConfig {
            approximate: true,
            ..EngineConfig::default()
        },
        Clock::manual(),
    )?;
    greedy.insert_many(&skills)?;

    // Per anchor, exact ≤ greedy; taking minima over anchors preserves ≤.
    let exact_root = exact.peek_best().expect("window admits games");
    let greedy_root = greedy.peek_best().expect("window admits games");
    assert!(exact_root.imbalance() <= greedy_root.imbalance());
    assert_engine_invariants(&exact);
    assert_engine_invariants(&greedy);
    Ok(())
}

#[test]
fn scenario_create_match_on_empty_heap_is_a_no_op() -> Result<()> {
    let engine = engine();
    engine.insert_manual(1000)?;
    engine.insert_manual(1010)?;
    assert_eq!(engine.heap_len(), 0);

    assert!(engine.create_match()?.is_none());
    assert_eq!(engine.pool_len(), 2);
    assert_eq!(engine.matches().len(), 0);
    assert_engine_invariants(&engine);
    Ok(())
}

#[test]
fn boundary_small_pools_produce_no_games() -> Result<()> {
    let engine = engine();
    engine.insert_manual(1000)?;
    assert_eq!(engine.pool_len(), 1);
    assert_eq!(engine.heap_len(), 0);

    engine.insert_manual(990)?;
    engine.insert_manual(1010)?;
    assert_eq!(engine.pool_len(), 3);
    assert_eq!(engine.heap_len(), 0);
    assert_engine_invariants(&engine);
    Ok(())
}

#[test]
fn boundary_exactly_two_teams_anchor_at_the_bottom() -> Result<()> {
    let engine = engine();
    engine.insert_many(&[1200, 1100, 1300, 1000])?;

    assert_eq!(engine.heap_len(), 1);
    let root = engine.peek_best().unwrap();
    assert_eq!(root.anchor().skill(), 1000);
    assert_engine_invariants(&engine);
    Ok(())
}

#[test]
fn removing_a_player_outside_any_game_leaves_the_heap_unchanged() -> Result<()> {
    let engine = engine();
    let players = engine.insert_many(&[1000, 1010, 1020])?;
    assert_eq!(engine.heap_len(), 0);

    engine.remove(&players[1])?;
    assert_eq!(engine.heap_len(), 0);
    assert_eq!(engine.pool_len(), 2);
    assert_engine_invariants(&engine);
    Ok(())
}

#[test]
fn removal_cascades_into_the_heap() -> Result<()> {
    let engine = engine();
    let players = engine.insert_many(&[1000, 1010, 1020, 1030, 1040])?;
    assert_eq!(engine.heap_len(), 2);

    // Dropping the top player shrinks the second anchor's window below
    // 2k−1, so its entry must disappear.
    engine.remove(&players[4])?;
    assert_eq!(engine.heap_len(), 1);
    assert!(engine.heap_rank(0).is_some());
    assert_engine_invariants(&engine);

    // Removed players are detached, not destroyed.
    assert!(players[4].dequeue_time().is_some());
    Ok(())
}

#[test]
fn bulk_insert_matches_sequential_inserts() -> Result<()> {
    let skills = [1500u32, 1480, 1520, 1490, 1510, 1530, 1470, 1500, 1485, 1515];

    let bulk = engine();
    bulk.insert_many(&skills)?;
    let sequential = engine();
    for &skill in &skills {
        sequential.insert_manual(skill)?;
    }

    let bulk_pool: Vec<(u32, u64)> = bulk.players().iter().map(|p| (p.skill(), p.id())).collect();
    let seq_pool: Vec<(u32, u64)> = sequential
        .players()
        .iter()
        .map(|p| (p.skill(), p.id()))
        .collect();
    assert_eq!(bulk_pool, seq_pool);

    // Heap array orders may differ; the anchored games must not.
    let games = |engine: &MatchEngine| -> HashSet<(u64, u64)> {
        engine
            .heap_games()
            .iter()
            .map(|g| (g.anchor_id(), g.sort_score().to_bits()))
            .collect()
    };
    assert_eq!(games(&bulk), games(&sequential));
    assert_engine_invariants(&bulk);
    assert_engine_invariants(&sequential);
    Ok(())
}

#[test]
fn draining_the_pool_through_matches_keeps_invariants() -> Result<()> {
    let engine = engine();
    engine.insert_many(&[
        1000, 1005, 1010, 1015, 1020, 1025, 1030, 1035, 1040, 1045, 1050, 1055,
    ])?;
    assert_engine_invariants(&engine);

    let mut created = 0;
    while engine.create_match()?.is_some() {
        created += 1;
        assert_engine_invariants(&engine);
    }
    assert_eq!(created, 3);
    assert_eq!(engine.matches().len(), 3);
    assert_eq!(engine.pool_len(), 0);

    let matched: HashSet<u64> = engine
        .matches()
        .iter()
        .flat_map(|g| g.players().map(|p| p.id()).collect::<Vec<_>>())
        .collect();
    assert_eq!(matched.len(), 12);
    Ok(())
}

#[test]
fn scoring_is_idempotent_on_frozen_games() -> Result<()> {
    let engine = engine();
    engine.insert_many(&[980, 1000, 1017, 1033, 1051])?;

    for game in engine.heap_games() {
        let recomputed = scoring::imbalance(game.team_x(), game.team_y(), 1.0, 1.0, 0.1);
        assert_eq!(recomputed, game.imbalance());
    }
    Ok(())
}

#[test]
fn wait_times_freeze_when_players_are_matched() -> Result<()> {
    let clock = Clock::manual();
    let engine = MatchEngine::with_clock(EngineConfig::default(), clock.clone())?;
    engine.insert_many(&[1000, 1010, 1020, 1030])?;

    clock.advance(50.0);
    let game = engine.create_match()?.expect("four players admit a match");
    clock.advance(100.0);

    for player in game.players() {
        assert_eq!(player.dequeue_time(), Some(50.0));
        assert_eq!(player.wait_time(&clock), 50.0);
    }
    Ok(())
}

#[test]
fn invalid_configurations_are_rejected() {
    assert!(matches!(
        MatchEngine::new_unrestricted(0, 1.0, 1.0, 0.1, false, false),
        Err(TeamForgeError::InvalidConfig { .. })
    ));
    assert!(matches!(
        MatchEngine::new_unrestricted(2, 0.5, 1.0, 0.1, false, false),
        Err(TeamForgeError::InvalidConfig { .. })
    ));
    assert!(matches!(
        MatchEngine::new_time_sensitive(2, 1.0, 1.0, 0.1, -1.0, false, false),
        Err(TeamForgeError::InvalidConfig { .. })
    ));

    let engine = engine();
    assert!(matches!(
        engine.insert_bulk(5, 1500.0, -10.0),
        Err(TeamForgeError::InvalidConfig { .. })
    ));
}

#[test]
fn removing_an_unknown_player_fails() -> Result<()> {
    let engine = engine();
    let player = engine.insert_manual(1000)?;
    engine.remove(&player)?;

    assert!(matches!(
        engine.remove(&player),
        Err(TeamForgeError::PlayerNotFound(0))
    ));
    Ok(())
}

#[test]
fn gaussian_bulk_insert_fills_the_pool() -> Result<()> {
    let engine = engine();
    let players = engine.insert_bulk(25, 1500.0, 200.0)?;

    assert_eq!(players.len(), 25);
    assert_eq!(engine.pool_len(), 25);
    assert_engine_invariants(&engine);
    Ok(())
}

#[test]
fn empty_bulk_insert_is_a_no_op() -> Result<()> {
    let engine = engine();
    assert!(engine.insert_many(&[])?.is_empty());
    assert_eq!(engine.pool_len(), 0);
    Ok(())
}

#[test]
fn exhausted_search_budget_returns_without_games() -> Result<()> {
    let engine = MatchEngine::with_clock(
        EngineConfig {
            search_budget: Duration::ZERO,
            ..EngineConfig::default()
        },
        Clock::manual(),
    )?;
    engine.insert_many(&[1000, 1010, 1020, 1030])?;

    // Every search times out before its first subset; the pool fills but no
    // candidate game survives, and create_match stays a no-op.
    assert_eq!(engine.pool_len(), 4);
    assert_eq!(engine.heap_len(), 0);
    assert!(engine.create_match()?.is_none());
    Ok(())
}

#[test]
fn parameters_report_the_derived_window() -> Result<()> {
    let engine = engine();
    let params = engine.get_parameters();
    assert_eq!(params.team_size, 2);
    assert_eq!(params.skill_window, 18);
    assert_eq!(params.queue_weight, None);

    let json = serde_json::to_string(&params).unwrap();
    assert!(!json.contains("queue_weight"));
    Ok(())
}

#[test]
fn recorder_keeps_the_last_operation_and_running_stats() -> Result<()> {
    let engine = MatchEngine::with_clock(
        EngineConfig {
            recording: true,
            ..EngineConfig::default()
        },
        Clock::manual(),
    )?;
    let recorder = engine.recorder().expect("recording installs the recorder");

    engine.insert_manual(1000)?;
    let steps = recorder.steps();
    // Insert, anchor search, no game found.
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0].queue.action, QueueAction::Insert);
    assert_eq!(steps[0].queue.target_player, Some(0));
    assert_eq!(steps[1].queue.action, QueueAction::Anchor);
    assert_eq!(steps[1].queue.window, Some((1, 1)));
    assert_eq!(steps[2].queue.action, QueueAction::GameNotFound);

    for skill in [1010, 1020, 1030] {
        engine.insert_manual(skill)?;
    }
    // The buffer holds only the latest operation.
    let steps = recorder.steps();
    assert!(steps.iter().all(|s| s.operation == 4));
    assert!(steps
        .iter()
        .any(|s| s.heap.action == HeapAction::Insert && s.heap.target_game == Some(0)));

    engine.create_match()?;
    let steps = recorder.steps();
    assert!(steps
        .iter()
        .any(|s| s.heap.action == HeapAction::Create && s.heap.target_game == Some(0)));
    assert_eq!(steps.last().unwrap().matches.len(), 1);

    let stats = recorder.stats();
    assert_eq!(stats.queue_size.len(), stats.heap_size.len());
    assert!(stats.queue_size.iter().copied().max() == Some(4));
    assert!(!stats.min_imbalance.is_empty());

    let json = recorder.steps_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(parsed.is_array());
    Ok(())
}

#[test]
fn custom_observers_receive_events() -> Result<()> {
    use std::sync::Mutex;

    #[derive(Default)]
    struct Counter {
        events: Mutex<Vec<StepEvent>>,
    }
    impl StepObserver for Counter {
        fn record_event(&self, event: StepEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    let engine = engine();
    let counter = Arc::new(Counter::default());
    engine.set_observer(counter.clone());

    engine.insert_manual(1000)?;
    let events = counter.events.lock().unwrap();
    assert!(!events.is_empty());
    assert_eq!(events[0].queue.state.len(), 1);
    Ok(())
}

#[test]
fn async_operations_run_on_a_single_worker() -> Result<()> {
    let mut engine = engine();
    assert!(!engine.is_executing_async());

    engine.insert_bulk_async(40, 1500.0, 200.0)?;
    assert!(engine.is_executing_async());
    assert!(matches!(
        engine.create_match_async(),
        Err(TeamForgeError::Busy)
    ));

    engine.wait_for_async();
    assert!(!engine.is_executing_async());
    assert_eq!(engine.pool_len(), 40);

    engine.insert_manual_async(1500)?;
    engine.wait_for_async();
    assert_eq!(engine.pool_len(), 41);

    engine.create_match_async()?;
    engine.wait_for_async();
    assert_eq!(engine.matches().len(), 1);
    assert_eq!(engine.pool_len(), 37);
    assert_engine_invariants(&engine);
    Ok(())
}
