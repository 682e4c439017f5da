//! The per-tick progression kernel.
//!
//! One call to [`tick`] advances the whole simulation by `dt` seconds:
//! caravan combat, recalls, hideout promotion, crew dispatch, lazy segment
//! generation, and the upgrade scheduler, in that fixed order. The state
//! aggregate is the only thing mutated, so ticks are atomic and replayable
//! from a seed.

pub mod combat;
pub(crate) mod rewards;

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::constants::{
    HIDEOUT_CLEAR_REWARD, LEVELS_PER_SET, LEVELS_PER_ZONE, LOG_CREW_DISPATCHED,
    LOG_FRAGMENT_FOUND, LOG_HIDEOUT_CLEARED, LOG_HIDEOUT_SPAWNED, LOG_HIDEOUT_WAITING,
    LOG_PIECE_FOUND, LOG_RELIC_TIER_UP, LOG_ROAD_COMPLETE, LOG_RUNNER_READY,
    LOG_RUNNER_RECRUITED, LOG_RUNNER_WARPED, LOG_SQUAD_LEVEL_UP, LOG_ZONE_MAPPED,
    RECRUIT_PHANTOM_TASK_PER_LEVEL, SQUAD_RECALLS_PER_LEVEL_STEP, STARTING_DAMAGE_RATE,
    UPGRADE_SLOTS_PER_SQUAD_LEVELS,
};
use crate::construction::MappedOutcome;
use crate::engine::combat::{compute_barrier_health, level_in_zone, waves_for_level, zone_of};
use crate::engine::rewards::{apply_pass_through_bonuses, grant_level_rewards, RewardEvent};
use crate::map::MapSegment;
use crate::relics::{self, RelicType};
use crate::rng::RngBundle;
use crate::runner::{AgentKind, CombatContext, Runner, RunnerId, RunnerState};
use crate::state::EngineState;
use crate::upgrade::{UpgradeKind, UpgradeTask};

/// Counters describing what one tick did, for tests and the UI layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub waves_cleared: u32,
    pub levels_completed: u32,
    pub recalls: u32,
    pub hideouts_cleared: u32,
    pub roads_completed: u32,
    pub recruits: u32,
}

/// Advance the simulation by `dt` seconds.
pub fn tick(state: &mut EngineState, rng: &RngBundle, dt: f64) -> TickOutcome {
    let now = state.tick_count;
    let mut outcome = TickOutcome::default();
    let mut logs: Vec<&'static str> = Vec::new();

    state.ensure_segments(rng);
    resolve_combat(state, rng, dt, now, &mut outcome, &mut logs);
    resolve_recalls(state, now, &mut outcome, &mut logs);
    promote_hideouts(state, &mut logs);
    dispatch_crew(state, rng, now, &mut logs);
    state.ensure_segments(rng);
    service_upgrades(state, dt, &mut logs);

    for key in logs {
        state.push_log(key);
    }
    state.tick_count = now + 1;
    outcome
}

/// Cumulative recalls required to reach squad level `level`.
#[must_use]
pub fn squad_level_threshold(level: u32) -> u32 {
    // Sum of 10*i for i in 1..=level.
    SQUAD_RECALLS_PER_LEVEL_STEP * level * (level + 1) / 2
}

fn resolve_combat(
    state: &mut EngineState,
    rng: &RngBundle,
    dt: f64,
    now: u64,
    outcome: &mut TickOutcome,
    logs: &mut Vec<&'static str>,
) {
    let mut caravans: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (index, runner) in state.runners.iter().enumerate() {
        if runner.state == RunnerState::Running {
            caravans.entry(runner.global_level).or_default().push(index);
        }
    }

    let mut mapped_zones: Vec<u32> = Vec::new();
    let mut finished_crews: Vec<RunnerId> = Vec::new();

    for (&level, members) in &caravans {
        let runners_ahead: usize = caravans.range(level + 1..).map(|(_, group)| group.len()).sum();
        let zone = zone_of(level);
        let road_in_zone = state.construction.has_road(zone);
        let roads = state.construction.roads_at_or_beyond(zone);
        let hideout = state.construction.hideout_active(zone);
        let set_done = state.ledger.global_set_complete((level - 1) / LEVELS_PER_SET);

        // Crews lead their caravan; otherwise the highest style tier does,
        // with the lowest id breaking ties.
        let leader = members
            .iter()
            .copied()
            .max_by_key(|&index| {
                let runner = &state.runners[index];
                (
                    runner.kind.is_construction(),
                    runner.style_tier(),
                    Reverse(runner.id),
                )
            })
            .unwrap_or(members[0]);

        let wave = state.runners[leader].wave;
        let mut health = state.runners[leader].barrier_health;
        if health <= 0.0 {
            health = compute_barrier_health(level, wave, roads, hideout);
        }

        let ctx = CombatContext {
            caravan_size: members.len(),
            runners_ahead,
            set_complete: set_done,
            road_in_zone,
        };
        let damage: f64 = members
            .iter()
            .map(|&index| state.runners[index].effective_rate(&ctx))
            .sum::<f64>()
            * dt;
        health -= damage;

        if health > 0.0 {
            for &index in members {
                let runner = &mut state.runners[index];
                runner.wave = wave;
                runner.barrier_health = health;
            }
            continue;
        }

        outcome.waves_cleared += 1;
        let wave_count = waves_for_level(level, roads);
        if wave < wave_count {
            // Wave cleared, level continues.
            let next_health = compute_barrier_health(level, wave + 1, roads, hideout);
            for &index in members {
                let runner = &mut state.runners[index];
                runner.wave = wave + 1;
                runner.barrier_health = next_health;
            }
            continue;
        }

        // Level complete.
        outcome.levels_completed += 1;

        if level_in_zone(level) == LEVELS_PER_ZONE
            && hideout
            && state.construction.on_hideout_cleared(zone)
        {
            outcome.hideouts_cleared += 1;
            logs.push(LOG_HIDEOUT_CLEARED);
            for &index in members {
                let runner = &mut state.runners[index];
                if runner.kind.is_construction() {
                    continue;
                }
                runner.currency_collected += HIDEOUT_CLEAR_REWARD;
                if !road_in_zone {
                    runner.durability += HIDEOUT_CLEAR_REWARD;
                }
            }
        }

        let mut events: Vec<RewardEvent> = Vec::new();
        for &index in members {
            if state.runners[index].kind.is_construction() {
                continue;
            }
            grant_level_rewards(
                &mut state.runners[index],
                level,
                road_in_zone,
                &mut state.ledger,
                rng,
                &mut events,
            );
        }
        for event in events {
            match event {
                RewardEvent::PieceFound { .. } => logs.push(LOG_PIECE_FOUND),
                RewardEvent::FragmentFound { .. } => logs.push(LOG_FRAGMENT_FOUND),
                RewardEvent::ZoneMapped { zone } => {
                    logs.push(LOG_ZONE_MAPPED);
                    mapped_zones.push(zone);
                }
            }
        }

        // A crew completing the last level of its zone finishes the road
        // and leaves the map.
        if let AgentKind::Construction { target_zone } = state.runners[leader].kind
            && level == target_zone * LEVELS_PER_ZONE + LEVELS_PER_ZONE
        {
            state.construction.mark_road_built(target_zone, now);
            finished_crews.push(state.runners[leader].id);
            outcome.roads_completed += 1;
            logs.push(LOG_ROAD_COMPLETE);
        }

        let new_level = level + 1;
        let new_zone = zone_of(new_level);
        let new_health = compute_barrier_health(
            new_level,
            1,
            state.construction.roads_at_or_beyond(new_zone),
            state.construction.hideout_active(new_zone),
        );
        for &index in members {
            if finished_crews.contains(&state.runners[index].id) {
                continue;
            }
            {
                let runner = &mut state.runners[index];
                runner.global_level = new_level;
                runner.wave = 1;
                runner.barrier_health = new_health;
            }
            apply_pass_through_bonuses(&mut state.runners[index], &state.ledger);
            if new_level > 1 && new_level % LEVELS_PER_SET == 1 {
                advance_position(state, index);
            }
            state.highest_zone_reached = state.highest_zone_reached.max(new_zone);
        }
    }

    for zone in mapped_zones {
        let occupied = state.boss_level_occupied(zone);
        match state.construction.on_zone_mapped(zone, occupied) {
            MappedOutcome::HideoutSpawned => logs.push(LOG_HIDEOUT_SPAWNED),
            MappedOutcome::HideoutWaiting => logs.push(LOG_HIDEOUT_WAITING),
            MappedOutcome::AlreadyTracked => {}
        }
    }
    state
        .runners
        .retain(|runner| !finished_crews.contains(&runner.id));
}

/// One visual path step, crossing into the next segment when the current
/// one runs out.
fn advance_position(state: &mut EngineState, index: usize) {
    let segment_len = state
        .segments
        .get(state.runners[index].segment_index)
        .map_or(0, MapSegment::len);
    let runner = &mut state.runners[index];
    runner.step_in_segment += 1;
    if segment_len > 0 && runner.step_in_segment >= segment_len {
        runner.segment_index += 1;
        runner.step_in_segment = 0;
    }
    let (segment, step) = (runner.segment_index, runner.step_in_segment);
    state.note_step(segment, step);
}

fn resolve_recalls(
    state: &mut EngineState,
    now: u64,
    outcome: &mut TickOutcome,
    logs: &mut Vec<&'static str>,
) {
    for index in 0..state.runners.len() {
        let runner = &mut state.runners[index];
        if runner.state != RunnerState::Running || !runner.recall_due() {
            continue;
        }
        outcome.recalls += 1;
        state.total_recalls += 1;
        logs.push(LOG_RUNNER_WARPED);

        let runner = &mut state.runners[index];
        if runner.has_haul() {
            runner
                .upgrade_queue
                .push(UpgradeTask::new(UpgradeKind::Damage, runner.currency_collected));
            for ty in RelicType::ALL {
                let amount = runner.fragments_collected.get(&ty).copied().unwrap_or(0.0);
                if amount > 0.0 {
                    runner
                        .upgrade_queue
                        .push(UpgradeTask::new(UpgradeKind::Relic(ty), amount));
                }
            }
            runner.state = RunnerState::Queued;
            runner.queue_entered_at = now;
        } else {
            runner.state = RunnerState::Ready;
            logs.push(LOG_RUNNER_READY);
        }
        runner.currency_collected = 0.0;
        runner.fragments_collected.clear();
        runner.durability = 0.0;
    }

    while state.total_recalls >= squad_level_threshold(state.squad_level + 1) {
        state.squad_level += 1;
        outcome.recruits += 1;
        logs.push(LOG_SQUAD_LEVEL_UP);

        let id = state.next_runner_id;
        state.next_runner_id += 1;
        let mut recruit = Runner::new_player(id, format!("Runner {id}"), STARTING_DAMAGE_RATE);
        recruit.state = RunnerState::Queued;
        recruit.queue_entered_at = now;
        recruit.upgrade_queue.push(UpgradeTask::new(
            UpgradeKind::Damage,
            RECRUIT_PHANTOM_TASK_PER_LEVEL * f64::from(state.squad_level),
        ));
        state.runners.push(recruit);
        logs.push(LOG_RUNNER_RECRUITED);
    }
}

fn promote_hideouts(state: &mut EngineState, logs: &mut Vec<&'static str>) {
    let runners = &state.runners;
    let promoted = state.construction.promote_ready_hideouts(|zone| {
        let boss_level = zone * LEVELS_PER_ZONE + LEVELS_PER_ZONE;
        runners
            .iter()
            .any(|runner| runner.state == RunnerState::Running && runner.global_level == boss_level)
    });
    for _ in promoted {
        logs.push(LOG_HIDEOUT_SPAWNED);
    }
}

fn dispatch_crew(state: &mut EngineState, rng: &RngBundle, now: u64, logs: &mut Vec<&'static str>) {
    let crew_active = state
        .runners
        .iter()
        .any(|runner| runner.kind.is_construction());
    if crew_active {
        return;
    }
    let Some(target) = state.construction.next_dispatch_target(now) else {
        return;
    };
    let id = state.next_runner_id;
    state.next_runner_id += 1;
    let mut crew = Runner::new_construction(id, target);
    // The crew starts at its zone's tile, one tile per completed set.
    let tile = ((target * LEVELS_PER_ZONE) / LEVELS_PER_SET) as usize;
    let (segment, step) = state.locate_tile(rng, tile);
    crew.segment_index = segment;
    crew.step_in_segment = step;
    state.runners.push(crew);
    state.note_step(segment, step);
    logs.push(LOG_CREW_DISPATCHED);
}

fn service_upgrades(state: &mut EngineState, dt: f64, logs: &mut Vec<&'static str>) {
    let cap = (1 + state.squad_level / UPGRADE_SLOTS_PER_SQUAD_LEVELS) as usize;
    let mut upgrading = state
        .runners
        .iter()
        .filter(|runner| runner.state == RunnerState::Upgrading)
        .count();

    // Admit queued runners FIFO; ties go to the weaker runner.
    let mut queued: Vec<(u64, f64, RunnerId)> = state
        .runners
        .iter()
        .filter(|runner| runner.state == RunnerState::Queued)
        .map(|runner| (runner.queue_entered_at, runner.base_damage_rate, runner.id))
        .collect();
    queued.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)).then(a.2.cmp(&b.2)));
    for (_, _, id) in queued {
        if upgrading >= cap {
            break;
        }
        if let Some(runner) = state.runner_mut(id) {
            runner.state = RunnerState::Upgrading;
            upgrading += 1;
        }
    }

    for runner in &mut state.runners {
        if runner.state != RunnerState::Upgrading {
            continue;
        }
        for (kind, amount) in runner.upgrade_queue.advance(dt) {
            match kind {
                UpgradeKind::Damage => runner.base_damage_rate += amount,
                UpgradeKind::Relic(ty) => {
                    runner.fragment_bank.deposit(ty, amount);
                    let gained = relics::settle_tier_ups(
                        &mut runner.fragment_bank,
                        &mut runner.relic_tiers,
                        ty,
                    );
                    for _ in 0..gained {
                        logs.push(LOG_RELIC_TIER_UP);
                    }
                }
            }
        }
        if runner.upgrade_queue.is_drained() {
            runner.state = RunnerState::Ready;
            logs.push(LOG_RUNNER_READY);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squad_thresholds_are_triangular() {
        assert_eq!(squad_level_threshold(1), 10);
        assert_eq!(squad_level_threshold(2), 30);
        assert_eq!(squad_level_threshold(3), 60);
        assert_eq!(squad_level_threshold(4), 100);
    }

    #[test]
    fn caravan_of_three_identical_runners_deals_summed_damage() {
        let rng = RngBundle::from_user_seed(1);
        let mut state = EngineState::new();
        state.send_all_runners();
        // Park the caravan on a barrier big enough to survive the tick.
        for id in 1..=3u64 {
            state.runner_mut(id).unwrap().global_level = 55;
        }

        let before = compute_barrier_health(55, 1, 0, false);
        tick(&mut state, &rng, 1.0);
        let after = state.runner(1).unwrap().barrier_health;
        // Three runners at rate 10 each, no relics: exactly 30 damage.
        assert!((before - after - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn caravan_members_stay_synchronized() {
        let rng = RngBundle::from_user_seed(1);
        let mut state = EngineState::new();
        state.send_all_runners();
        for _ in 0..200 {
            tick(&mut state, &rng, 1.0);
            let progress: Vec<(u32, u32)> = state
                .runners
                .iter()
                .filter(|runner| runner.state == RunnerState::Running)
                .map(|runner| (runner.global_level, runner.wave))
                .collect();
            for pair in progress.windows(2) {
                assert_eq!(pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn level_defeat_advances_and_resets_barrier() {
        let rng = RngBundle::from_user_seed(2);
        let mut state = EngineState::new();
        state.send_runner(1);
        state.runner_mut(1).unwrap().snapshot.damage_rate = 1.0e9;

        let outcome = tick(&mut state, &rng, 1.0);
        // Level 1 has 10 waves; only one falls per tick.
        assert_eq!(outcome.waves_cleared, 1);
        assert_eq!(state.runner(1).unwrap().wave, 2);

        for _ in 0..9 {
            tick(&mut state, &rng, 1.0);
        }
        let runner = state.runner(1).unwrap();
        assert_eq!(runner.global_level, 2);
        assert_eq!(runner.wave, 1);
        assert!(runner.barrier_health > 0.0);
    }

    #[test]
    fn recall_converts_haul_into_queue_tasks() {
        let rng = RngBundle::from_user_seed(3);
        let mut state = EngineState::new();
        state.send_runner(1);
        {
            let runner = state.runner_mut(1).unwrap();
            runner.currency_collected = 250.0;
            runner.fragments_collected.insert(RelicType::Speed, 2.0);
            runner.durability = 1_000.0;
        }
        let outcome = tick(&mut state, &rng, 1.0);
        assert_eq!(outcome.recalls, 1);
        let runner = state.runner(1).unwrap();
        // Scheduler admits the runner in the same tick.
        assert_eq!(runner.state, RunnerState::Upgrading);
        assert_eq!(state.total_recalls, 1);
    }

    #[test]
    fn empty_handed_recall_goes_straight_to_ready() {
        let rng = RngBundle::from_user_seed(3);
        let mut state = EngineState::new();
        state.send_runner(1);
        state.runner_mut(1).unwrap().durability = 1_000.0;
        tick(&mut state, &rng, 1.0);
        assert_eq!(state.runner(1).unwrap().state, RunnerState::Ready);
    }

    #[test]
    fn squad_levels_up_once_per_threshold_crossing() {
        let rng = RngBundle::from_user_seed(4);
        let mut state = EngineState::new();
        // Nine recalls: below the first threshold of ten.
        state.total_recalls = 9;
        state.send_runner(1);
        state.runner_mut(1).unwrap().durability = 1_000.0;
        let outcome = tick(&mut state, &rng, 1.0);
        assert_eq!(outcome.recruits, 1);
        assert_eq!(state.squad_level, 1);
        assert_eq!(state.runners.len(), 4);

        // The recruit carries a phantom task sized to the squad level and
        // is admitted by the scheduler within the same tick.
        let recruit = state.runner(4).unwrap();
        assert_eq!(recruit.state, RunnerState::Upgrading);
        assert_eq!(recruit.upgrade_queue.len(), 1);
    }

    #[test]
    fn upgrade_slots_respect_the_cap() {
        let rng = RngBundle::from_user_seed(5);
        let mut state = EngineState::new();
        for id in 1..=3u64 {
            let runner = state.runner_mut(id).unwrap();
            runner.state = RunnerState::Queued;
            runner.queue_entered_at = id;
            runner
                .upgrade_queue
                .push(UpgradeTask::new(UpgradeKind::Damage, 1_000.0));
        }
        tick(&mut state, &rng, 1.0);
        let upgrading = state
            .runners
            .iter()
            .filter(|runner| runner.state == RunnerState::Upgrading)
            .count();
        // Squad level 0: a single slot, earliest queue entry wins.
        assert_eq!(upgrading, 1);
        assert_eq!(state.runner(1).unwrap().state, RunnerState::Upgrading);
    }

    #[test]
    fn drained_damage_tasks_feed_base_rate() {
        let rng = RngBundle::from_user_seed(6);
        let mut state = EngineState::new();
        {
            let runner = state.runner_mut(1).unwrap();
            runner.state = RunnerState::Queued;
            runner
                .upgrade_queue
                .push(UpgradeTask::new(UpgradeKind::Damage, 50.0));
        }
        for _ in 0..60 {
            tick(&mut state, &rng, 1.0);
        }
        let runner = state.runner(1).unwrap();
        assert_eq!(runner.state, RunnerState::Ready);
        assert!((runner.base_damage_rate - 60.0).abs() < 1e-9);
    }

    #[test]
    fn relic_tasks_settle_tier_ups() {
        let rng = RngBundle::from_user_seed(7);
        let mut state = EngineState::new();
        {
            let runner = state.runner_mut(1).unwrap();
            runner.state = RunnerState::Queued;
            runner
                .upgrade_queue
                .push(UpgradeTask::new(UpgradeKind::Relic(RelicType::Style), 30.0));
        }
        for _ in 0..40 {
            tick(&mut state, &rng, 1.0);
        }
        let runner = state.runner(1).unwrap();
        // 30 fragments cover tiers 0 (10) and 1 (20) exactly.
        assert_eq!(runner.relic_tiers.tier(RelicType::Style), 2);
        assert_eq!(runner.state, RunnerState::Ready);
    }

    #[test]
    fn crew_dispatch_waits_for_pending_road() {
        let rng = RngBundle::from_user_seed(8);
        let mut state = EngineState::new();
        state.ledger.mark_zone_mapped(0);
        state.construction.on_zone_mapped(0, false);
        state.construction.on_hideout_cleared(0);

        tick(&mut state, &rng, 1.0);
        let crew = state
            .runners
            .iter()
            .find(|runner| runner.kind.is_construction())
            .unwrap();
        assert_eq!(crew.kind, AgentKind::Construction { target_zone: 0 });
        assert_eq!(crew.global_level, 1);

        // No second crew while the first is out.
        tick(&mut state, &rng, 1.0);
        let crews = state
            .runners
            .iter()
            .filter(|runner| runner.kind.is_construction())
            .count();
        assert_eq!(crews, 1);
    }

    #[test]
    fn dispatched_crew_spawns_at_its_zone_tile() {
        let rng = RngBundle::from_user_seed(14);
        let mut state = EngineState::new();
        for zone in 0..5u32 {
            state.construction.mark_road_built(zone, 0);
        }
        state.construction.on_zone_mapped(5, false);
        state.construction.on_hideout_cleared(5);

        // Road completions leave a dispatch cooldown to wait out.
        for _ in 0..40 {
            tick(&mut state, &rng, 1.0);
            if let Some(crew) = state.runners.iter().find(|runner| runner.is_crew()) {
                assert_eq!(crew.global_level, 501);
                // Zone 5 sits at global tile 50: past the 38-step first
                // segment, 12 steps into the second.
                assert_eq!(crew.segment_index, 1);
                assert_eq!(crew.step_in_segment, 12);
                assert_eq!(state.furthest_step(1), Some(12));
                return;
            }
        }
        panic!("crew never dispatched");
    }

    #[test]
    fn crew_builds_the_road_and_leaves() {
        let rng = RngBundle::from_user_seed(9);
        let mut state = EngineState::new();
        state.construction.on_zone_mapped(0, false);
        state.construction.on_hideout_cleared(0);
        tick(&mut state, &rng, 1.0);
        assert!(state.runners.iter().any(Runner::is_crew));

        // The crew one-shots every barrier; 100 levels of at most 10 waves.
        let mut roads = 0;
        for _ in 0..1_200 {
            roads += tick(&mut state, &rng, 1.0).roads_completed;
        }
        assert_eq!(roads, 1);
        assert!(state.construction.has_road(0));
        assert!(!state.runners.iter().any(Runner::is_crew));
    }

    #[test]
    fn hideout_clear_pays_the_caravan_and_queues_the_road() {
        let rng = RngBundle::from_user_seed(10);
        let mut state = EngineState::new();
        state.send_runner(1);
        {
            let runner = state.runner_mut(1).unwrap();
            runner.global_level = 100;
            runner.wave = 1;
            runner.snapshot.damage_rate = 1.0e12;
        }
        state.construction.on_zone_mapped(0, false);

        let outcome = tick(&mut state, &rng, 1.0);
        assert_eq!(outcome.hideouts_cleared, 1);
        // The lump sum tips the runner past its durability cap, so the
        // same tick recalls it with the haul converted into queue tasks.
        assert_eq!(state.total_recalls, 1);
        let runner = state.runner(1).unwrap();
        assert_eq!(runner.state, RunnerState::Upgrading);
        assert!(!runner.upgrade_queue.is_drained());
        assert_eq!(
            state.construction.zone_phase(0),
            crate::construction::ZonePhase::PendingRoad
        );
    }
}
