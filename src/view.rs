//! Renderer-facing projections of engine state.
//!
//! Pure reads: nothing here mutates the simulation. The UI layer decides
//! glyphs and layout from these plain structs.

use crate::constants::LEVELS_PER_SET;
use crate::construction::ZonePhase;
use crate::engine::combat::{
    barrier_kind, compute_barrier_health, level_in_zone, waves_for_level, zone_of, BarrierKind,
};
use crate::runner::{CombatContext, RunnerId, RunnerState};
use crate::state::EngineState;
use std::collections::BTreeMap;

/// Position and display inputs for one runner on the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerMarker {
    pub id: RunnerId,
    pub name: String,
    pub segment_index: usize,
    pub step_in_segment: usize,
    pub is_crew: bool,
    pub style_tier: u8,
}

/// Per-zone mapping and construction status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneStatus {
    pub zone: u32,
    pub pieces_found: usize,
    pub pieces_by_set: [usize; 10],
    pub mapped: bool,
    pub phase: ZonePhase,
}

/// One row of the progress tracker leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerEntry {
    pub runner_id: RunnerId,
    pub name: String,
    pub zone: u32,
    pub level_in_zone: u32,
    pub wave: u32,
    pub wave_count: u32,
    pub barrier: BarrierKind,
    pub barrier_health: f64,
    pub group_rate: f64,
    pub est_seconds: u64,
}

/// Map markers for every RUNNING agent.
#[must_use]
pub fn runner_markers(state: &EngineState) -> Vec<RunnerMarker> {
    state
        .runners
        .iter()
        .filter(|runner| runner.state == RunnerState::Running)
        .map(|runner| RunnerMarker {
            id: runner.id,
            name: runner.name.clone(),
            segment_index: runner.segment_index,
            step_in_segment: runner.step_in_segment,
            is_crew: runner.is_crew(),
            style_tier: runner.style_tier(),
        })
        .collect()
}

/// Zone statuses from zone 0 through the highest zone reached.
#[must_use]
pub fn zone_statuses(state: &EngineState) -> Vec<ZoneStatus> {
    (0..=state.highest_zone_reached)
        .map(|zone| {
            let mut pieces_by_set = [0usize; 10];
            for (set, slot) in pieces_by_set.iter_mut().enumerate() {
                *slot = state.ledger.pieces_found_in_set(zone, set);
            }
            ZoneStatus {
                zone,
                pieces_found: state.ledger.pieces_found_in_zone(zone),
                pieces_by_set,
                mapped: state.ledger.zone_mapped(zone),
                phase: state.construction.zone_phase(zone),
            }
        })
        .collect()
}

/// Tracker rows for every RUNNING agent, furthest progress first. Members
/// of one caravan share the group rate and clear estimate.
#[must_use]
pub fn tracker(state: &EngineState) -> Vec<TrackerEntry> {
    let mut caravans: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (index, runner) in state.runners.iter().enumerate() {
        if runner.state == RunnerState::Running {
            caravans.entry(runner.global_level).or_default().push(index);
        }
    }

    let mut rows = Vec::new();
    for (&level, members) in caravans.iter().rev() {
        let runners_ahead: usize = caravans.range(level + 1..).map(|(_, group)| group.len()).sum();
        let zone = zone_of(level);
        let roads = state.construction.roads_at_or_beyond(zone);
        let hideout = state.construction.hideout_active(zone);
        let ctx = CombatContext {
            caravan_size: members.len(),
            runners_ahead,
            set_complete: state.ledger.global_set_complete((level - 1) / LEVELS_PER_SET),
            road_in_zone: state.construction.has_road(zone),
        };
        let group_rate: f64 = members
            .iter()
            .map(|&index| state.runners[index].effective_rate(&ctx))
            .sum();

        for &index in members {
            let runner = &state.runners[index];
            let health = if runner.barrier_health > 0.0 {
                runner.barrier_health
            } else {
                compute_barrier_health(level, runner.wave, roads, hideout)
            };
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let est_seconds = if group_rate > 0.0 {
                (health / group_rate).ceil().max(0.0) as u64
            } else {
                u64::MAX
            };
            rows.push(TrackerEntry {
                runner_id: runner.id,
                name: runner.name.clone(),
                zone,
                level_in_zone: level_in_zone(level),
                wave: runner.wave,
                wave_count: waves_for_level(level, roads),
                barrier: barrier_kind(level, runner.wave, roads, hideout),
                barrier_health: health,
                group_rate,
                est_seconds,
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PIECES_PER_SET;
    use crate::rng::RngBundle;

    #[test]
    fn markers_cover_only_running_agents() {
        let mut state = EngineState::new();
        state.send_runner(1);
        let markers = runner_markers(&state);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].id, 1);
        assert!(!markers[0].is_crew);
    }

    #[test]
    fn tracker_ranks_furthest_first_and_shares_group_rate() {
        let mut state = EngineState::new();
        state.send_all_runners();
        state.runner_mut(3).unwrap().global_level = 40;

        let rows = tracker(&state);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].runner_id, 3);
        assert_eq!(rows[0].zone, 0);
        assert_eq!(rows[0].level_in_zone, 40);
        // The two level-1 runners fight together.
        assert!((rows[1].group_rate - 20.0).abs() < f64::EPSILON);
        assert!((rows[2].group_rate - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tracker_estimates_clear_time_with_a_ceiling() {
        let mut state = EngineState::new();
        state.send_runner(1);
        let rows = tracker(&state);
        let expected = (rows[0].barrier_health / rows[0].group_rate).ceil() as u64;
        assert_eq!(rows[0].est_seconds, expected);
        assert!(rows[0].est_seconds >= 1);
    }

    #[test]
    fn zone_statuses_track_sets_and_phase() {
        let rng = RngBundle::from_user_seed(1);
        let mut state = EngineState::new();
        state.ensure_segments(&rng);
        for index in 0..PIECES_PER_SET {
            state.ledger.mark_found(0, index);
        }
        let statuses = zone_statuses(&state);
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].pieces_found, 10);
        assert_eq!(statuses[0].pieces_by_set[0], 10);
        assert_eq!(statuses[0].pieces_by_set[1], 0);
        assert!(!statuses[0].mapped);
        assert_eq!(statuses[0].phase, ZonePhase::Unmapped);
    }
}
