//! The engine's single owned state aggregate and its command surface.
//!
//! Everything the simulation persists lives here. Every field defaults
//! independently so partial saves load without error; the segment list is
//! never persisted and is regenerated lazily from the seeded theme stream.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::constants::{
    LEVELS_PER_ZONE, LOG_RELIC_TIER_UP, LOG_RING_CAPACITY, LOG_RUNNER_SENT, SET_PASS_BONUS,
    STARTING_DAMAGE_RATE, STARTING_ROSTER, ZONE_PASS_BONUS,
};
use crate::construction::ConstructionBoard;
use crate::ledger::EconomyLedger;
use crate::map::{MapSegment, MAP_PATTERNS};
use crate::relics::{self, RelicType};
use crate::rng::RngBundle;
use crate::runner::{Runner, RunnerId, RunnerState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    #[serde(default)]
    pub tick_count: u64,
    #[serde(default)]
    pub runners: Vec<Runner>,
    #[serde(default)]
    pub squad_level: u32,
    #[serde(default)]
    pub total_recalls: u32,
    #[serde(default)]
    pub runners_sent: u32,
    /// Pattern used by the most recently generated segment.
    #[serde(default)]
    pub active_pattern_index: usize,
    #[serde(default)]
    pub highest_zone_reached: u32,
    #[serde(default)]
    pub ledger: EconomyLedger,
    #[serde(default)]
    pub construction: ConstructionBoard,
    /// Furthest path step any runner ever reached, per segment index.
    /// Drives fog-of-war reveal; monotonic.
    #[serde(default)]
    pub max_step_per_segment: HashMap<usize, usize>,
    /// Ring of stable log keys for the UI layer, newest last.
    #[serde(default)]
    pub logs: VecDeque<String>,
    #[serde(default = "default_next_runner_id")]
    pub next_runner_id: RunnerId,
    /// Regenerated on demand, never persisted.
    #[serde(skip)]
    pub segments: Vec<MapSegment>,
}

const fn default_next_runner_id() -> RunnerId {
    STARTING_ROSTER as RunnerId + 1
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineState {
    /// Fresh state with the starting roster, all READY.
    #[must_use]
    pub fn new() -> Self {
        let runners = (1..=STARTING_ROSTER as u64)
            .map(|id| Runner::new_player(id, format!("Runner {id}"), STARTING_DAMAGE_RATE))
            .collect();
        Self {
            tick_count: 0,
            runners,
            squad_level: 0,
            total_recalls: 0,
            runners_sent: 0,
            active_pattern_index: 0,
            highest_zone_reached: 0,
            ledger: EconomyLedger::default(),
            construction: ConstructionBoard::default(),
            max_step_per_segment: HashMap::new(),
            logs: VecDeque::new(),
            next_runner_id: default_next_runner_id(),
            segments: Vec::new(),
        }
    }

    pub fn push_log(&mut self, key: &str) {
        self.logs.push_back(key.to_owned());
        while self.logs.len() > LOG_RING_CAPACITY {
            self.logs.pop_front();
        }
    }

    #[must_use]
    pub fn runner(&self, id: RunnerId) -> Option<&Runner> {
        self.runners.iter().find(|runner| runner.id == id)
    }

    pub fn runner_mut(&mut self, id: RunnerId) -> Option<&mut Runner> {
        self.runners.iter_mut().find(|runner| runner.id == id)
    }

    /// Snapshot bonus and credit lists for a run starting now: every
    /// already-complete map set pays its pass bonus up front, as does every
    /// mapped zone, and both are marked credited so the run never collects
    /// them again in flight.
    #[must_use]
    pub fn initial_run_bonus(&self) -> (f64, Vec<u32>, Vec<u32>) {
        let mut bonus = 0.0;
        let mut credited_sets = Vec::new();
        let mut credited_zones = Vec::new();
        for zone in self.ledger.touched_zones() {
            for set_in_zone in 0..10u32 {
                if self.ledger.set_complete(zone, set_in_zone as usize) {
                    bonus += SET_PASS_BONUS;
                    credited_sets.push(zone * 10 + set_in_zone);
                }
            }
            if self.ledger.zone_mapped(zone) {
                bonus += ZONE_PASS_BONUS;
                credited_zones.push(zone);
            }
        }
        (bonus, credited_sets, credited_zones)
    }

    /// READY to RUNNING. Anything else is a silent no-op.
    pub fn send_runner(&mut self, id: RunnerId) -> bool {
        let (bonus, sets, zones) = self.initial_run_bonus();
        let Some(runner) = self.runner_mut(id) else {
            return false;
        };
        if runner.state != RunnerState::Ready {
            return false;
        }
        runner.begin_run(bonus, &sets, &zones);
        self.runners_sent += 1;
        self.push_log(LOG_RUNNER_SENT);
        true
    }

    /// Send every READY runner. Returns how many left the hangar.
    pub fn send_all_runners(&mut self) -> usize {
        let ready: Vec<RunnerId> = self
            .runners
            .iter()
            .filter(|runner| runner.state == RunnerState::Ready)
            .map(|runner| runner.id)
            .collect();
        ready
            .into_iter()
            .filter(|id| self.send_runner(*id))
            .count()
    }

    /// Legacy manual relic upgrade: spend the runner's fragment bank on one
    /// tier directly, bypassing the task queue.
    pub fn upgrade_relic(&mut self, id: RunnerId, ty: RelicType) -> bool {
        let Some(runner) = self.runner_mut(id) else {
            return false;
        };
        let cost = relics::upgrade_cost(runner.relic_tiers.tier(ty));
        if !runner.fragment_bank.withdraw(ty, cost) {
            return false;
        }
        if !runner.relic_tiers.raise(ty) {
            // Maxed tier; refund the withdrawal.
            runner.fragment_bank.deposit(ty, cost);
            return false;
        }
        self.push_log(LOG_RELIC_TIER_UP);
        true
    }

    /// Whether a player runner currently stands on a zone's boss level.
    /// Crews never block a hideout from spawning.
    #[must_use]
    pub fn boss_level_occupied(&self, zone: u32) -> bool {
        let boss_level = zone * LEVELS_PER_ZONE + LEVELS_PER_ZONE;
        self.runners.iter().any(|runner| {
            runner.state == RunnerState::Running
                && !runner.is_crew()
                && runner.global_level == boss_level
        })
    }

    /// Repair derived fields after deserializing a partial save: the id
    /// counter must stay ahead of every runner already on the roster.
    pub fn rehydrate(&mut self) {
        let max_id = self.runners.iter().map(|runner| runner.id).max().unwrap_or(0);
        if self.next_runner_id <= max_id {
            self.next_runner_id = max_id + 1;
        }
    }

    /// Keep at least one segment ahead of the furthest-advanced runner.
    pub fn ensure_segments(&mut self, rng: &RngBundle) {
        let furthest = self
            .runners
            .iter()
            .filter(|runner| runner.state == RunnerState::Running)
            .map(|runner| runner.segment_index)
            .max()
            .unwrap_or(0);
        self.ensure_segment_count(rng, furthest + 2);
    }

    /// Segment and step coordinates of a global path tile, generating
    /// segments as needed to reach it.
    pub(crate) fn locate_tile(&mut self, rng: &RngBundle, tile: usize) -> (usize, usize) {
        let mut remaining = tile;
        let mut segment = 0usize;
        loop {
            self.ensure_segment_count(rng, segment + 1);
            let len = self.segments[segment].len();
            if remaining < len {
                return (segment, remaining);
            }
            remaining -= len;
            segment += 1;
        }
    }

    /// Generate segments up to `count`. Pattern 0 belongs to the first
    /// segment only; later segments pick uniformly among patterns 1..=4
    /// minus the active one, so consecutive segments never share a layout.
    fn ensure_segment_count(&mut self, rng: &RngBundle, count: usize) {
        while self.segments.len() < count {
            let index = self.segments.len();
            let pattern_index = if index == 0 {
                0
            } else if self.active_pattern_index == 0 {
                rng.theme().gen_range(1..MAP_PATTERNS.len())
            } else {
                let mut choice = rng.theme().gen_range(1..MAP_PATTERNS.len() - 1);
                if choice >= self.active_pattern_index {
                    choice += 1;
                }
                choice
            };
            let previous_theme = self.segments.last().map(|segment| segment.theme);
            self.segments
                .push(MapSegment::generate(index, pattern_index, previous_theme, rng));
            self.active_pattern_index = pattern_index;
        }
    }

    /// Record a runner's position for fog of war. The watermark only grows.
    pub fn note_step(&mut self, segment_index: usize, step: usize) {
        let entry = self.max_step_per_segment.entry(segment_index).or_insert(0);
        if step > *entry {
            *entry = step;
        }
    }

    #[must_use]
    pub fn furthest_step(&self, segment_index: usize) -> Option<usize> {
        self.max_step_per_segment.get(&segment_index).copied()
    }
}
