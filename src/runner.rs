//! Runner entities and their lifecycle state machine.
//!
//! A runner cycles READY -> RUNNING -> QUEUED -> UPGRADING -> READY.
//! Permanent progression (base damage rate, relic tiers, fragment banks)
//! lives on the runner; a run operates on an immutable stat snapshot taken
//! at launch. Construction crews share the same combat and movement path
//! but collect nothing and never recall.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::constants::{
    BASE_DURABILITY_CAP, CONSTRUCTION_DAMAGE_RATE, DAMAGE_GAIN_BASE,
    DAMAGE_GAIN_PER_STRENGTH_TIER, DURABILITY_PER_STYLE_TIER, LEVELS_PER_SET, LEVELS_PER_ZONE,
};
use crate::relics::{FragmentBank, RelicTiers, RelicType};
use crate::upgrade::UpgradeQueue;

pub type RunnerId = u64;

/// Lifecycle state of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    #[default]
    Ready,
    Running,
    Queued,
    Upgrading,
}

/// Player runner versus road-building crew. A variant rather than a flag so
/// combat and reward code match on it instead of sprinkling boolean checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AgentKind {
    Player,
    Construction { target_zone: u32 },
}

impl AgentKind {
    #[must_use]
    pub const fn is_construction(self) -> bool {
        matches!(self, Self::Construction { .. })
    }
}

impl Default for AgentKind {
    fn default() -> Self {
        Self::Player
    }
}

/// Stats frozen at run start; immutable for the run except for the
/// per-level growth and one-time completion bonuses that feed back into
/// `damage_rate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    pub damage_rate: f64,
    pub relic_tiers: RelicTiers,
}

/// Per-caravan inputs to the effective damage rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombatContext {
    pub caravan_size: usize,
    pub runners_ahead: usize,
    /// Whether the caravan's current 10-level map set is fully discovered.
    pub set_complete: bool,
    /// Whether the caravan's current zone has a constructed road
    /// (gates the speed catch-up bonus).
    pub road_in_zone: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runner {
    pub id: RunnerId,
    pub name: String,
    #[serde(default)]
    pub kind: AgentKind,
    #[serde(default)]
    pub state: RunnerState,

    // Permanent progression.
    #[serde(default)]
    pub base_damage_rate: f64,
    #[serde(default)]
    pub relic_tiers: RelicTiers,
    #[serde(default)]
    pub fragment_bank: FragmentBank,

    // Run snapshot.
    #[serde(default)]
    pub snapshot: StatSnapshot,

    // Run-transient progress.
    #[serde(default = "default_level")]
    pub global_level: u32,
    #[serde(default = "default_wave")]
    pub wave: u32,
    #[serde(default)]
    pub barrier_health: f64,
    #[serde(default)]
    pub segment_index: usize,
    #[serde(default)]
    pub step_in_segment: usize,
    #[serde(default)]
    pub currency_collected: f64,
    #[serde(default)]
    pub fragments_collected: HashMap<RelicType, f64>,
    #[serde(default)]
    pub durability: f64,
    /// Global set indices whose pass-through bonus was already granted.
    #[serde(default)]
    pub sets_credited: BTreeSet<u32>,
    /// Zones whose pass-through bonus was already granted.
    #[serde(default)]
    pub zones_credited: BTreeSet<u32>,

    // Upgrade pipeline.
    #[serde(default)]
    pub upgrade_queue: UpgradeQueue,
    /// Tick at which the runner entered the queue; FIFO tie-break key.
    #[serde(default)]
    pub queue_entered_at: u64,
}

const fn default_level() -> u32 {
    1
}

const fn default_wave() -> u32 {
    1
}

impl Runner {
    #[must_use]
    pub fn new_player(id: RunnerId, name: String, base_damage_rate: f64) -> Self {
        Self {
            id,
            name,
            kind: AgentKind::Player,
            state: RunnerState::Ready,
            base_damage_rate,
            relic_tiers: RelicTiers::default(),
            fragment_bank: FragmentBank::default(),
            snapshot: StatSnapshot::default(),
            global_level: 1,
            wave: 1,
            barrier_health: 0.0,
            segment_index: 0,
            step_in_segment: 0,
            currency_collected: 0.0,
            fragments_collected: HashMap::new(),
            durability: 0.0,
            sets_credited: BTreeSet::new(),
            zones_credited: BTreeSet::new(),
            upgrade_queue: UpgradeQueue::default(),
            queue_entered_at: 0,
        }
    }

    #[must_use]
    pub fn new_construction(id: RunnerId, target_zone: u32) -> Self {
        let mut crew = Self::new_player(id, String::from("Construction Crew"), 0.0);
        crew.kind = AgentKind::Construction { target_zone };
        crew.state = RunnerState::Running;
        crew.global_level = target_zone * LEVELS_PER_ZONE + 1;
        crew
    }

    /// Roster-scan predicate for construction crews.
    #[must_use]
    pub const fn is_crew(&self) -> bool {
        self.kind.is_construction()
    }

    /// Zone index of the runner's current global level.
    #[must_use]
    pub const fn zone(&self) -> u32 {
        (self.global_level - 1) / LEVELS_PER_ZONE
    }

    /// One-based level within the current zone.
    #[must_use]
    pub const fn level_in_zone(&self) -> u32 {
        (self.global_level - 1) % LEVELS_PER_ZONE + 1
    }

    /// Global 10-level set index of the current level.
    #[must_use]
    pub const fn set_index(&self) -> u32 {
        (self.global_level - 1) / LEVELS_PER_SET
    }

    /// Style tier of the active run snapshot.
    #[must_use]
    pub fn style_tier(&self) -> u8 {
        self.snapshot.relic_tiers.tier(RelicType::Style)
    }

    /// Durability a runner can absorb before recall. Crews never recall.
    #[must_use]
    pub fn capacity(&self) -> f64 {
        if self.kind.is_construction() {
            return f64::INFINITY;
        }
        BASE_DURABILITY_CAP
            + f64::from(self.snapshot.relic_tiers.tier(RelicType::Style)) * DURABILITY_PER_STYLE_TIER
    }

    /// Whether the recall condition is met.
    #[must_use]
    pub fn recall_due(&self) -> bool {
        !self.kind.is_construction() && self.durability >= self.capacity()
    }

    /// Snapshot damage growth on each level completion.
    #[must_use]
    pub fn damage_gain_per_level(&self) -> f64 {
        if self.kind.is_construction() {
            return 0.0;
        }
        DAMAGE_GAIN_BASE
            + f64::from(self.snapshot.relic_tiers.tier(RelicType::Strength))
                * DAMAGE_GAIN_PER_STRENGTH_TIER
    }

    /// Effective damage rate for the current tick, scaled by caravan and
    /// catch-up bonuses. Construction crews hit at a fixed massive rate so
    /// roads finish on a schedule gated by levels, not player power.
    #[must_use]
    pub fn effective_rate(&self, ctx: &CombatContext) -> f64 {
        use crate::constants::{
            SET_COMPLETE_FLAT_BONUS, SIDEKICK_BONUS_PER_TIER, SPEED_BONUS_PER_TIER,
            SUPPLY_BONUS_PER_TIER,
        };

        if self.kind.is_construction() {
            return CONSTRUCTION_DAMAGE_RATE;
        }

        let tiers = &self.snapshot.relic_tiers;
        let mut rate = self.snapshot.damage_rate;

        if ctx.caravan_size > 1 {
            let sidekick = f64::from(tiers.tier(RelicType::Sidekick));
            rate *= 1.0 + sidekick * SIDEKICK_BONUS_PER_TIER;
        }
        if ctx.runners_ahead > 0 {
            let supply = f64::from(tiers.tier(RelicType::Supply));
            #[allow(clippy::cast_precision_loss)]
            let ahead = ctx.runners_ahead as f64;
            rate *= 1.0 + ahead * supply * SUPPLY_BONUS_PER_TIER;
        }
        if ctx.road_in_zone {
            let speed = f64::from(tiers.tier(RelicType::Speed));
            rate *= 1.0 + speed * SPEED_BONUS_PER_TIER;
        }
        if ctx.set_complete {
            rate += SET_COMPLETE_FLAT_BONUS;
        }
        rate
    }

    /// Capture the run snapshot and reset run-transient fields. Completion
    /// bonuses for already-discovered sets and mapped zones are folded into
    /// the snapshot up front and marked credited so they are never granted
    /// twice when the run passes through them again.
    pub fn begin_run(&mut self, initial_bonus: f64, credited_sets: &[u32], credited_zones: &[u32]) {
        self.snapshot = StatSnapshot {
            damage_rate: self.base_damage_rate + initial_bonus,
            relic_tiers: self.relic_tiers.clone(),
        };
        self.state = RunnerState::Running;
        self.global_level = 1;
        self.wave = 1;
        self.barrier_health = 0.0;
        self.segment_index = 0;
        self.step_in_segment = 0;
        self.currency_collected = 0.0;
        self.fragments_collected.clear();
        self.durability = 0.0;
        self.sets_credited = credited_sets.iter().copied().collect();
        self.zones_credited = credited_zones.iter().copied().collect();
    }

    /// Whether the run collected anything worth queueing for.
    #[must_use]
    pub fn has_haul(&self) -> bool {
        self.currency_collected > 0.0
            || self.fragments_collected.values().any(|amount| *amount > 0.0)
    }
}
