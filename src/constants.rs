//! Centralized balance and tuning constants for the Zone Runners engine.
//!
//! These values define the deterministic math for the core simulation.
//! Keeping them together ensures that gameplay can only be adjusted via
//! code changes reviewed in version control, rather than through external
//! JSON assets.

// Logging keys -------------------------------------------------------------
pub(crate) const LOG_RUNNER_SENT: &str = "log.runner.sent";
pub(crate) const LOG_RUNNER_WARPED: &str = "log.runner.warped";
pub(crate) const LOG_RUNNER_READY: &str = "log.runner.ready";
pub(crate) const LOG_RUNNER_RECRUITED: &str = "log.runner.recruited";
pub(crate) const LOG_SQUAD_LEVEL_UP: &str = "log.squad.level-up";
pub(crate) const LOG_PIECE_FOUND: &str = "log.piece.found";
pub(crate) const LOG_ZONE_MAPPED: &str = "log.zone.mapped";
pub(crate) const LOG_HIDEOUT_SPAWNED: &str = "log.hideout.spawned";
pub(crate) const LOG_HIDEOUT_WAITING: &str = "log.hideout.waiting";
pub(crate) const LOG_HIDEOUT_CLEARED: &str = "log.hideout.cleared";
pub(crate) const LOG_CREW_DISPATCHED: &str = "log.crew.dispatched";
pub(crate) const LOG_ROAD_COMPLETE: &str = "log.road.complete";
pub(crate) const LOG_RELIC_TIER_UP: &str = "log.relic.tier-up";
pub(crate) const LOG_FRAGMENT_FOUND: &str = "log.fragment.found";
pub(crate) const LOG_SAVE_CORRUPT: &str = "log.save.corrupt";

// Progression layout -------------------------------------------------------
pub(crate) const LEVELS_PER_ZONE: u32 = 100;
pub(crate) const LEVELS_PER_SET: u32 = 10;
pub(crate) const PIECES_PER_ZONE: usize = 100;
pub(crate) const PIECES_PER_SET: usize = 10;
pub(crate) const WAVES_PER_LEVEL: u32 = 10;

// Barrier tuning -----------------------------------------------------------
pub(crate) const DEFAULT_BARRIER_HEALTH: f64 = 10.0;
pub(crate) const ZONE_SCALE_EXPONENT: f64 = 1.5;
pub(crate) const LEVEL_SCALE_EXPONENT: f64 = 1.2;
pub(crate) const BARRIER_GLOBAL_FACTOR: f64 = 1.1;
pub(crate) const SET_BOSS_HEALTH_MULTIPLIER: f64 = 50.0;
pub(crate) const ZONE_BOSS_HEALTH_MULTIPLIER: f64 = 250.0;
pub(crate) const HIDEOUT_BOSS_HEALTH_MULTIPLIER: f64 = 1000.0;
pub(crate) const ROAD_HEALTH_REDUCTION_PER_ZONE: f64 = 0.10;
pub(crate) const ROAD_HEALTH_REDUCTION_CAP: f64 = 0.90;

// Runner tuning ------------------------------------------------------------
pub(crate) const STARTING_ROSTER: usize = 3;
pub(crate) const STARTING_DAMAGE_RATE: f64 = 10.0;
pub(crate) const BASE_DURABILITY_CAP: f64 = 20.0;
pub(crate) const DURABILITY_PER_STYLE_TIER: f64 = 4.0;
pub(crate) const DAMAGE_GAIN_BASE: f64 = 0.5;
pub(crate) const DAMAGE_GAIN_PER_STRENGTH_TIER: f64 = 0.1;
pub(crate) const CONSTRUCTION_DAMAGE_RATE: f64 = 999_999_999.0;

// Relic tuning -------------------------------------------------------------
pub(crate) const MAX_RELIC_TIER: u8 = 20;
pub(crate) const RELIC_COST_BASE: f64 = 10.0;
pub(crate) const RELIC_COST_PER_TIER: f64 = 10.0;
pub(crate) const SIDEKICK_BONUS_PER_TIER: f64 = 0.025;
pub(crate) const SUPPLY_BONUS_PER_TIER: f64 = 0.005;
pub(crate) const SPEED_BONUS_PER_TIER: f64 = 0.025;
pub(crate) const STEAL_CHANCE_PER_TIER: f64 = 0.025;
pub(crate) const SCOOP_CHANCE_PER_TIER: f64 = 0.02;

// Economy tuning -----------------------------------------------------------
pub(crate) const PIECE_BASE_CHANCE: f64 = 0.01;
pub(crate) const PIECE_SCAN_BONUS_PER_TIER: f64 = 0.001;
pub(crate) const PIECE_PITY_STEP: f64 = 1.0;
pub(crate) const PIECE_DISCOVERY_REWARD: f64 = 1.0;
pub(crate) const SET_CLEAR_REWARD: f64 = 1.0;
pub(crate) const ZONE_CLEAR_REWARD: f64 = 10.0;
pub(crate) const STEAL_BONUS_REWARD: f64 = 1.0;
pub(crate) const HIDEOUT_CLEAR_REWARD: f64 = 25.0;
pub(crate) const FRAGMENT_BASE_CHANCE: f64 = 0.10;
pub(crate) const FRAGMENT_MILESTONE_CHANCE: f64 = 0.25;
pub(crate) const FRAGMENT_ZONE_BOSS_CHANCE: f64 = 0.50;
pub(crate) const SET_COMPLETE_FLAT_BONUS: f64 = 5.0;
pub(crate) const SET_PASS_BONUS: f64 = 1.0;
pub(crate) const ZONE_PASS_BONUS: f64 = 10.0;

// Upgrade pipeline tuning --------------------------------------------------
pub(crate) const UPGRADE_RATE_FACTOR: f64 = 0.01;
pub(crate) const SQUAD_RECALLS_PER_LEVEL_STEP: u32 = 10;
pub(crate) const UPGRADE_SLOTS_PER_SQUAD_LEVELS: u32 = 5;
pub(crate) const RECRUIT_PHANTOM_TASK_PER_LEVEL: f64 = 10.0;

// Construction tuning ------------------------------------------------------
pub(crate) const DISPATCH_COOLDOWN_TICKS: u64 = 30;

// Miscellaneous ------------------------------------------------------------
pub(crate) const LOG_RING_CAPACITY: usize = 50;
