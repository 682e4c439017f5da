//! Pure barrier math: wave counts and barrier health.
//!
//! Everything here is a function of its arguments only, so identical inputs
//! always produce identical barriers regardless of engine history.

use crate::constants::{
    BARRIER_GLOBAL_FACTOR, DEFAULT_BARRIER_HEALTH, HIDEOUT_BOSS_HEALTH_MULTIPLIER,
    LEVELS_PER_SET, LEVELS_PER_ZONE, LEVEL_SCALE_EXPONENT, ROAD_HEALTH_REDUCTION_CAP,
    ROAD_HEALTH_REDUCTION_PER_ZONE, SET_BOSS_HEALTH_MULTIPLIER, WAVES_PER_LEVEL,
    ZONE_BOSS_HEALTH_MULTIPLIER, ZONE_SCALE_EXPONENT,
};

/// Which barrier a wave presents, for display and reward branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierKind {
    Normal,
    SetBoss,
    ZoneBoss,
    Hideout,
}

#[must_use]
pub const fn zone_of(global_level: u32) -> u32 {
    (global_level - 1) / LEVELS_PER_ZONE
}

#[must_use]
pub const fn level_in_zone(global_level: u32) -> u32 {
    (global_level - 1) % LEVELS_PER_ZONE + 1
}

/// Waves a level presents. Boss levels always have exactly one wave; roads
/// at or beyond the zone shave waves off ordinary levels, floored at 1.
#[must_use]
pub fn waves_for_level(global_level: u32, roads_at_or_beyond: usize) -> u32 {
    if global_level % LEVELS_PER_SET == 0 {
        return 1;
    }
    #[allow(clippy::cast_possible_truncation)]
    let shaved = WAVES_PER_LEVEL.saturating_sub(roads_at_or_beyond as u32);
    shaved.max(1)
}

/// Barrier classification for the given wave of a level. Boss multipliers
/// only apply on the final wave.
#[must_use]
pub fn barrier_kind(global_level: u32, wave: u32, roads_at_or_beyond: usize, hideout: bool) -> BarrierKind {
    if wave < waves_for_level(global_level, roads_at_or_beyond) {
        return BarrierKind::Normal;
    }
    let in_zone = level_in_zone(global_level);
    if in_zone == LEVELS_PER_ZONE {
        if hideout {
            BarrierKind::Hideout
        } else {
            BarrierKind::ZoneBoss
        }
    } else if in_zone % LEVELS_PER_SET == 0 {
        BarrierKind::SetBoss
    } else {
        BarrierKind::Normal
    }
}

/// Barrier health for `(global_level, wave)` given the zone's road count and
/// hideout status. Road reduction applies only to boss waves.
#[must_use]
pub fn compute_barrier_health(
    global_level: u32,
    wave: u32,
    roads_at_or_beyond: usize,
    hideout: bool,
) -> f64 {
    let zone = zone_of(global_level);
    let in_zone = level_in_zone(global_level);
    let mut health = DEFAULT_BARRIER_HEALTH
        * f64::from(zone + 1).powf(ZONE_SCALE_EXPONENT)
        * f64::from(in_zone).powf(LEVEL_SCALE_EXPONENT)
        * BARRIER_GLOBAL_FACTOR;

    let kind = barrier_kind(global_level, wave, roads_at_or_beyond, hideout);
    match kind {
        BarrierKind::Hideout => health *= HIDEOUT_BOSS_HEALTH_MULTIPLIER,
        BarrierKind::ZoneBoss => health *= ZONE_BOSS_HEALTH_MULTIPLIER,
        BarrierKind::SetBoss => health *= SET_BOSS_HEALTH_MULTIPLIER,
        BarrierKind::Normal => {}
    }
    if kind != BarrierKind::Normal {
        #[allow(clippy::cast_precision_loss)]
        let reduction = (roads_at_or_beyond as f64 * ROAD_HEALTH_REDUCTION_PER_ZONE)
            .min(ROAD_HEALTH_REDUCTION_CAP);
        health *= 1.0 - reduction;
    }
    health.floor()
}
