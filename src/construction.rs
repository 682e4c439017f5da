//! Per-zone hideout and road lifecycle.
//!
//! A zone moves one-way through: unmapped, ready-for-hideout (boss level
//! occupied at mapping time), active hideout, pending road, road built.
//! Ordered sets per phase keep membership explicit; a zone is in at most
//! one phase set at a time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::constants::DISPATCH_COOLDOWN_TICKS;

/// Phase of a zone's construction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZonePhase {
    Unmapped,
    ReadyForHideout,
    ActiveHideout,
    PendingRoad,
    RoadBuilt,
}

/// Outcome of a zone becoming fully mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedOutcome {
    HideoutSpawned,
    HideoutWaiting,
    AlreadyTracked,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionBoard {
    #[serde(default)]
    ready_for_hideout: BTreeSet<u32>,
    #[serde(default)]
    active_hideouts: BTreeSet<u32>,
    #[serde(default)]
    pending_roads: BTreeSet<u32>,
    #[serde(default)]
    roads_built: BTreeSet<u32>,
    /// Earliest tick at which the next crew may be dispatched.
    #[serde(default)]
    dispatch_cooldown_until: u64,
}

impl ConstructionBoard {
    #[must_use]
    pub fn zone_phase(&self, zone: u32) -> ZonePhase {
        if self.roads_built.contains(&zone) {
            ZonePhase::RoadBuilt
        } else if self.pending_roads.contains(&zone) {
            ZonePhase::PendingRoad
        } else if self.active_hideouts.contains(&zone) {
            ZonePhase::ActiveHideout
        } else if self.ready_for_hideout.contains(&zone) {
            ZonePhase::ReadyForHideout
        } else {
            ZonePhase::Unmapped
        }
    }

    #[must_use]
    pub fn has_road(&self, zone: u32) -> bool {
        self.roads_built.contains(&zone)
    }

    #[must_use]
    pub fn hideout_active(&self, zone: u32) -> bool {
        self.active_hideouts.contains(&zone)
    }

    /// Roads built in this zone or any later zone.
    #[must_use]
    pub fn roads_at_or_beyond(&self, zone: u32) -> usize {
        self.roads_built.range(zone..).count()
    }

    #[must_use]
    pub fn roads_built(&self) -> &BTreeSet<u32> {
        &self.roads_built
    }

    /// A zone just became fully mapped. Spawns the hideout immediately
    /// unless a player currently occupies the boss level, in which case it
    /// waits for the level to free up.
    pub fn on_zone_mapped(&mut self, zone: u32, boss_occupied: bool) -> MappedOutcome {
        if self.zone_phase(zone) != ZonePhase::Unmapped {
            return MappedOutcome::AlreadyTracked;
        }
        if boss_occupied {
            self.ready_for_hideout.insert(zone);
            MappedOutcome::HideoutWaiting
        } else {
            self.active_hideouts.insert(zone);
            MappedOutcome::HideoutSpawned
        }
    }

    /// Promote waiting hideouts whose boss level is now unoccupied.
    /// Returns the promoted zones, ascending.
    pub fn promote_ready_hideouts<F>(&mut self, mut boss_occupied: F) -> Vec<u32>
    where
        F: FnMut(u32) -> bool,
    {
        let promotable: Vec<u32> = self
            .ready_for_hideout
            .iter()
            .copied()
            .filter(|zone| !boss_occupied(*zone))
            .collect();
        for zone in &promotable {
            self.ready_for_hideout.remove(zone);
            self.active_hideouts.insert(*zone);
        }
        promotable
    }

    /// Hideout boss defeated; the zone now awaits a construction crew.
    pub fn on_hideout_cleared(&mut self, zone: u32) -> bool {
        if !self.active_hideouts.remove(&zone) {
            return false;
        }
        self.pending_roads.insert(zone);
        true
    }

    /// Lowest pending zone whose predecessor already has a road, if the
    /// cooldown has elapsed. Zone 0 has no predecessor requirement.
    #[must_use]
    pub fn next_dispatch_target(&self, now_tick: u64) -> Option<u32> {
        if now_tick < self.dispatch_cooldown_until {
            return None;
        }
        self.pending_roads
            .iter()
            .copied()
            .find(|zone| *zone == 0 || self.roads_built.contains(&(zone - 1)))
    }

    /// Crew finished its zone. The road becomes permanent and the next
    /// dispatch is held back by the cooldown.
    pub fn mark_road_built(&mut self, zone: u32, now_tick: u64) {
        self.pending_roads.remove(&zone);
        self.roads_built.insert(zone);
        self.dispatch_cooldown_until = now_tick + DISPATCH_COOLDOWN_TICKS;
    }
}
