//! Map-piece discovery grid and pity bookkeeping.
//!
//! Each zone carries 100 boolean piece flags, one per level in the zone.
//! Failed discovery rolls accumulate a per-piece pity boost that feeds back
//! into the roll chance, so every piece is found in bounded expected time.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::{
    PIECES_PER_SET, PIECES_PER_ZONE, PIECE_BASE_CHANCE, PIECE_PITY_STEP,
    PIECE_SCAN_BONUS_PER_TIER,
};
use crate::rng::CountingRng;

/// Outcome of one discovery roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryRoll {
    AlreadyFound,
    Found,
    Missed,
}

/// Per-zone map-piece grid plus pity boosts for pending pieces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomyLedger {
    /// Zone index to 100 piece flags. Zones absent from the map have no
    /// pieces found yet.
    #[serde(default)]
    map_pieces: HashMap<u32, Vec<bool>>,
    /// Zone index to piece index to accumulated pity.
    #[serde(default)]
    pity: HashMap<u32, HashMap<u32, f64>>,
}

impl EconomyLedger {
    #[must_use]
    pub fn piece_found(&self, zone: u32, index: usize) -> bool {
        self.map_pieces
            .get(&zone)
            .and_then(|pieces| pieces.get(index))
            .copied()
            .unwrap_or(false)
    }

    #[must_use]
    pub fn pity(&self, zone: u32, index: usize) -> f64 {
        self.pity
            .get(&zone)
            .and_then(|boosts| boosts.get(&(index as u32)))
            .copied()
            .unwrap_or(0.0)
    }

    /// Roll chance for a piece, pity included.
    #[must_use]
    pub fn discovery_chance(&self, zone: u32, index: usize, scan_tier: u8) -> f64 {
        PIECE_BASE_CHANCE
            + f64::from(scan_tier) * PIECE_SCAN_BONUS_PER_TIER
            + self.pity(zone, index) / 100.0
    }

    /// Attempt discovery of one piece. Success marks the piece and clears
    /// its pity; failure bumps the pity by a fixed step.
    pub fn roll_discovery<R: RngCore>(
        &mut self,
        zone: u32,
        index: usize,
        scan_tier: u8,
        rng: &mut CountingRng<R>,
    ) -> DiscoveryRoll {
        if index >= PIECES_PER_ZONE || self.piece_found(zone, index) {
            return DiscoveryRoll::AlreadyFound;
        }
        let chance = self.discovery_chance(zone, index, scan_tier);
        if rng.chance(chance) {
            self.map_pieces
                .entry(zone)
                .or_insert_with(|| vec![false; PIECES_PER_ZONE])[index] = true;
            if let Some(boosts) = self.pity.get_mut(&zone) {
                boosts.remove(&(index as u32));
                if boosts.is_empty() {
                    self.pity.remove(&zone);
                }
            }
            DiscoveryRoll::Found
        } else {
            *self
                .pity
                .entry(zone)
                .or_default()
                .entry(index as u32)
                .or_insert(0.0) += PIECE_PITY_STEP;
            DiscoveryRoll::Missed
        }
    }

    /// Whether all 100 pieces of the zone are found.
    #[must_use]
    pub fn zone_mapped(&self, zone: u32) -> bool {
        self.map_pieces
            .get(&zone)
            .is_some_and(|pieces| pieces.iter().all(|found| *found))
    }

    /// Whether the 10 pieces of one set within a zone are all found.
    #[must_use]
    pub fn set_complete(&self, zone: u32, set_in_zone: usize) -> bool {
        let Some(pieces) = self.map_pieces.get(&zone) else {
            return false;
        };
        let start = set_in_zone * PIECES_PER_SET;
        pieces
            .get(start..start + PIECES_PER_SET)
            .is_some_and(|set| set.iter().all(|found| *found))
    }

    /// Set-completion predicate keyed by global set index.
    #[must_use]
    pub fn global_set_complete(&self, set_index: u32) -> bool {
        let zone = set_index / 10;
        let set_in_zone = (set_index % 10) as usize;
        self.set_complete(zone, set_in_zone)
    }

    #[must_use]
    pub fn pieces_found_in_zone(&self, zone: u32) -> usize {
        self.map_pieces
            .get(&zone)
            .map_or(0, |pieces| pieces.iter().filter(|found| **found).count())
    }

    #[must_use]
    pub fn pieces_found_in_set(&self, zone: u32, set_in_zone: usize) -> usize {
        let Some(pieces) = self.map_pieces.get(&zone) else {
            return 0;
        };
        let start = set_in_zone * PIECES_PER_SET;
        pieces
            .get(start..start + PIECES_PER_SET)
            .map_or(0, |set| set.iter().filter(|found| **found).count())
    }

    /// Zones with at least one discovered piece, ascending.
    #[must_use]
    pub fn touched_zones(&self) -> Vec<u32> {
        let mut zones: Vec<u32> = self.map_pieces.keys().copied().collect();
        zones.sort_unstable();
        zones
    }

    #[cfg(test)]
    pub(crate) fn mark_zone_mapped(&mut self, zone: u32) {
        self.map_pieces.insert(zone, vec![true; PIECES_PER_ZONE]);
    }

    #[cfg(test)]
    pub(crate) fn mark_found(&mut self, zone: u32, index: usize) {
        self.map_pieces
            .entry(zone)
            .or_insert_with(|| vec![false; PIECES_PER_ZONE])[index] = true;
    }
}
