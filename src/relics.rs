//! Relic tiers and fragment banks.
//!
//! Every runner carries a permanent tier (0..=20) per relic type plus a
//! fractional fragment bank holding progress toward the next tier. Relic
//! upgrades resolve from the bank: a single large deposit can cover several
//! consecutive tier costs, so settlement loops until the bank runs dry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::{MAX_RELIC_TIER, RELIC_COST_BASE, RELIC_COST_PER_TIER};

/// The eight relic families carried over from the legacy save format,
/// which is why serde uses the historical upper-case keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelicType {
    Strength,
    Scoop,
    Steal,
    Sidekick,
    Speed,
    Style,
    Supply,
    Scan,
}

impl RelicType {
    pub const ALL: [Self; 8] = [
        Self::Strength,
        Self::Scoop,
        Self::Steal,
        Self::Sidekick,
        Self::Speed,
        Self::Style,
        Self::Supply,
        Self::Scan,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strength => "STRENGTH",
            Self::Scoop => "SCOOP",
            Self::Steal => "STEAL",
            Self::Sidekick => "SIDEKICK",
            Self::Speed => "SPEED",
            Self::Style => "STYLE",
            Self::Supply => "SUPPLY",
            Self::Scan => "SCAN",
        }
    }
}

impl fmt::Display for RelicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelicType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.as_str() == s)
            .ok_or(())
    }
}

/// Tier levels per relic type. Absent entries read as tier zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelicTiers(HashMap<RelicType, u8>);

impl RelicTiers {
    #[must_use]
    pub fn tier(&self, ty: RelicType) -> u8 {
        self.0.get(&ty).copied().unwrap_or(0)
    }

    /// Raise a tier by one, saturating at the cap. Returns false when the
    /// relic was already maxed out.
    pub fn raise(&mut self, ty: RelicType) -> bool {
        let entry = self.0.entry(ty).or_insert(0);
        if *entry >= MAX_RELIC_TIER {
            return false;
        }
        *entry += 1;
        true
    }

    #[cfg(test)]
    pub(crate) fn with_tier(mut self, ty: RelicType, tier: u8) -> Self {
        self.0.insert(ty, tier.min(MAX_RELIC_TIER));
        self
    }
}

/// Fractional fragment holdings per relic type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentBank(HashMap<RelicType, f64>);

impl FragmentBank {
    #[must_use]
    pub fn amount(&self, ty: RelicType) -> f64 {
        self.0.get(&ty).copied().unwrap_or(0.0)
    }

    pub fn deposit(&mut self, ty: RelicType, amount: f64) {
        if amount <= 0.0 {
            return;
        }
        *self.0.entry(ty).or_insert(0.0) += amount;
    }

    /// Withdraw up to `amount`; returns false (leaving the bank untouched)
    /// when the balance does not cover it.
    pub fn withdraw(&mut self, ty: RelicType, amount: f64) -> bool {
        let Some(balance) = self.0.get_mut(&ty) else {
            return false;
        };
        if *balance < amount {
            return false;
        }
        *balance -= amount;
        true
    }

    /// Whether any fragments at all are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|amount| *amount <= 0.0)
    }
}

/// Fragment cost to go from `tier` to `tier + 1`.
#[must_use]
pub fn upgrade_cost(tier: u8) -> f64 {
    RELIC_COST_BASE + f64::from(tier) * RELIC_COST_PER_TIER
}

/// Resolve as many tier-ups as the bank covers for one relic type.
/// Returns the number of tiers gained.
pub fn settle_tier_ups(bank: &mut FragmentBank, tiers: &mut RelicTiers, ty: RelicType) -> u8 {
    let mut gained = 0;
    while tiers.tier(ty) < MAX_RELIC_TIER && bank.withdraw(ty, upgrade_cost(tiers.tier(ty))) {
        if !tiers.raise(ty) {
            break;
        }
        gained += 1;
    }
    gained
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_zero_cost_is_base() {
        assert!((upgrade_cost(0) - RELIC_COST_BASE).abs() < f64::EPSILON);
    }

    #[test]
    fn tier_cost_scales_linearly() {
        let expected = RELIC_COST_BASE + 7.0 * RELIC_COST_PER_TIER;
        assert!((upgrade_cost(7) - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn large_deposit_resolves_multiple_tier_ups() {
        let mut bank = FragmentBank::default();
        let mut tiers = RelicTiers::default();
        // Covers tier 0 (10), tier 1 (20), and tier 2 (30) exactly.
        bank.deposit(RelicType::Speed, 60.0);
        let gained = settle_tier_ups(&mut bank, &mut tiers, RelicType::Speed);
        assert_eq!(gained, 3);
        assert_eq!(tiers.tier(RelicType::Speed), 3);
        assert!(bank.amount(RelicType::Speed).abs() < f64::EPSILON);
    }

    #[test]
    fn settlement_stops_short_of_next_cost() {
        let mut bank = FragmentBank::default();
        let mut tiers = RelicTiers::default();
        bank.deposit(RelicType::Scan, 29.0);
        let gained = settle_tier_ups(&mut bank, &mut tiers, RelicType::Scan);
        assert_eq!(gained, 1);
        assert_eq!(tiers.tier(RelicType::Scan), 1);
        assert!((bank.amount(RelicType::Scan) - 19.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tier_never_exceeds_cap() {
        let mut tiers = RelicTiers::default();
        for _ in 0..40 {
            tiers.raise(RelicType::Style);
        }
        assert_eq!(tiers.tier(RelicType::Style), MAX_RELIC_TIER);

        let mut bank = FragmentBank::default();
        bank.deposit(RelicType::Style, 1_000_000.0);
        assert_eq!(settle_tier_ups(&mut bank, &mut tiers, RelicType::Style), 0);
    }

    #[test]
    fn relic_type_roundtrips_as_str() {
        for ty in RelicType::ALL {
            assert_eq!(ty.as_str().parse::<RelicType>(), Ok(ty));
        }
    }

    #[test]
    fn legacy_serde_keys_are_uppercase() {
        let json = serde_json::to_string(&RelicType::Sidekick).unwrap();
        assert_eq!(json, "\"SIDEKICK\"");
    }
}
