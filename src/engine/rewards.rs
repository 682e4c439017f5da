//! Per-runner rewards rolled when a level completes.
//!
//! Reward resolution mutates the runner and ledger directly but reports
//! everything else (log-worthy finds, zone mapping) as events so the tick
//! kernel can apply construction transitions and logging with full state
//! access.

use rand::Rng;

use crate::constants::{
    FRAGMENT_BASE_CHANCE, FRAGMENT_MILESTONE_CHANCE, FRAGMENT_ZONE_BOSS_CHANCE, LEVELS_PER_SET,
    LEVELS_PER_ZONE, PIECE_DISCOVERY_REWARD, SCOOP_CHANCE_PER_TIER, SET_CLEAR_REWARD,
    SET_PASS_BONUS, STEAL_BONUS_REWARD, STEAL_CHANCE_PER_TIER, ZONE_CLEAR_REWARD, ZONE_PASS_BONUS,
};
use crate::engine::combat::{level_in_zone, zone_of};
use crate::ledger::{DiscoveryRoll, EconomyLedger};
use crate::relics::RelicType;
use crate::rng::RngBundle;
use crate::runner::Runner;

/// Log-worthy outcomes of one runner's reward roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RewardEvent {
    PieceFound { zone: u32, index: usize },
    ZoneMapped { zone: u32 },
    FragmentFound { ty: RelicType },
}

/// Grant a player runner everything it earns for completing `level`.
/// `road_in_zone` suppresses durability accrual so runners on conquered
/// ground farm without burning out. Construction crews never call this.
pub(crate) fn grant_level_rewards(
    runner: &mut Runner,
    level: u32,
    road_in_zone: bool,
    ledger: &mut EconomyLedger,
    rng: &RngBundle,
    events: &mut Vec<RewardEvent>,
) {
    let zone = zone_of(level);
    let in_zone = level_in_zone(level);
    let tiers = runner.snapshot.relic_tiers.clone();
    let mut currency = 0.0;

    // Map-piece discovery for this level's slot.
    let piece_index = (in_zone - 1) as usize;
    let was_mapped = ledger.zone_mapped(zone);
    let roll = ledger.roll_discovery(
        zone,
        piece_index,
        tiers.tier(RelicType::Scan),
        &mut rng.discovery(),
    );
    if roll == DiscoveryRoll::Found {
        currency += PIECE_DISCOVERY_REWARD;
        events.push(RewardEvent::PieceFound {
            zone,
            index: piece_index,
        });
        if !was_mapped && ledger.zone_mapped(zone) {
            events.push(RewardEvent::ZoneMapped { zone });
        }
    }

    // Flat clear rewards, additive at the zone boss.
    if level % LEVELS_PER_SET == 0 {
        currency += SET_CLEAR_REWARD;
    }
    if level % LEVELS_PER_ZONE == 0 {
        currency += ZONE_CLEAR_REWARD;
    }

    runner.currency_collected += currency;
    if !road_in_zone {
        runner.durability += currency;
    }

    // Steal bonus at set bosses; never wears the runner down.
    if level % LEVELS_PER_SET == 0 {
        let steal_chance = f64::from(tiers.tier(RelicType::Steal)) * STEAL_CHANCE_PER_TIER;
        if steal_chance > 0.0 && rng.steal().chance(steal_chance) {
            runner.currency_collected += STEAL_BONUS_REWARD;
        }
    }

    // Fragment drops, with milestone-boosted odds.
    let fragment_chance = if in_zone == LEVELS_PER_ZONE {
        FRAGMENT_ZONE_BOSS_CHANCE
    } else if in_zone % 25 == 0 {
        FRAGMENT_MILESTONE_CHANCE
    } else {
        FRAGMENT_BASE_CHANCE
    };
    if rng.fragment().chance(fragment_chance) {
        let ty = random_relic_type(rng);
        *runner.fragments_collected.entry(ty).or_insert(0.0) += 1.0;
        events.push(RewardEvent::FragmentFound { ty });

        let scoop_chance = f64::from(tiers.tier(RelicType::Scoop)) * SCOOP_CHANCE_PER_TIER;
        if scoop_chance > 0.0 && rng.fragment().chance(scoop_chance) {
            let second = random_relic_type_excluding(rng, ty);
            *runner.fragments_collected.entry(second).or_insert(0.0) += 1.0;
            events.push(RewardEvent::FragmentFound { ty: second });
        }
    }

    // Snapshot growth per cleared level.
    runner.snapshot.damage_rate += runner.damage_gain_per_level();
}

/// One-time snapshot bonuses the first time a run stands on a completed
/// map set or a mapped zone. Called after the runner's level advances.
pub(crate) fn apply_pass_through_bonuses(runner: &mut Runner, ledger: &EconomyLedger) {
    let set = runner.set_index();
    if !runner.sets_credited.contains(&set) && ledger.global_set_complete(set) {
        runner.snapshot.damage_rate += SET_PASS_BONUS;
        runner.sets_credited.insert(set);
    }
    let zone = runner.zone();
    if !runner.zones_credited.contains(&zone) && ledger.zone_mapped(zone) {
        runner.snapshot.damage_rate += ZONE_PASS_BONUS;
        runner.zones_credited.insert(zone);
    }
}

fn random_relic_type(rng: &RngBundle) -> RelicType {
    let index = rng.fragment().gen_range(0..RelicType::ALL.len());
    RelicType::ALL[index]
}

fn random_relic_type_excluding(rng: &RngBundle, excluded: RelicType) -> RelicType {
    let index = rng.fragment().gen_range(0..RelicType::ALL.len() - 1);
    let ty = RelicType::ALL[index];
    if ty == excluded {
        RelicType::ALL[RelicType::ALL.len() - 1]
    } else {
        ty
    }
}
