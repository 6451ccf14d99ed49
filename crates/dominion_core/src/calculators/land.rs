//! Land ratio, range and acres changing hands.

use serde::{Deserialize, Serialize};

use crate::dominion::Dominion;
use crate::land::{BuildingType, LandHoldings, LandType};
use crate::math::{floor_count, fx, ratio, Fixed};
use crate::queue::{QueueChannel, QueueResource, QueueService};
use crate::rules::InvasionRules;

/// Buildings of one type lost with conquered land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingLoss {
    /// Building type.
    pub building: BuildingType,
    /// Completed buildings destroyed.
    pub built: u64,
    /// Buildings under construction cancelled.
    pub constructing: u64,
}

/// Land calculator.
#[derive(Debug, Clone, Copy)]
pub struct LandCalculator<'a> {
    rules: &'a InvasionRules,
}

impl<'a> LandCalculator<'a> {
    /// Create a calculator over the rules.
    #[must_use]
    pub const fn new(rules: &'a InvasionRules) -> Self {
        Self { rules }
    }

    /// Defender land / attacker land.
    #[must_use]
    pub fn land_ratio(attacker: &Dominion, defender: &Dominion) -> Fixed {
        ratio(fx(defender.total_land()), fx(attacker.total_land()))
    }

    /// Whether a land ratio is inside the invasion range.
    #[must_use]
    pub fn is_in_range(&self, land_ratio: Fixed) -> bool {
        land_ratio >= self.rules.land.range_min && land_ratio <= self.rules.land.range_max
    }

    /// Acres taken from the defender on a successful invasion.
    ///
    /// ```text
    /// r < 0.55: (0.304·r² − 0.227·r + 0.048) · L
    /// else:     (0.129·r − 0.048) · L
    /// ```
    /// then scaled, floored and raised to the minimum.
    #[must_use]
    pub fn acres_conquered(&self, attacker_land: u64, land_ratio: Fixed) -> u64 {
        let r = land_ratio;
        let factor = if r < Fixed::from_num(0.55) {
            Fixed::from_num(0.304) * r * r - Fixed::from_num(0.227) * r + Fixed::from_num(0.048)
        } else {
            Fixed::from_num(0.129) * r - Fixed::from_num(0.048)
        };
        let acres = factor * fx(attacker_land) * self.rules.land.conquest_multiplier;
        floor_count(acres).max(self.rules.land.minimum_conquered)
    }

    /// Acres lost per land type, proportional to holdings.
    #[must_use]
    pub fn land_lost(defender: &Dominion, acres: u64) -> LandHoldings {
        let weights: Vec<(LandType, u64)> = defender.land.iter().collect();
        let mut lost = LandHoldings::new();
        for (land, amount) in distribute(acres, &weights) {
            lost[land] = amount;
        }
        lost
    }

    /// Buildings destroyed when `lost` acres of `land` change hands.
    ///
    /// Barren acres go first; the rest is spread over built and queued
    /// buildings of that land type.
    #[must_use]
    pub fn buildings_lost(
        defender: &Dominion,
        queue: &dyn QueueService,
        land: LandType,
        lost: u64,
    ) -> Vec<BuildingLoss> {
        let standing: Vec<(BuildingType, u64, u64)> = land
            .buildings()
            .map(|building| {
                let queued = queue.queue_total_by_resource(
                    QueueChannel::Construction,
                    defender.id,
                    QueueResource::Building(building),
                );
                (building, defender.building(building), queued.max(0).unsigned_abs())
            })
            .collect();

        let occupied: u64 = standing.iter().map(|&(_, built, queued)| built + queued).sum();
        let barren = defender.land[land].saturating_sub(occupied);
        let to_destroy = lost.saturating_sub(barren);

        let weights: Vec<(BuildingType, u64)> = standing
            .iter()
            .map(|&(building, built, queued)| (building, built + queued))
            .collect();
        distribute(to_destroy, &weights)
            .into_iter()
            .zip(standing)
            .filter(|((_, destroyed), _)| *destroyed > 0)
            .map(|((building, destroyed), (_, built, queued))| {
                let constructing = mul_div_floor(destroyed, queued, built + queued);
                BuildingLoss {
                    building,
                    built: destroyed - constructing,
                    constructing,
                }
            })
            .collect()
    }
}

/// Split `amount` over weights, largest weight first, each share rounded up
/// and never more than its weight or what is left.
fn distribute<K: Copy>(amount: u64, weights: &[(K, u64)]) -> Vec<(K, u64)> {
    let total: u64 = weights.iter().map(|&(_, w)| w).sum();
    let mut out: Vec<(K, u64)> = weights.iter().map(|&(key, _)| (key, 0)).collect();
    if total == 0 {
        return out;
    }
    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(weights[i].1));

    let mut remaining = amount.min(total);
    let target = remaining;
    for i in order {
        if remaining == 0 {
            break;
        }
        let weight = weights[i].1;
        let share = mul_div_ceil(target, weight, total).min(weight).min(remaining);
        out[i].1 = share;
        remaining -= share;
    }
    out
}

fn mul_div_ceil(a: u64, b: u64, c: u64) -> u64 {
    if c == 0 {
        return 0;
    }
    let value = (u128::from(a) * u128::from(b)).div_ceil(u128::from(c));
    u64::try_from(value).unwrap_or(u64::MAX)
}

fn mul_div_floor(a: u64, b: u64, c: u64) -> u64 {
    if c == 0 {
        return 0;
    }
    u64::try_from(u128::from(a) * u128::from(b) / u128::from(c)).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::TickQueue;

    fn defender() -> Dominion {
        let mut dominion = Dominion::new(2, "Target", 2, 1, "human");
        dominion.land = LandHoldings::new()
            .with(LandType::Plain, 300)
            .with(LandType::Forest, 150)
            .with(LandType::Hill, 50);
        dominion
    }

    #[test]
    fn test_acres_conquered_curve() {
        let rules = InvasionRules::default();
        let calc = LandCalculator::new(&rules);
        // (0.129 × 1.0 − 0.048) × 1000 × 0.75 = 60.75
        assert_eq!(calc.acres_conquered(1000, Fixed::ONE), 60);
        // Tiny targets still yield the minimum.
        assert_eq!(calc.acres_conquered(100, Fixed::from_num(0.4)), 10);
    }

    #[test]
    fn test_range() {
        let rules = InvasionRules::default();
        let calc = LandCalculator::new(&rules);
        assert!(calc.is_in_range(Fixed::from_num(0.4)));
        assert!(calc.is_in_range(Fixed::from_num(2.5)));
        assert!(!calc.is_in_range(Fixed::from_num(0.39)));
        assert!(!calc.is_in_range(Fixed::from_num(2.51)));
    }

    #[test]
    fn test_land_lost_sums_exactly() {
        let target = defender();
        for acres in [1, 7, 33, 60, 499, 500, 900] {
            let lost = LandCalculator::land_lost(&target, acres);
            assert_eq!(lost.total(), acres.min(500), "acres {acres}");
            for (land, amount) in lost.iter() {
                assert!(amount <= target.land[land]);
            }
        }
    }

    #[test]
    fn test_barren_land_goes_first() {
        let mut target = defender();
        target.buildings.set(BuildingType::Farm, 200);
        let queue = TickQueue::new();
        let losses = LandCalculator::buildings_lost(&target, &queue, LandType::Plain, 100);
        assert!(losses.is_empty());

        let losses = LandCalculator::buildings_lost(&target, &queue, LandType::Plain, 150);
        assert_eq!(losses.len(), 1);
        assert_eq!(losses[0].built, 50);
    }

    #[test]
    fn test_constructing_share_is_split() {
        let mut target = defender();
        target.buildings.set(BuildingType::Farm, 200);
        let mut queue = TickQueue::new();
        queue.queue_resources(
            QueueChannel::Construction,
            target.id,
            &[(QueueResource::Building(BuildingType::Farm), 100)],
            6,
        );
        let losses = LandCalculator::buildings_lost(&target, &queue, LandType::Plain, 30);
        assert_eq!(losses[0].built + losses[0].constructing, 30);
        assert_eq!(losses[0].constructing, 10);
    }
}
