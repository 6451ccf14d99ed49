//! Morale changes.

use crate::error::InvasionError;
use crate::land::BuildingType;
use crate::math::floor_count;
use crate::perks::RacePerk;

use super::Battle;

impl Battle<'_> {
    pub(super) fn handle_morale(&mut self) -> Result<(), InvasionError> {
        let rules = &self.rules.morale;
        let (attacker_change, defender_change) = if self.success {
            let change = rules
                .success_bands
                .iter()
                .find(|band| self.land_ratio < band.below)
                .map_or(rules.success_top, |band| band.change);
            let defender = if change > 0 { -change } else { 0 };
            let mut attacker = change;
            if self.attacker_race.perks.has(RacePerk::MoraleFromGryphonNests) {
                let nests = self.attacking().building_percentage(BuildingType::GryphonNest);
                attacker += floor_count(nests) as i64;
            }
            (attacker, defender)
        } else if self.overwhelmed {
            (rules.overwhelmed_attacker, 0)
        } else {
            (rules.failure_attacker, rules.failure_defender)
        };

        self.report.attacker.morale_change = shift_morale(&mut self.attacker.morale, attacker_change);
        self.report.defender.morale_change = shift_morale(&mut self.defender.morale, defender_change);
        Ok(())
    }
}

/// Apply a change, flooring at zero; returns the change actually applied.
fn shift_morale(morale: &mut u32, change: i64) -> i64 {
    let before = i64::from(*morale);
    let after = (before + change).clamp(0, i64::from(u32::MAX));
    *morale = u32::try_from(after).unwrap_or(u32::MAX);
    after - before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_morale_floors_at_zero() {
        let mut morale = 15;
        assert_eq!(shift_morale(&mut morale, -20), -15);
        assert_eq!(morale, 0);
        assert_eq!(shift_morale(&mut morale, -10), 0);
        assert_eq!(morale, 0);
    }

    #[test]
    fn test_morale_is_not_capped_above() {
        let mut morale = 95;
        assert_eq!(shift_morale(&mut morale, 25), 25);
        assert_eq!(morale, 120);
    }
}
