//! Unit perks that hit the defender before casualties: burning and eating
//! peasants, eating draftees and damaging improvements.

use crate::error::InvasionError;
use crate::improvements::Improvement;
use crate::land::BuildingType;
use crate::math::{floor_count, fx, ratio, Fixed};
use crate::perks::UnitPerk;

use super::{Battle, BattleEffects};

impl Battle<'_> {
    pub(super) fn handle_battle_perks(&mut self) -> Result<(), InvasionError> {
        if self.overwhelmed {
            return Ok(());
        }

        let mut effects = BattleEffects::default();
        let mut improvement_damage = Fixed::ZERO;
        for (slot, count) in self.fighting.iter() {
            if count == 0 {
                continue;
            }
            let perks = &self.attacker_race.unit(slot)?.perks;
            let per_unit = |perk: UnitPerk| floor_count(fx(count) * perks.value(perk));

            let burned = per_unit(UnitPerk::BurnsPeasantsOnAttack).min(self.spare_peasants());
            self.defender.peasants -= burned;
            effects.peasants_burned += burned;

            let eaten = per_unit(UnitPerk::EatsPeasantsOnAttack).min(self.spare_peasants());
            self.defender.peasants -= eaten;
            effects.peasants_eaten += eaten;

            let draftees = per_unit(UnitPerk::EatsDrafteesOnAttack).min(self.defender.military.draftees);
            self.defender.military.draftees -= draftees;
            effects.draftees_eaten += draftees;

            improvement_damage += fx(count) * perks.value(UnitPerk::DamagesImprovementsOnAttack);
        }

        if improvement_damage > Fixed::ZERO {
            effects.improvement_damage = self.damage_improvements(improvement_damage);
        }

        let stats = &mut self.attacker.stats;
        stats.total_peasants_killed += effects.peasants_burned + effects.peasants_eaten;
        stats.total_draftees_eaten += effects.draftees_eaten;
        stats.total_improvements_damaged += effects.improvement_damage;
        self.report.defender.battle_effects = effects;
        Ok(())
    }

    /// Peasants above the floor that can still be killed.
    fn spare_peasants(&self) -> u64 {
        self.defender.peasants.saturating_sub(self.rules.factions.peasant_floor)
    }

    /// Spread damage over improvements by their share of points.
    fn damage_improvements(&mut self, damage: Fixed) -> u64 {
        let defender = &self.defender;
        let shield = ratio(fx(defender.building(BuildingType::Masonry)), fx(defender.total_land()))
            * self.rules.factions.masonry_damage_shield;
        let damage = damage * (Fixed::ONE - shield).max(Fixed::ZERO);

        let total_points = defender.improvements.total();
        if total_points == 0 {
            return 0;
        }
        let mut destroyed = 0;
        for improvement in Improvement::ALL {
            let points = self.defender.improvements.points(improvement);
            if points == 0 {
                continue;
            }
            let share = floor_count(damage * ratio(fx(points), fx(total_points)));
            destroyed += self.defender.improvements.damage(improvement, share);
        }
        destroyed
    }
}
