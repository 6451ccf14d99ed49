//! Faction mechanics that run after land is settled.
//!
//! Each handler is keyed on a race capability or an active spell and reads
//! casualties as they stand once both sides have taken losses.

use crate::calculators::{PowerContext, PowerKind};
use crate::data::RaceData;
use crate::error::InvasionError;
use crate::factions::Capability;
use crate::math::{floor_count, fx, percent, ratio, round_count, Fixed};
use crate::perks::{slot_from_number, PerkAtom, RacePerk, SpellPerk, UnitPerk};
use crate::queue::{QueueChannel, QueueResource};
use crate::resources::Resource;
use crate::units::{UnitAttribute, UnitCounts, UnitSlot};

use super::{
    Battle, CollectionReport, CryptDeposit, CryptReport, MetabolismReport, QueueService, StunReport,
};

impl Battle<'_> {
    /// Zealots slay immortals on the other side and destroy its souls.
    pub(super) fn handle_zealots(&mut self) -> Result<(), InvasionError> {
        if self.overwhelmed {
            return Ok(());
        }
        let factions = &self.rules.factions;
        if self.attacker_race.has_capability(Capability::ImmortalSlaying) {
            let zealots = count_with_perk(self.attacker_race, &self.units_sent, UnitPerk::KillsImmortal)?;
            let mut immortals = UnitCounts::ZERO;
            for (slot, home) in self.defender.military.units.iter() {
                let unit = self.defender_race.unit(slot)?;
                if home > 0 && unit.defense != Fixed::ZERO && unit.is_immortal() {
                    immortals[slot] = home;
                }
            }
            let slain = slay(&immortals, zealots, factions.immortals_per_zealot, factions.immortal_kill_ratio);
            self.defender.military.units = self.defender.military.units.saturating_sub(&slain);
            self.defender.stats.total_units_lost = self.defender.stats.total_units_lost.saturating_add(&slain);
            self.attacker.stats.total_units_killed += slain.total();
            self.report.defender.units_lost = self.report.defender.units_lost.saturating_add(&slain);

            let destroyers = count_with_perk(self.attacker_race, &self.units_sent, UnitPerk::DestroysSouls)?;
            let destroyed = destroy_souls(
                &mut self.defender.resources[Resource::Soul],
                destroyers * factions.souls_per_zealot,
                factions.soul_destruction_offense,
            );
            self.defender.stats.total_souls_destroyed += destroyed;
            self.report.attacker.souls_destroyed = destroyed;
        } else if self.defender_race.has_capability(Capability::ImmortalSlaying) {
            let home = self.defender.military.units;
            let zealots = count_with_perk(self.defender_race, &home, UnitPerk::KillsImmortal)?;
            let mut immortals = UnitCounts::ZERO;
            for (slot, surviving) in self.report.attacker.surviving_units.iter() {
                if surviving > 0 && self.attacker_race.unit(slot)?.is_immortal() {
                    immortals[slot] = surviving;
                }
            }
            let slain = slay(&immortals, zealots, factions.immortals_per_zealot, factions.immortal_kill_ratio);
            let report = &mut self.report.attacker;
            report.surviving_units = report.surviving_units.saturating_sub(&slain);
            report.units_lost = report.units_lost.saturating_add(&slain);
            self.attacker.stats.total_units_lost = self.attacker.stats.total_units_lost.saturating_add(&slain);
            self.defender.stats.total_units_killed += slain.total();

            let destroyers = count_with_perk(self.defender_race, &home, UnitPerk::DestroysSouls)?;
            let destroyed = destroy_souls(
                &mut self.attacker.resources[Resource::Soul],
                destroyers * factions.souls_per_zealot,
                factions.soul_destruction_defense,
            );
            self.attacker.stats.total_souls_destroyed += destroyed;
            self.report.defender.souls_destroyed = destroyed;
        }
        Ok(())
    }

    /// Captured invaders become thralls instead of being released.
    pub(super) fn handle_menticide(&mut self) -> Result<(), InvasionError> {
        if self.controlled.is_empty() {
            return Ok(());
        }
        let Some(value) = self.spells.perk(&self.defender.spells, SpellPerk::Menticide)? else {
            return Ok(());
        };
        let slot = match value.as_list().first().and_then(PerkAtom::as_number) {
            Some(number) => slot_from_number(SpellPerk::Menticide, number)?,
            None => UnitSlot::One,
        };

        let thralls = self.released.total();
        self.defender.military.units[slot] += thralls;
        self.released = UnitCounts::ZERO;
        if let Some(report) = self.report.defender.mind_control.as_mut() {
            report.released = UnitCounts::ZERO;
            report.menticide = true;
            report.thralls = thralls;
        }
        tracing::debug!(defender = self.defender.id, thralls, "Menticide");
        Ok(())
    }

    /// Stunning units knock out a share of the defender's weaker units for
    /// a couple of ticks.
    ///
    /// `share = min(stun_ratio% × op/dp × stunning OP share, stun_max%)`
    pub(super) fn handle_stun(&mut self, queue: &mut dyn QueueService) -> Result<(), InvasionError> {
        let military = self.military();
        let attacker = self.attacking();
        let context = self.power_context();
        let mut raw_op = Fixed::ZERO;
        let mut stunning_op = Fixed::ZERO;
        for (slot, count) in self.fighting.iter() {
            if count == 0 {
                continue;
            }
            let power = fx(count) * military.unit_power(attacker, slot, PowerKind::Offense, &self.fighting, context)?;
            raw_op += power;
            if self.attacker_race.unit(slot)?.perks.has(UnitPerk::StunsUnits) {
                stunning_op += power;
            }
        }
        if stunning_op == Fixed::ZERO {
            return Ok(());
        }

        let battle = &self.rules.battle;
        let share = (percent(battle.stun_ratio) * self.op_dp_ratio() * ratio(stunning_op, raw_op).min(Fixed::ONE))
            .min(percent(battle.stun_max_percentage));

        let defender = self.defending();
        let home = self.defender.military.units;
        let mut stunned = StunReport::default();
        for (slot, count) in home.iter() {
            if count == 0 {
                continue;
            }
            let unit = self.defender_race.unit(slot)?;
            if unit.has_any_attribute(&UnitAttribute::STUN_IMMUNE) {
                continue;
            }
            let defense = military.unit_power(defender, slot, PowerKind::Defense, &home, PowerContext::default())?;
            if defense >= battle.stun_max_defense {
                continue;
            }
            stunned.units[slot] = round_count(fx(count) * share).min(count);
        }
        stunned.draftees = round_count(fx(self.defender.military.draftees) * share).min(self.defender.military.draftees);

        if stunned.units.is_empty() && stunned.draftees == 0 {
            return Ok(());
        }
        self.defender.military.units = self.defender.military.units.saturating_sub(&stunned.units);
        self.defender.military.draftees -= stunned.draftees;

        let mut deltas: Vec<(QueueResource, i64)> = stunned
            .units
            .iter()
            .map(|(slot, count)| (QueueResource::Unit(slot), count as i64))
            .collect();
        deltas.push((QueueResource::Draftees, stunned.draftees as i64));
        queue.queue_resources(QueueChannel::Invasion, self.defender.id, &deltas, self.rules.timing.stun_ticks);

        self.attacker.stats.total_units_stunned += stunned.units.total() + stunned.draftees;
        self.report.defender.stun = Some(stunned);
        Ok(())
    }

    /// Souls, blood and food from the enemy dead. Only one side may collect.
    pub(super) fn handle_soul_collection(&mut self, queue: &mut dyn QueueService) -> Result<(), InvasionError> {
        let attacker_collects = self.attacker_race.has_capability(Capability::SoulCollection);
        let defender_collects = self.defender_race.has_capability(Capability::SoulCollection);
        let factions = &self.rules.factions;

        if attacker_collects && !defender_collects {
            let lost = self.report.defender.units_lost;
            let draftees = self.report.defender.draftees_lost;
            let power_slain = self.defensive_power_of(&lost, draftees)?;
            let reduced = self.defender_race.perk_multiplier(RacePerk::ReducedConversions);
            let collection = CollectionReport {
                power_slain,
                souls: floor_count(fx(lost.total() + draftees) * (Fixed::ONE - reduced).max(Fixed::ZERO)),
                blood: floor_count(power_slain.saturating_mul(factions.blood_per_power)),
                food: floor_count(power_slain.saturating_mul(factions.food_per_defense_slain)),
            };
            queue.queue_resources(
                QueueChannel::Invasion,
                self.attacker.id,
                &[
                    (QueueResource::Resource(Resource::Soul), collection.souls as i64),
                    (QueueResource::Resource(Resource::Blood), collection.blood as i64),
                    (QueueResource::Resource(Resource::Food), collection.food as i64),
                ],
                self.rules.timing.unit_return_ticks,
            );
            record_collection(&mut self.attacker.stats, &collection);
            self.report.attacker.collection = Some(collection);
        } else if defender_collects && !attacker_collects {
            let lost = self.report.attacker.units_lost;
            let power_slain = self.military().raw_power(
                self.attacking(),
                PowerKind::Offense,
                &lost,
                PowerContext::against(self.land_ratio),
            )?;
            let reduced = self.attacker_race.perk_multiplier(RacePerk::ReducedConversions);
            let collection = CollectionReport {
                power_slain,
                souls: floor_count(fx(lost.total()) * (Fixed::ONE - reduced).max(Fixed::ZERO)),
                blood: floor_count(power_slain.saturating_mul(factions.blood_per_power)),
                food: floor_count(fx(lost.total()) * factions.food_per_casualty),
            };
            let resources = &mut self.defender.resources;
            resources.add(Resource::Soul, collection.souls);
            resources.add(Resource::Blood, collection.blood);
            resources.add(Resource::Food, collection.food);
            record_collection(&mut self.defender.stats, &collection);
            self.report.defender.collection = Some(collection);
        }
        Ok(())
    }

    /// Fallen first-slot units of a champion race become champions.
    pub(super) fn handle_champions(&mut self, queue: &mut dyn QueueService) -> Result<(), InvasionError> {
        let fallen = self.report.attacker.units_lost[UnitSlot::One];
        if !self.attacker_race.has_capability(Capability::ChampionCreation)
            || !self.success
            || self.land_ratio < self.rules.factions.champion_min_ratio
            || fallen == 0
        {
            return Ok(());
        }
        queue.queue_resources(
            QueueChannel::Invasion,
            self.attacker.id,
            &[(QueueResource::Resource(Resource::Champion), fallen as i64)],
            self.rules.timing.unit_return_ticks,
        );
        self.attacker.stats.total_champions_created += fallen;
        self.report.attacker.champions = fallen;
        Ok(())
    }

    /// A metabolism spell eats the enemy dead for food.
    pub(super) fn handle_metabolism(&mut self, queue: &mut dyn QueueService) -> Result<(), InvasionError> {
        let factions = &self.rules.factions;
        if self.spells.has_perk(&self.attacker.spells, SpellPerk::Metabolism)? {
            let eaten = edible(self.defender_race, &self.report.defender.units_lost)?;
            let draftees = self.report.defender.draftees_lost;
            let power_eaten = self.defensive_power_of(&eaten, draftees)?;
            let food = floor_count(power_eaten.saturating_mul(factions.metabolism_offense_food));
            queue.queue_resources(
                QueueChannel::Invasion,
                self.attacker.id,
                &[(QueueResource::Resource(Resource::Food), food as i64)],
                self.rules.timing.unit_return_ticks,
            );
            self.report.attacker.metabolism = Some(MetabolismReport {
                units_eaten: eaten,
                draftees_eaten: draftees,
                power_eaten,
                food,
            });
        } else if self.spells.has_perk(&self.defender.spells, SpellPerk::Metabolism)? {
            let eaten = edible(self.attacker_race, &self.report.attacker.units_lost)?;
            let power_eaten = self.military().raw_power(
                self.attacking(),
                PowerKind::Offense,
                &eaten,
                PowerContext::against(self.land_ratio),
            )?;
            let food = floor_count(power_eaten.saturating_mul(factions.metabolism_defense_food));
            self.defender.resources.add(Resource::Food, food);
            self.report.defender.metabolism = Some(MetabolismReport {
                units_eaten: eaten,
                draftees_eaten: 0,
                power_eaten,
                food,
            });
        }
        Ok(())
    }

    /// Bodies for the realm crypt. An attacking crypt race takes precedence.
    pub(super) fn handle_crypt(&mut self) -> Result<(), InvasionError> {
        let attacker_owns = self.attacker_race.has_capability(Capability::ImperialCrypt);
        if !attacker_owns && !self.defender_race.has_capability(Capability::ImperialCrypt) {
            return Ok(());
        }

        let defender_lost = self.report.defender.units_lost;
        let attacker_lost = self.report.attacker.units_lost;
        let mut defensive = fx(round_count(
            fx(defender_lost.total() + self.report.defender.draftees_lost)
                * (Fixed::ONE - self.defender_race.perk_multiplier(RacePerk::ReducedConversions)).max(Fixed::ZERO),
        ));
        let mut offensive = fx(round_count(
            fx(attacker_lost.total())
                * (Fixed::ONE - self.attacker_race.perk_multiplier(RacePerk::ReducedConversions)).max(Fixed::ZERO),
        ));
        defensive -= fx(without_body(self.defender_race, &defender_lost)?);
        offensive -= fx(without_body(self.attacker_race, &attacker_lost)?);
        defensive -= fx(self.report.attacker.conversions.total());
        offensive -= fx(self.report.defender.conversions.total());

        let half = Fixed::from_num(2);
        let (defensive, offensive) = match (attacker_owns, self.success) {
            (true, true) => (defensive / half, offensive),
            (true, false) => (Fixed::ZERO, Fixed::ZERO),
            (false, true) => (defensive / half, Fixed::ZERO),
            (false, false) => (defensive, offensive),
        };
        let total = round_count((defensive + offensive).max(Fixed::ZERO));
        let report = CryptReport {
            defensive_bodies: defensive,
            offensive_bodies: offensive,
            total,
        };

        let realm = if attacker_owns {
            self.report.attacker.crypt = Some(report);
            self.attacker.realm_id
        } else {
            self.report.defender.crypt = Some(report);
            self.defender.realm_id
        };
        self.realm_effects.crypt = Some(CryptDeposit { realm, bodies: total });
        Ok(())
    }

    /// Raw DP of defender units plus draftees.
    fn defensive_power_of(&self, units: &UnitCounts, draftees: u64) -> Result<Fixed, InvasionError> {
        let power = self
            .military()
            .raw_power(self.defending(), PowerKind::Defense, units, PowerContext::default())?;
        Ok(power.saturating_add(fx(draftees).saturating_mul(self.rules.battle.draftee_defense)))
    }
}

fn count_with_perk(race: &RaceData, units: &UnitCounts, perk: UnitPerk) -> Result<u64, InvasionError> {
    let mut total = 0;
    for (slot, count) in units.iter() {
        if count > 0 && race.unit(slot)?.perks.has(perk) {
            total += count;
        }
    }
    Ok(total)
}

/// `min(zealots × per zealot, immortals × ratio)`, split by each slot's share.
fn slay(immortals: &UnitCounts, zealots: u64, per_zealot: u64, kill_ratio: Fixed) -> UnitCounts {
    let total = immortals.total();
    let mut slain = UnitCounts::ZERO;
    if total == 0 || zealots == 0 {
        return slain;
    }
    let killed = fx(zealots.saturating_mul(per_zealot)).min(fx(total) * kill_ratio);
    for (slot, count) in immortals.iter() {
        slain[slot] = floor_count(killed * ratio(fx(count), fx(total))).min(count);
    }
    slain
}

fn destroy_souls(souls: &mut u64, capacity: u64, share: Fixed) -> u64 {
    if *souls == 0 {
        return 0;
    }
    let destroyed = floor_count((fx(*souls) * share).min(fx(capacity))).min(*souls);
    *souls -= destroyed;
    destroyed
}

fn edible(race: &RaceData, lost: &UnitCounts) -> Result<UnitCounts, InvasionError> {
    let mut eaten = UnitCounts::ZERO;
    for (slot, count) in lost.iter() {
        if count > 0 && !race.unit(slot)?.has_any_attribute(&UnitAttribute::INEDIBLE) {
            eaten[slot] = count;
        }
    }
    Ok(eaten)
}

fn without_body(race: &RaceData, lost: &UnitCounts) -> Result<u64, InvasionError> {
    let mut total = 0;
    for (slot, count) in lost.iter() {
        if count > 0 && race.unit(slot)?.has_any_attribute(&UnitAttribute::NO_BODY) {
            total += count;
        }
    }
    Ok(total)
}

fn record_collection(stats: &mut crate::dominion::DominionStats, collection: &CollectionReport) {
    stats.total_souls_collected += collection.souls;
    stats.total_blood_collected += collection.blood;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slay_is_capped_by_immortal_share() {
        let immortals = UnitCounts::from_pairs(&[(UnitSlot::Two, 750), (UnitSlot::Four, 250)]);
        // 4% of 1000 immortals caps 100 zealots × 2.
        let slain = slay(&immortals, 100, 2, Fixed::from_num(0.04));
        assert_eq!(slain[UnitSlot::Two], 30);
        assert_eq!(slain[UnitSlot::Four], 10);

        let slain = slay(&immortals, 5, 2, Fixed::from_num(0.04));
        assert_eq!(slain.total(), 10);
    }

    #[test]
    fn test_slay_without_zealots_kills_nothing() {
        let immortals = UnitCounts::from_pairs(&[(UnitSlot::One, 100)]);
        assert!(slay(&immortals, 0, 2, Fixed::from_num(0.04)).is_empty());
    }

    #[test]
    fn test_souls_destroyed_by_share_or_capacity() {
        let mut souls = 1000;
        assert_eq!(destroy_souls(&mut souls, 500, Fixed::from_num(0.04)), 40);
        assert_eq!(souls, 960);
        assert_eq!(destroy_souls(&mut souls, 10, Fixed::from_num(0.08)), 10);
        let mut none = 0;
        assert_eq!(destroy_souls(&mut none, 10, Fixed::from_num(0.08)), 0);
    }
}
