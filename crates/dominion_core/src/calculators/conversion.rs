//! Units gained from the enemy dead.
//!
//! A converting unit claims a share of the convertible enemy casualties in
//! proportion to its share of its side's raw power in the battle. Perk forms:
//!
//! | Perk                  | Value                        | Target slot                          |
//! |-----------------------|------------------------------|--------------------------------------|
//! | `conversion`          | `"3"`, `"34"`                | listed slots, split evenly           |
//! | `staggered_conversion`| `"60,3;75,4"`                | highest land-ratio band reached      |
//! | `strength_conversion` | `"limit,weaker,stronger"`    | by raw power of each slain unit      |
//! | `value_conversion`    | `"multiplier,slot"`          | slain raw power × multiplier / power |

use crate::error::Result;
use crate::math::{floor_count, fx, ratio, Fixed};
use crate::perks::{slot_from_number, PerkAtom, RacePerk, SpellPerk, TechPerk, UnitPerk};
use crate::rules::InvasionRules;
use crate::spells::SpellBook;
use crate::units::{UnitAttribute, UnitCounts, UnitSlot};

use super::military::{MilitaryCalculator, PowerContext, PowerKind};
use super::Combatant;

/// Battle facts conversions depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionContext {
    /// Defender land / attacker land.
    pub land_ratio: Fixed,
    /// Whether the attacker won.
    pub success: bool,
    /// Units actually fighting for the attacker.
    pub units_sent: UnitCounts,
    /// Attacker casualties.
    pub attacker_units_lost: UnitCounts,
    /// Defender casualties.
    pub defender_units_lost: UnitCounts,
    /// Defender draftee casualties.
    pub defender_draftees_lost: u64,
}

/// Converted units per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Conversions {
    /// New units for the attacker, returning with the army.
    pub attacker: UnitCounts,
    /// New units for the defender.
    pub defender: UnitCounts,
}

/// Conversion calculator.
#[derive(Debug, Clone, Copy)]
pub struct ConversionCalculator<'a> {
    rules: &'a InvasionRules,
    spells: &'a SpellBook,
}

/// Slain units of one side, with their raw power.
struct Slain {
    count: u64,
    power: Fixed,
}

impl<'a> ConversionCalculator<'a> {
    /// Create a calculator over rules and spell definitions.
    #[must_use]
    pub const fn new(rules: &'a InvasionRules, spells: &'a SpellBook) -> Self {
        Self { rules, spells }
    }

    /// Conversions for both sides.
    ///
    /// Attackers convert only on success, defenders only on failure.
    pub fn conversions(
        &self,
        attacker: Combatant<'_>,
        defender: Combatant<'_>,
        context: &ConversionContext,
    ) -> Result<Conversions> {
        let mut conversions = Conversions::default();
        if context.success {
            let slain = self.slain(defender, &context.defender_units_lost, context.defender_draftees_lost, PowerKind::Defense)?;
            conversions.attacker = self.convert(attacker, defender, &context.units_sent, PowerKind::Offense, &slain, context.land_ratio)?;
        } else {
            let slain = self.slain(attacker, &context.attacker_units_lost, 0, PowerKind::Offense)?;
            let home = defender.dominion.military.units;
            conversions.defender = self.convert(defender, attacker, &home, PowerKind::Defense, &slain, context.land_ratio)?;
        }
        Ok(conversions)
    }

    /// Convertible casualties of a side.
    fn slain(&self, victim: Combatant<'_>, lost: &UnitCounts, draftees: u64, kind: PowerKind) -> Result<Vec<Slain>> {
        let military = MilitaryCalculator::new(self.rules, self.spells);
        let mut slain = Vec::new();
        for (slot, count) in lost.iter() {
            if count == 0 || victim.unit(slot)?.has_any_attribute(&UnitAttribute::UNCONVERTIBLE) {
                continue;
            }
            let power = military.unit_power(victim, slot, kind, lost, PowerContext::default())?;
            slain.push(Slain { count, power });
        }
        if draftees > 0 {
            slain.push(Slain {
                count: draftees,
                power: self.rules.battle.draftee_defense,
            });
        }
        Ok(slain)
    }

    fn convert(
        &self,
        converter: Combatant<'_>,
        victim: Combatant<'_>,
        force: &UnitCounts,
        kind: PowerKind,
        slain: &[Slain],
        land_ratio: Fixed,
    ) -> Result<UnitCounts> {
        let mut converted = UnitCounts::ZERO;
        if slain.is_empty()
            || self.spells.has_perk(&victim.dominion.spells, SpellPerk::NoConversions)?
        {
            return Ok(converted);
        }

        let military = MilitaryCalculator::new(self.rules, self.spells);
        let total_power = military.raw_power(converter, kind, force, PowerContext::against(land_ratio))?;
        if total_power == Fixed::ZERO {
            return Ok(converted);
        }

        let multiplier = (Fixed::ONE
            + converter.race.perk_multiplier(RacePerk::Conversions)
            + converter.dominion.tech_perks.multiplier(TechPerk::Conversions)
            + self.spells.perk_multiplier(&converter.dominion.spells, SpellPerk::Conversions)?)
            * (Fixed::ONE - victim.race.perk_multiplier(RacePerk::ReducedConversions)).max(Fixed::ZERO);

        let slain_count: u64 = slain.iter().map(|s| s.count).sum();
        let slain_power: Fixed = slain.iter().map(|s| fx(s.count) * s.power).sum();

        for (slot, count) in force.iter() {
            if count == 0 {
                continue;
            }
            let perks = &converter.unit(slot)?.perks;
            let unit_power = military.unit_power(converter, slot, kind, force, PowerContext::against(land_ratio))?;
            let share = ratio(fx(count) * unit_power, total_power) * multiplier;
            if share == Fixed::ZERO {
                continue;
            }

            let targets = crate::data::conversion_targets(perks)?;
            if !targets.is_empty() {
                split_into(&mut converted, &targets, fx(slain_count) * share);
            }

            let bands = perks.groups(UnitPerk::StaggeredConversion);
            let mut band_target = None;
            for group in &bands {
                let threshold = group.first().and_then(PerkAtom::as_number).unwrap_or(Fixed::MAX);
                if land_ratio * Fixed::from_num(100) >= threshold {
                    if let Some(number) = group.get(1).and_then(PerkAtom::as_number) {
                        band_target = Some(slot_from_number(UnitPerk::StaggeredConversion, number)?);
                    }
                }
            }
            if let Some(target) = band_target {
                converted[target] += floor_count(fx(slain_count) * share);
            }

            if let Some(limit) = perks.number_at(UnitPerk::StrengthConversion, 0)? {
                let weaker = perks.number_at(UnitPerk::StrengthConversion, 1)?.unwrap_or(Fixed::ZERO);
                let stronger = perks.number_at(UnitPerk::StrengthConversion, 2)?.unwrap_or(Fixed::ZERO);
                let weaker = slot_from_number(UnitPerk::StrengthConversion, weaker)?;
                let stronger = slot_from_number(UnitPerk::StrengthConversion, stronger)?;
                let (mut below, mut above) = (Fixed::ZERO, Fixed::ZERO);
                for s in slain {
                    if s.power < limit {
                        below += fx(s.count);
                    } else {
                        above += fx(s.count);
                    }
                }
                converted[weaker] += floor_count(below * share);
                converted[stronger] += floor_count(above * share);
            }

            if let Some(value) = perks.number_at(UnitPerk::ValueConversion, 0)? {
                let target = perks.number_at(UnitPerk::ValueConversion, 1)?.unwrap_or(Fixed::ZERO);
                let target = slot_from_number(UnitPerk::ValueConversion, target)?;
                let target_unit = converter.unit(target)?;
                let worth = target_unit.offense.max(target_unit.defense).max(Fixed::ONE);
                converted[target] += floor_count(slain_power.saturating_mul(share).saturating_mul(value) / worth);
            }
        }

        Ok(converted)
    }
}

fn split_into(converted: &mut UnitCounts, targets: &[UnitSlot], amount: Fixed) {
    let each = amount / fx(targets.len() as u64);
    for &target in targets {
        converted[target] += floor_count(each);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RaceData, UnitData};
    use crate::dominion::Dominion;
    use crate::factions::Alignment;
    use crate::land::{LandHoldings, LandType};
    use crate::perks::PerkSet;

    fn race(key: &str, converter: PerkSet) -> RaceData {
        let unit = |slot, op: i32, dp: i32| {
            UnitData::new(slot, format!("Unit {slot}"), Fixed::from_num(op), Fixed::from_num(dp))
        };
        RaceData {
            key: key.to_string(),
            name: key.to_string(),
            alignment: Alignment::Evil,
            home_land_type: LandType::Swamp,
            boat_capacity: 30,
            construction_materials: Vec::new(),
            capabilities: Vec::new(),
            perks: PerkSet::new(),
            units: vec![
                unit(UnitSlot::One, 4, 0).with_perks(converter),
                unit(UnitSlot::Two, 0, 3),
                unit(UnitSlot::Three, 0, 5),
                unit(UnitSlot::Four, 5, 2),
            ],
        }
    }

    fn dominion(id: u64) -> Dominion {
        let mut dominion = Dominion::new(id, "Test", id, 1, "test");
        dominion.land = LandHoldings::new().with(LandType::Swamp, 500);
        dominion
    }

    fn context(success: bool) -> ConversionContext {
        ConversionContext {
            land_ratio: Fixed::from_num(0.8),
            success,
            units_sent: UnitCounts([100, 0, 0, 0]),
            attacker_units_lost: UnitCounts([9, 0, 0, 0]),
            defender_units_lost: UnitCounts([0, 20, 10, 0]),
            defender_draftees_lost: 10,
        }
    }

    #[test]
    fn test_plain_conversion_takes_whole_share() {
        let rules = InvasionRules::default();
        let spells = SpellBook::new();
        let calc = ConversionCalculator::new(&rules, &spells);
        let converter = race("undead", PerkSet::new().with(UnitPerk::Conversion, "3").expect("perk"));
        let victim = race("human", PerkSet::new());
        let (a, d) = (dominion(1), dominion(2));

        let result = calc
            .conversions(Combatant::new(&a, &converter), Combatant::new(&d, &victim), &context(true))
            .expect("conversions");
        assert_eq!(result.attacker, UnitCounts([0, 0, 40, 0]));
        assert_eq!(result.defender, UnitCounts::ZERO);
    }

    #[test]
    fn test_staggered_conversion_picks_band() {
        let rules = InvasionRules::default();
        let spells = SpellBook::new();
        let calc = ConversionCalculator::new(&rules, &spells);
        let perks = PerkSet::new().with(UnitPerk::StaggeredConversion, "60,2;75,4").expect("perk");
        let converter = race("lycan", perks);
        let victim = race("human", PerkSet::new());
        let (a, d) = (dominion(1), dominion(2));

        let result = calc
            .conversions(Combatant::new(&a, &converter), Combatant::new(&d, &victim), &context(true))
            .expect("conversions");
        assert_eq!(result.attacker, UnitCounts([0, 0, 0, 40]));
    }

    #[test]
    fn test_no_conversions_on_failure_for_attacker() {
        let rules = InvasionRules::default();
        let spells = SpellBook::new();
        let calc = ConversionCalculator::new(&rules, &spells);
        let converter = race("undead", PerkSet::new().with(UnitPerk::Conversion, "3").expect("perk"));
        let victim = race("human", PerkSet::new());
        let (a, d) = (dominion(1), dominion(2));

        let result = calc
            .conversions(Combatant::new(&a, &converter), Combatant::new(&d, &victim), &context(false))
            .expect("conversions");
        assert!(result.attacker.is_empty());
    }
}
