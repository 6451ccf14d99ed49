//! Casualty percentages and per-slot multipliers.
//!
//! The pipeline computes a base percentage for each side and multiplies it
//! by a per-slot multiplier from this module. A multiplier of zero means the
//! slot cannot die in this battle.
//!
//! Sign conventions: unit `fewer_casualties*` perks are positive reductions;
//! race, tech and spell `*casualties` perks are signed changes (negative
//! means fewer casualties).

use crate::data::UnitData;
use crate::error::Result;
use crate::improvements::Improvement;
use crate::land::BuildingType;
use crate::math::{fx, percent, ratio, Fixed};
use crate::perks::{RacePerk, SpellPerk, TechPerk, UnitPerk};
use crate::rules::InvasionRules;
use crate::spells::SpellBook;
use crate::units::{UnitCounts, UnitSlot};

use super::Combatant;

/// Battle facts casualty rules depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CasualtyContext {
    /// Defender land / attacker land.
    pub land_ratio: Fixed,
    /// Whether the attacker won.
    pub success: bool,
    /// Whether the attacker was overwhelmed.
    pub overwhelmed: bool,
    /// Units actually fighting for the attacker.
    pub units_sent: UnitCounts,
}

/// Casualty calculator.
#[derive(Debug, Clone, Copy)]
pub struct CasualtiesCalculator<'a> {
    rules: &'a InvasionRules,
    spells: &'a SpellBook,
}

impl<'a> CasualtiesCalculator<'a> {
    /// Create a calculator over rules and spell definitions.
    #[must_use]
    pub const fn new(rules: &'a InvasionRules, spells: &'a SpellBook) -> Self {
        Self { rules, spells }
    }

    /// Base offensive casualties as a fraction, after the defender's spells.
    pub fn offensive_percentage(
        &self,
        attacker: Combatant<'_>,
        defender: Combatant<'_>,
        context: &CasualtyContext,
    ) -> Result<Fixed> {
        let defender_spells = &defender.dominion.spells;
        let mut percentage = percent(self.rules.casualties.offensive_base);
        percentage *= Fixed::ONE
            + self
                .spells
                .perk_multiplier(defender_spells, SpellPerk::IncreasesCasualtiesOnOffense)?;
        percentage *= Fixed::ONE
            + attacker.wizard_ratio()
                * self
                    .spells
                    .perk_multiplier(defender_spells, SpellPerk::IncreasesCasualtiesFromWizardRatio)?;
        if !context.success && context.overwhelmed {
            percentage *= self.rules.casualties.overwhelmed_multiplier;
        }
        Ok(percentage)
    }

    /// Base defensive casualties as a fraction; zero when overwhelmed.
    ///
    /// `4.5% × min(1, ratio) × max(floor, 1 − recent / divisor) × op / dp`,
    /// capped at the maximum.
    #[must_use]
    pub fn defensive_percentage(&self, context: &CasualtyContext, recently_invaded: u64, op: Fixed, dp: Fixed) -> Fixed {
        if context.overwhelmed {
            return Fixed::ZERO;
        }
        let rules = &self.rules.casualties;
        let mut percentage = percent(rules.defensive_base) * context.land_ratio.min(Fixed::ONE);
        let recent = ratio(fx(recently_invaded), fx(rules.recent_invasion_divisor));
        percentage *= (Fixed::ONE - recent).max(rules.recent_invasion_floor);
        percentage *= ratio(op, dp);
        percentage.min(percent(rules.defensive_max))
    }

    /// Attacker spell effects on every defensive casualty.
    pub fn defensive_spell_multiplier(
        &self,
        attacker: Combatant<'_>,
        context: &CasualtyContext,
    ) -> Result<Fixed> {
        let attacker_spells = &attacker.dominion.spells;
        let mut multiplier = Fixed::ONE;
        if context.success && context.land_ratio >= self.rules.land.victory_ratio {
            multiplier += self
                .spells
                .perk_multiplier(attacker_spells, SpellPerk::IncreasesCasualtiesOnDefense)?;
        }
        multiplier *= Fixed::ONE
            + attacker.wizard_ratio()
                * self
                    .spells
                    .perk_multiplier(attacker_spells, SpellPerk::IncreasesCasualtiesFromWizardRatio)?;
        Ok(multiplier)
    }

    /// Extra factor on draftee casualties from the attacker's spells.
    pub fn draftee_multiplier(&self, attacker: Combatant<'_>) -> Result<Fixed> {
        Ok(Fixed::ONE
            + self
                .spells
                .perk_multiplier(&attacker.dominion.spells, SpellPerk::IncreasesEnemyDrafteeCasualties)?)
    }

    /// Per-slot multiplier for attacking units.
    pub fn offensive_multiplier(
        &self,
        attacker: Combatant<'_>,
        defender: Combatant<'_>,
        slot: UnitSlot,
        context: &CasualtyContext,
    ) -> Result<Fixed> {
        let unit = attacker.unit(slot)?;
        if self.is_immortal_on_offense(unit, defender, context)? {
            return Ok(Fixed::ZERO);
        }
        if unit.perks.has(UnitPerk::FixedCasualties) {
            return Ok(Fixed::ONE);
        }

        let reduction = unit.perks.multiplier(UnitPerk::FewerCasualties)
            + unit.perks.multiplier(UnitPerk::FewerCasualtiesOffense);
        let change = self.shared_change(attacker, RacePerk::OffensiveCasualties, TechPerk::OffensiveCasualties, SpellPerk::OffensiveCasualties)?;
        let increase = opponent_increase(
            defender,
            UnitPerk::IncreasesCasualtiesOnDefense,
            &defender.dominion.military.units,
        )?;
        Ok(self.bounded(Fixed::ONE + change + increase - reduction))
    }

    /// Per-slot multiplier for defending units; `None` means draftees.
    pub fn defensive_multiplier(
        &self,
        defender: Combatant<'_>,
        attacker: Combatant<'_>,
        slot: Option<UnitSlot>,
        context: &CasualtyContext,
    ) -> Result<Fixed> {
        let mut reduction = Fixed::ZERO;
        if let Some(slot) = slot {
            let unit = defender.unit(slot)?;
            if self.is_immortal_on_defense(unit, attacker, context)? {
                return Ok(Fixed::ZERO);
            }
            reduction += unit.perks.multiplier(UnitPerk::FewerCasualties)
                + unit.perks.multiplier(UnitPerk::FewerCasualtiesDefense);
        }
        let change = self.shared_change(defender, RacePerk::DefensiveCasualties, TechPerk::DefensiveCasualties, SpellPerk::DefensiveCasualties)?;
        let increase = opponent_increase(attacker, UnitPerk::IncreasesCasualtiesOnOffense, &context.units_sent)?;
        Ok(self.bounded(Fixed::ONE + change + increase - reduction))
    }

    /// Race, tech and spell changes plus infirmary, as a signed fraction.
    fn shared_change(
        &self,
        side: Combatant<'_>,
        race_perk: RacePerk,
        tech_perk: TechPerk,
        spell_perk: SpellPerk,
    ) -> Result<Fixed> {
        let dominion = side.dominion;
        let race = side.race.perk_multiplier(RacePerk::Casualties) + side.race.perk_multiplier(race_perk);
        let tech = dominion.tech_perks.multiplier(TechPerk::Casualties) + dominion.tech_perks.multiplier(tech_perk);
        let spells = self.spells.perk_multiplier(&dominion.spells, SpellPerk::Casualties)?
            + self.spells.perk_multiplier(&dominion.spells, spell_perk)?;
        let infirmary = dominion.improvements.multiplier(
            Improvement::Infirmary,
            side.total_land(),
            dominion.building(BuildingType::Masonry),
        );
        Ok(race + tech + spells - infirmary)
    }

    fn bounded(&self, multiplier: Fixed) -> Fixed {
        let floor = Fixed::ONE - percent(self.rules.casualties.maximum_reduction);
        multiplier.max(floor.max(Fixed::ZERO))
    }

    fn is_immortal_on_offense(
        &self,
        unit: &UnitData,
        defender: Combatant<'_>,
        context: &CasualtyContext,
    ) -> Result<bool> {
        let perks = &unit.perks;
        if perks.has(UnitPerk::TrueImmortal) {
            return Ok(true);
        }
        if perks.has(UnitPerk::Immortal) {
            let slain = context.overwhelmed
                || has_immortal_slayers(defender, &defender.dominion.military.units)?;
            return Ok(!slain);
        }
        if perks.has(UnitPerk::ImmortalOnVictory) && context.success {
            return Ok(true);
        }
        if perks.has(UnitPerk::ImmortalVsLandRange) {
            let minimum = perks.value(UnitPerk::ImmortalVsLandRange);
            return Ok(context.land_ratio * Fixed::from_num(100) >= minimum);
        }
        Ok(false)
    }

    fn is_immortal_on_defense(
        &self,
        unit: &UnitData,
        attacker: Combatant<'_>,
        context: &CasualtyContext,
    ) -> Result<bool> {
        if unit.perks.has(UnitPerk::TrueImmortal) {
            return Ok(true);
        }
        if unit.perks.has(UnitPerk::Immortal) {
            return Ok(!has_immortal_slayers(attacker, &context.units_sent)?);
        }
        Ok(false)
    }
}

fn has_immortal_slayers(side: Combatant<'_>, force: &UnitCounts) -> Result<bool> {
    for (slot, count) in force.iter() {
        if count > 0 && side.unit(slot)?.perks.has(UnitPerk::KillsImmortal) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Opponent perk weighted by each slot's share of the opposing force.
fn opponent_increase(opponent: Combatant<'_>, key: UnitPerk, force: &UnitCounts) -> Result<Fixed> {
    let total = fx(force.total());
    let mut increase = Fixed::ZERO;
    for (slot, count) in force.iter() {
        if count == 0 {
            continue;
        }
        let value = opponent.unit(slot)?.perks.multiplier(key);
        increase += value * ratio(fx(count), total);
    }
    Ok(increase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RaceData;
    use crate::dominion::Dominion;
    use crate::factions::Alignment;
    use crate::land::{LandHoldings, LandType};
    use crate::perks::PerkSet;

    fn race(unit_one: PerkSet) -> RaceData {
        let unit = |slot| UnitData::new(slot, format!("Unit {slot}"), Fixed::from_num(3), Fixed::from_num(3));
        RaceData {
            key: "test".to_string(),
            name: "Test".to_string(),
            alignment: Alignment::Neutral,
            home_land_type: LandType::Plain,
            boat_capacity: 30,
            construction_materials: Vec::new(),
            capabilities: Vec::new(),
            perks: PerkSet::new(),
            units: vec![
                unit(UnitSlot::One).with_perks(unit_one),
                unit(UnitSlot::Two),
                unit(UnitSlot::Three),
                unit(UnitSlot::Four),
            ],
        }
    }

    fn context(success: bool, overwhelmed: bool) -> CasualtyContext {
        CasualtyContext {
            land_ratio: Fixed::from_num(0.8),
            success,
            overwhelmed,
            units_sent: UnitCounts([100, 0, 0, 0]),
        }
    }

    fn dominion() -> Dominion {
        let mut dominion = Dominion::new(1, "Test", 1, 1, "test");
        dominion.land = LandHoldings::new().with(LandType::Plain, 500);
        dominion
    }

    #[test]
    fn test_defensive_percentage_is_capped() {
        let rules = InvasionRules::default();
        let spells = SpellBook::new();
        let calc = CasualtiesCalculator::new(&rules, &spells);
        let mut ctx = context(true, false);
        ctx.land_ratio = Fixed::ONE;
        let pct = calc.defensive_percentage(&ctx, 0, Fixed::from_num(2000), Fixed::from_num(1000));
        assert_eq!(pct, percent(Fixed::from_num(6)));
    }

    #[test]
    fn test_defensive_percentage_zero_when_overwhelmed() {
        let rules = InvasionRules::default();
        let spells = SpellBook::new();
        let calc = CasualtiesCalculator::new(&rules, &spells);
        let pct = calc.defensive_percentage(&context(false, true), 0, Fixed::from_num(500), Fixed::from_num(650));
        assert_eq!(pct, Fixed::ZERO);
    }

    #[test]
    fn test_overwhelmed_doubles_offensive_percentage() {
        let rules = InvasionRules::default();
        let spells = SpellBook::new();
        let calc = CasualtiesCalculator::new(&rules, &spells);
        let race = race(PerkSet::new());
        let (a, d) = (dominion(), dominion());
        let (attacker, defender) = (Combatant::new(&a, &race), Combatant::new(&d, &race));
        let normal = calc.offensive_percentage(attacker, defender, &context(false, false)).expect("pct");
        let doubled = calc.offensive_percentage(attacker, defender, &context(false, true)).expect("pct");
        assert_eq!(doubled, normal * Fixed::from_num(2));
    }

    #[test]
    fn test_immortal_dies_when_overwhelmed() {
        let rules = InvasionRules::default();
        let spells = SpellBook::new();
        let calc = CasualtiesCalculator::new(&rules, &spells);
        let perks = PerkSet::new().with(UnitPerk::Immortal, "1").expect("perk");
        let race = race(perks);
        let (a, d) = (dominion(), dominion());
        let (attacker, defender) = (Combatant::new(&a, &race), Combatant::new(&d, &race));

        let safe = calc.offensive_multiplier(attacker, defender, UnitSlot::One, &context(false, false)).expect("mult");
        let slain = calc.offensive_multiplier(attacker, defender, UnitSlot::One, &context(false, true)).expect("mult");
        assert_eq!(safe, Fixed::ZERO);
        assert_eq!(slain, Fixed::ONE);
    }

    #[test]
    fn test_fewer_casualties_is_bounded() {
        let rules = InvasionRules::default();
        let spells = SpellBook::new();
        let calc = CasualtiesCalculator::new(&rules, &spells);
        let perks = PerkSet::new().with(UnitPerk::FewerCasualties, "150").expect("perk");
        let race = race(perks);
        let (a, d) = (dominion(), dominion());
        let multiplier = calc
            .offensive_multiplier(Combatant::new(&a, &race), Combatant::new(&d, &race), UnitSlot::One, &context(true, false))
            .expect("mult");
        assert_eq!(multiplier, Fixed::ONE - percent(Fixed::from_num(90)));
    }
}
