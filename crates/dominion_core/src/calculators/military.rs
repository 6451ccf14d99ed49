//! Offensive and defensive power.
//!
//! Power is computed in three layers:
//! - Raw power: unit counts times per-unit power, including conditional
//!   unit perks (land, buildings, pairing, spells, wizard ratio, land range)
//! - Modifiers: race, tech, spells, improvements and buildings
//! - Morale: `0.90 + morale / 1000`
//!
//! Every value is fixed-point, so identical inputs always produce the same
//! bits.

use crate::data::UnitData;
use crate::error::{GameError, Result};
use crate::improvements::Improvement;
use crate::land::{BuildingType, LandType};
use crate::math::{ceil_count, checked_add, checked_fx, checked_mul, floor_count, fx, percent, scale, Fixed};
use crate::perks::{PerkAtom, PerkKey, PerkSet, RacePerk, SpellPerk, TechPerk, UnitPerk};
use crate::rules::InvasionRules;
use crate::spells::SpellBook;
use crate::units::{UnitCounts, UnitSlot};

use super::Combatant;

/// Which power a unit contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerKind {
    /// Offensive power.
    Offense,
    /// Defensive power.
    Defense,
}

impl PowerKind {
    fn base(self, unit: &UnitData) -> Fixed {
        match self {
            Self::Offense => unit.offense,
            Self::Defense => unit.defense,
        }
    }

    const fn from_land(self) -> UnitPerk {
        match self {
            Self::Offense => UnitPerk::OffenseFromLand,
            Self::Defense => UnitPerk::DefenseFromLand,
        }
    }

    const fn from_building(self) -> UnitPerk {
        match self {
            Self::Offense => UnitPerk::OffenseFromBuilding,
            Self::Defense => UnitPerk::DefenseFromBuilding,
        }
    }

    const fn from_pairing(self) -> UnitPerk {
        match self {
            Self::Offense => UnitPerk::OffenseFromPairing,
            Self::Defense => UnitPerk::DefenseFromPairing,
        }
    }

    const fn from_spell(self) -> UnitPerk {
        match self {
            Self::Offense => UnitPerk::OffenseFromSpell,
            Self::Defense => UnitPerk::DefenseFromSpell,
        }
    }
}

/// Battle inputs that change unit power.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerContext {
    /// Defender land / attacker land, when a target is known.
    pub land_ratio: Option<Fixed>,
    /// Whether the attacker is retaliating against a recent hit on its realm.
    pub is_retaliation: bool,
}

impl PowerContext {
    /// Context against a target of the given land ratio.
    #[must_use]
    pub const fn against(land_ratio: Fixed) -> Self {
        Self {
            land_ratio: Some(land_ratio),
            is_retaliation: false,
        }
    }

    /// Builder: mark the attack as retaliation.
    #[must_use]
    pub const fn with_retaliation(mut self, is_retaliation: bool) -> Self {
        self.is_retaliation = is_retaliation;
        self
    }
}

/// Units standing in defense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DefendingForce {
    /// Units per slot.
    pub units: UnitCounts,
    /// Draftees.
    pub draftees: u64,
    /// Extra raw DP from captured invaders.
    pub extra_raw: Fixed,
}

impl DefendingForce {
    /// Everything at home.
    #[must_use]
    pub fn at_home(side: Combatant<'_>) -> Self {
        Self {
            units: side.dominion.military.units,
            draftees: side.dominion.military.draftees,
            extra_raw: Fixed::ZERO,
        }
    }

    /// What stays home after `sent` leaves.
    #[must_use]
    pub fn remaining_after(side: Combatant<'_>, sent: &UnitCounts) -> Self {
        Self {
            units: side.dominion.military.units.saturating_sub(sent),
            draftees: side.dominion.military.draftees,
            extra_raw: Fixed::ZERO,
        }
    }

    /// Builder: add raw DP that is not backed by own units.
    #[must_use]
    pub const fn with_extra_raw(mut self, extra_raw: Fixed) -> Self {
        self.extra_raw = extra_raw;
        self
    }
}

/// Power calculator.
#[derive(Debug, Clone, Copy)]
pub struct MilitaryCalculator<'a> {
    rules: &'a InvasionRules,
    spells: &'a SpellBook,
}

impl<'a> MilitaryCalculator<'a> {
    /// Create a calculator over rules and spell definitions.
    #[must_use]
    pub const fn new(rules: &'a InvasionRules, spells: &'a SpellBook) -> Self {
        Self { rules, spells }
    }

    /// Power of one unit of `slot`, including conditional perks.
    ///
    /// `force` is the unit set the unit fights in; pairing perks look at it.
    pub fn unit_power(
        &self,
        side: Combatant<'_>,
        slot: UnitSlot,
        kind: PowerKind,
        force: &UnitCounts,
        context: PowerContext,
    ) -> Result<Fixed> {
        let unit = side.unit(slot)?;
        let perks = &unit.perks;
        let mut power = kind.base(unit);

        let land = perks.list(kind.from_land());
        if let Some(atom) = land.first() {
            let land_type = LandType::from_key(&atom.as_key())
                .ok_or_else(|| malformed(kind.from_land(), "unknown land type"))?;
            power += share_bonus(
                side.land_percentage(land_type),
                perks.number_at(kind.from_land(), 1)?,
                perks.number_at(kind.from_land(), 2)?,
            );
        }

        let building = perks.list(kind.from_building());
        if let Some(atom) = building.first() {
            let building_type = BuildingType::from_key(&atom.as_key())
                .ok_or_else(|| malformed(kind.from_building(), "unknown building"))?;
            power += share_bonus(
                side.building_percentage(building_type),
                perks.number_at(kind.from_building(), 1)?,
                perks.number_at(kind.from_building(), 2)?,
            );
        }

        power += pairing_bonus(perks, kind.from_pairing(), force)?;

        let spell = perks.list(kind.from_spell());
        if let Some(atom) = spell.first() {
            if side.dominion.spells.is_active(&atom.as_key()) {
                power += perks.number_at(kind.from_spell(), 1)?.unwrap_or(Fixed::ZERO);
            }
        }

        if kind == PowerKind::Offense {
            power += self.staggered_range_bonus(perks, context)?;
            if let (Some(per_ratio), Some(max)) = (
                perks.number_at(UnitPerk::OffenseFromWizardRatio, 0)?,
                perks.number_at(UnitPerk::OffenseFromWizardRatio, 1)?,
            ) {
                power += (side.wizard_ratio() * per_ratio).min(max);
            }
            if context.is_retaliation {
                power += perks.value(UnitPerk::OffenseOnRetaliation);
            }
        }

        Ok(power)
    }

    fn staggered_range_bonus(&self, perks: &PerkSet, context: PowerContext) -> Result<Fixed> {
        let Some(land_ratio) = context.land_ratio else {
            return Ok(Fixed::ZERO);
        };
        let range = land_ratio * Fixed::from_num(100);
        let mut bonus = Fixed::ZERO;
        for group in perks.groups(UnitPerk::OffenseStaggeredLandRange) {
            let threshold = group.first().and_then(PerkAtom::as_number);
            let amount = group.get(1).and_then(PerkAtom::as_number);
            let (Some(threshold), Some(amount)) = (threshold, amount) else {
                return Err(malformed(UnitPerk::OffenseStaggeredLandRange, "expected range,power"));
            };
            if range >= threshold {
                bonus = bonus.max(amount);
            }
        }
        Ok(bonus)
    }

    /// Σ count × unit power; an overflow error when the force is too large
    /// to represent.
    pub fn raw_power(
        &self,
        side: Combatant<'_>,
        kind: PowerKind,
        units: &UnitCounts,
        context: PowerContext,
    ) -> Result<Fixed> {
        let mut total = Fixed::ZERO;
        for (slot, count) in units.iter() {
            if count == 0 {
                continue;
            }
            let power = checked_mul(checked_fx(count)?, self.unit_power(side, slot, kind, units, context)?)?;
            total = checked_add(total, power)?;
        }
        Ok(total)
    }

    /// Summed OP modifiers as a fraction.
    pub fn offensive_multiplier(&self, side: Combatant<'_>, context: PowerContext) -> Result<Fixed> {
        let dominion = side.dominion;
        let mut multiplier = side.race.perk_multiplier(RacePerk::Offense)
            + dominion.tech_perks.multiplier(TechPerk::Offense)
            + self.spells.perk_multiplier(&dominion.spells, SpellPerk::OffensivePower)?
            + dominion.improvements.multiplier(
                Improvement::Forges,
                side.total_land(),
                dominion.building(BuildingType::Masonry),
            );
        if context.is_retaliation {
            multiplier += self
                .spells
                .perk_multiplier(&dominion.spells, SpellPerk::OffensivePowerOnRetaliation)?;
        }
        multiplier += self.building_bonus(
            side,
            BuildingType::GryphonNest,
            self.rules.battle.gryphon_nest_per_percent,
            self.rules.battle.gryphon_nest_max,
        );
        Ok(multiplier)
    }

    /// Final OP of a force.
    pub fn offensive_power(
        &self,
        side: Combatant<'_>,
        units: &UnitCounts,
        context: PowerContext,
    ) -> Result<Fixed> {
        let raw = self.raw_power(side, PowerKind::Offense, units, context)?;
        let multiplier = Fixed::ONE + self.offensive_multiplier(side, context)?;
        Ok(self.apply_morale(side, checked_mul(raw, multiplier)?))
    }

    /// Temple reduction of the defender's modifiers, as a fraction.
    pub fn temple_reduction(&self, attacker: Option<Combatant<'_>>, defender: Combatant<'_>) -> Result<Fixed> {
        let Some(attacker) = attacker else {
            return Ok(Fixed::ZERO);
        };
        if self
            .spells
            .has_perk(&defender.dominion.spells, SpellPerk::ImmuneToTemples)?
        {
            return Ok(Fixed::ZERO);
        }
        let share = percent(attacker.building_percentage(BuildingType::Temple));
        Ok((share * self.rules.battle.temple_reduction_per_share).min(self.rules.battle.temple_max_reduction))
    }

    /// Summed DP modifiers as a fraction, never negative.
    pub fn defensive_multiplier(
        &self,
        defender: Combatant<'_>,
        attacker: Option<Combatant<'_>>,
    ) -> Result<Fixed> {
        let dominion = defender.dominion;
        let multiplier = defender.race.perk_multiplier(RacePerk::Defense)
            + dominion.tech_perks.multiplier(TechPerk::Defense)
            + self.spells.perk_multiplier(&dominion.spells, SpellPerk::DefensivePower)?
            + dominion.improvements.multiplier(
                Improvement::Walls,
                defender.total_land(),
                dominion.building(BuildingType::Masonry),
            )
            + self.building_bonus(
                defender,
                BuildingType::GuardTower,
                self.rules.battle.guard_tower_per_percent,
                self.rules.battle.guard_tower_max,
            )
            - self.temple_reduction(attacker, defender)?;
        Ok(multiplier.max(Fixed::ZERO))
    }

    /// Fraction of raw DP removed by an attacker's ambush spell.
    pub fn ambush_reduction(&self, attacker: Option<Combatant<'_>>, defender: Combatant<'_>) -> Result<Fixed> {
        let Some(attacker) = attacker else {
            return Ok(Fixed::ZERO);
        };
        let key = SpellPerk::ReducesTargetRawDefenseFromLand;
        let Some(value) = self.spells.perk(&attacker.dominion.spells, key)? else {
            return Ok(Fixed::ZERO);
        };
        let items = value.as_list();
        let number = |index: usize| {
            items
                .get(index)
                .and_then(PerkAtom::as_number)
                .ok_or_else(|| malformed(key, "expected percent,per,land,max"))
        };
        let land = items
            .get(2)
            .and_then(|atom| LandType::from_key(&atom.as_key()))
            .ok_or_else(|| malformed(key, "unknown land type"))?;
        let (amount, per, max) = (number(0)?, number(1)?, number(3)?);
        if per <= Fixed::ZERO {
            return Ok(Fixed::ZERO);
        }
        Ok(percent((defender.land_percentage(land) / per * amount).min(max)))
    }

    /// Whether the attacker has an ambush spell running.
    pub fn is_ambush(&self, attacker: Combatant<'_>) -> Result<bool> {
        self.spells
            .has_perk(&attacker.dominion.spells, SpellPerk::ReducesTargetRawDefenseFromLand)
    }

    /// Raw DP of a defending force.
    pub fn raw_defense(
        &self,
        defender: Combatant<'_>,
        force: &DefendingForce,
        context: PowerContext,
    ) -> Result<Fixed> {
        let units = self.raw_power(defender, PowerKind::Defense, &force.units, context)?;
        let draftees = checked_mul(checked_fx(force.draftees)?, self.rules.battle.draftee_defense)?;
        checked_add(checked_add(units, draftees)?, force.extra_raw)
    }

    /// Minimum raw DP from land.
    #[must_use]
    pub fn minimum_defense(&self, defender: Combatant<'_>) -> Fixed {
        fx(defender.total_land()).saturating_mul(self.rules.battle.minimum_defense_per_acre)
    }

    /// Final DP of a defending force. Pass `attacker = None` for home DP.
    pub fn defensive_power(
        &self,
        defender: Combatant<'_>,
        attacker: Option<Combatant<'_>>,
        force: &DefendingForce,
        context: PowerContext,
    ) -> Result<Fixed> {
        let raw = self.raw_defense(defender, force, context)?;
        let raw = raw * (Fixed::ONE - self.ambush_reduction(attacker, defender)?);
        let raw = raw.max(self.minimum_defense(defender));
        let multiplier = Fixed::ONE + self.defensive_multiplier(defender, attacker)?;
        Ok(self.apply_morale(defender, checked_mul(raw, multiplier)?))
    }

    /// Scale power by `0.90 + morale / 1000`, morale capped at the maximum.
    #[must_use]
    pub fn apply_morale(&self, side: Combatant<'_>, power: Fixed) -> Fixed {
        let morale = side.dominion.morale.min(self.rules.morale.maximum);
        scale(power, 900 + u64::from(morale), 1000)
    }

    fn building_bonus(&self, side: Combatant<'_>, building: BuildingType, per: Fixed, max: Fixed) -> Fixed {
        percent((side.building_percentage(building) * per).min(max))
    }

    /// Boats needed to carry the boat-bound units of a force.
    pub fn boats_needed(&self, side: Combatant<'_>, units: &UnitCounts) -> Result<u64> {
        let mut riders = 0u64;
        for (slot, count) in units.iter() {
            if count > 0 && side.unit(slot)?.need_boat {
                riders = riders.saturating_add(count);
            }
        }
        Ok(ceil_count(fx(riders) / fx(side.race.boat_capacity.max(1))))
    }

    /// Deployment cap from a `building_limit` perk, if the unit has one.
    pub fn building_limit(&self, side: Combatant<'_>, slot: UnitSlot) -> Result<Option<(u64, BuildingType)>> {
        let perks = &side.unit(slot)?.perks;
        let items = perks.list(UnitPerk::BuildingLimit);
        let Some(first) = items.first() else {
            return Ok(None);
        };
        let building = BuildingType::from_key(&first.as_key())
            .ok_or_else(|| malformed(UnitPerk::BuildingLimit, "unknown building"))?;
        let per_building = perks
            .number_at(UnitPerk::BuildingLimit, 1)?
            .unwrap_or(Fixed::ZERO);
        let mut limit = fx(side.dominion.building(building)) * per_building;
        if let Some(atom) = items.get(2) {
            let improvement = Improvement::from_key(&atom.as_key())
                .ok_or_else(|| malformed(UnitPerk::BuildingLimit, "unknown improvement"))?;
            limit *= Fixed::ONE
                + side.dominion.improvements.multiplier(
                    improvement,
                    side.total_land(),
                    side.dominion.building(BuildingType::Masonry),
                );
        }
        Ok(Some((floor_count(limit), building)))
    }

    /// Strict success: ties favour the defender.
    #[must_use]
    pub fn is_success(op: Fixed, dp: Fixed) -> bool {
        op > dp
    }

    /// Whether a failed attack is overwhelmed: `100·(dp − op) ≥ pct·dp`.
    #[must_use]
    pub fn is_overwhelmed(&self, op: Fixed, dp: Fixed) -> bool {
        if Self::is_success(op, dp) {
            return false;
        }
        let deficit = i128::from((dp - op).to_bits()) * 100 * (1i128 << 32);
        let threshold = i128::from(dp.to_bits()) * i128::from(self.rules.battle.overwhelmed_percentage.to_bits());
        deficit >= threshold
    }

    /// Whether OP stays within the allowed share of the DP left home.
    #[must_use]
    pub fn passes_home_defense_rule(&self, op: Fixed, home_dp: Fixed) -> bool {
        let battle = &self.rules.battle;
        i128::from(op.to_bits()) * i128::from(battle.home_defense_denominator)
            <= i128::from(home_dp.to_bits()) * i128::from(battle.home_defense_numerator)
    }
}

/// `min(share / per, max)`, zero when either number is missing.
fn share_bonus(share: Fixed, per: Option<Fixed>, max: Option<Fixed>) -> Fixed {
    match (per, max) {
        (Some(per), Some(max)) if per > Fixed::ZERO => (share / per).min(max),
        _ => Fixed::ZERO,
    }
}

fn pairing_bonus(perks: &PerkSet, key: UnitPerk, force: &UnitCounts) -> Result<Fixed> {
    let Some(number) = perks.number_at(key, 0)? else {
        return Ok(Fixed::ZERO);
    };
    let partner = crate::perks::slot_from_number(key, number)?;
    let amount = perks.number_at(key, 1)?.unwrap_or(Fixed::ZERO);
    let required = perks.number_at(key, 2)?.unwrap_or(Fixed::ONE);
    if fx(force[partner]) >= required && force[partner] > 0 {
        Ok(amount)
    } else {
        Ok(Fixed::ZERO)
    }
}

fn malformed(key: impl PerkKey, message: &str) -> GameError {
    GameError::MalformedPerk {
        key: key.as_str().to_string(),
        message: message.to_string(),
    }
}
