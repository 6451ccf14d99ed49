//! Ordered precondition checks run before any state is touched.
//!
//! The gate only reads the two dominions, the deployment and the round.
//! The first failing check wins, so the order of [`ValidationGate::check`]
//! is part of the contract.

use crate::calculators::{Combatant, DefendingForce, LandCalculator, MilitaryCalculator, PowerContext};
use crate::error::{InsufficientResource, InvasionError, PreconditionViolation, RuleViolation};
use crate::factions::Capability;
use crate::math::Fixed;
use crate::perks::{RacePerk, SpellPerk, UnitPerk};
use crate::resources::Resource;
use crate::rules::InvasionRules;
use crate::spells::SpellBook;
use crate::units::{Deployment, UnitCounts};

use super::InvasionContext;

/// Validation gate.
#[derive(Debug, Clone, Copy)]
pub struct ValidationGate<'a> {
    rules: &'a InvasionRules,
    spells: &'a SpellBook,
}

impl<'a> ValidationGate<'a> {
    /// Create a gate over rules and spell definitions.
    #[must_use]
    pub const fn new(rules: &'a InvasionRules, spells: &'a SpellBook) -> Self {
        Self { rules, spells }
    }

    /// Run every check in order; returns the validated unit counts.
    pub fn check(
        &self,
        attacker: Combatant<'_>,
        defender: Combatant<'_>,
        deployment: &Deployment,
        context: &InvasionContext<'_>,
    ) -> Result<UnitCounts, InvasionError> {
        self.check_preconditions(attacker, defender, context)?;
        let units = self.check_deployment(attacker, deployment)?;
        self.check_resources(attacker, &units)?;
        self.check_rules(attacker, defender, &units, context)?;
        Ok(units)
    }

    fn check_preconditions(
        &self,
        attacker: Combatant<'_>,
        defender: Combatant<'_>,
        context: &InvasionContext<'_>,
    ) -> Result<(), InvasionError> {
        let (a, d) = (attacker.dominion, defender.dominion);

        if !context.round.offensive_actions_enabled {
            return Err(PreconditionViolation::OffensiveActionsDisabled.into());
        }
        if a.is_under_protection() {
            return Err(PreconditionViolation::AttackerUnderProtection.into());
        }
        if d.is_under_protection() {
            return Err(PreconditionViolation::TargetUnderProtection.into());
        }
        let land = LandCalculator::new(self.rules);
        if !land.is_in_range(LandCalculator::land_ratio(a, d)) {
            return Err(PreconditionViolation::OutOfRange.into());
        }
        if a.round_id != context.round.id || d.round_id != context.round.id {
            return Err(PreconditionViolation::DifferentRound.into());
        }
        if a.id == d.id {
            return Err(PreconditionViolation::SelfInvasion.into());
        }
        if a.realm_id == d.realm_id {
            return Err(PreconditionViolation::SameRealm.into());
        }
        Ok(())
    }

    fn check_deployment(&self, attacker: Combatant<'_>, deployment: &Deployment) -> Result<UnitCounts, InvasionError> {
        if deployment.has_negative() {
            return Err(PreconditionViolation::NegativeDeployment.into());
        }
        let units = deployment.counts();

        let military = MilitaryCalculator::new(self.rules, self.spells);
        let op = military.offensive_power(attacker, &units, PowerContext::default())?;
        if op <= Fixed::ZERO {
            return Err(PreconditionViolation::NoOffensivePower.into());
        }

        for (slot, count) in units.iter() {
            if count == 0 {
                continue;
            }
            let unit = attacker.unit(slot)?;
            if unit.offense == Fixed::ZERO && !unit.perks.has(UnitPerk::SendableWithZeroOp) {
                return Err(PreconditionViolation::ZeroPowerUnit(slot).into());
            }
        }
        Ok(units)
    }

    fn check_resources(&self, attacker: Combatant<'_>, units: &UnitCounts) -> Result<(), InvasionError> {
        let dominion = attacker.dominion;
        for (slot, requested) in units.iter() {
            let available = dominion.units_at_home(slot);
            if requested > available {
                return Err(InsufficientResource::Units {
                    slot,
                    requested,
                    available,
                }
                .into());
            }
        }

        let military = MilitaryCalculator::new(self.rules, self.spells);
        let required = military.boats_needed(attacker, units)?;
        let available = dominion.resources[Resource::Boats];
        if required > available {
            return Err(InsufficientResource::Boats { required, available }.into());
        }

        let minimum = self.rules.morale.minimum_to_invade;
        if dominion.morale < minimum {
            return Err(InsufficientResource::Morale {
                morale: dominion.morale,
                minimum,
            }
            .into());
        }
        Ok(())
    }

    fn check_rules(
        &self,
        attacker: Combatant<'_>,
        defender: Combatant<'_>,
        units: &UnitCounts,
        context: &InvasionContext<'_>,
    ) -> Result<(), InvasionError> {
        let military = MilitaryCalculator::new(self.rules, self.spells);
        let land_ratio = LandCalculator::land_ratio(attacker.dominion, defender.dominion);
        let power_context = PowerContext::against(land_ratio)
            .with_retaliation(context.is_retaliation(defender.dominion, self.rules));

        let op = military.offensive_power(attacker, units, power_context)?;
        let home = DefendingForce::remaining_after(attacker, units);
        let home_dp = military.defensive_power(attacker, None, &home, PowerContext::default())?;
        if !military.passes_home_defense_rule(op, home_dp) {
            return Err(RuleViolation::FourThreeRule.into());
        }

        for (slot, count) in units.iter() {
            if count == 0 {
                continue;
            }
            if let Some((limit, building)) = military.building_limit(attacker, slot)? {
                if count > limit {
                    return Err(RuleViolation::BuildingLimit {
                        slot,
                        limit,
                        building: building.to_string(),
                    }
                    .into());
                }
            }
        }

        if !context.round.has_started(context.tick) {
            return Err(PreconditionViolation::RoundNotStarted.into());
        }
        if attacker.race.perks.has(RacePerk::CannotInvade) {
            return Err(RuleViolation::RaceCannotInvade.into());
        }
        let attacker_spells = &attacker.dominion.spells;
        if let Some(spell) = self.spells.spell_with_perk(attacker_spells, SpellPerk::CannotInvade)? {
            let name = self.spells.require(&spell)?.name.clone();
            return Err(RuleViolation::SpellForbidsInvasion(name).into());
        }
        if attacker.race.has_capability(Capability::RequiresPortal)
            && !self.spells.has_perk(attacker_spells, SpellPerk::OpensPortal)?
        {
            return Err(RuleViolation::PortalRequired.into());
        }
        if self.spells.has_perk(&defender.dominion.spells, SpellPerk::Stasis)? {
            return Err(RuleViolation::TargetInStasis.into());
        }
        if self.spells.has_perk(attacker_spells, SpellPerk::Stasis)? {
            return Err(RuleViolation::AttackerInStasis.into());
        }
        Ok(())
    }
}
