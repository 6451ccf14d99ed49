//! Invasion orchestrator.
//!
//! [`InvasionEngine::invade`] validates a deployment, then runs the battle
//! pipeline on working copies of both dominions:
//!
//! ```text
//! Validating -> PowerResolved -> SuccessDetermined -> OverwhelmCheck
//!   -> CasualtiesApplied -> LandResolved -> SecondaryEffectsApplied -> Committed
//! ```
//!
//! Every handler reads the record built so far and adds its own section.
//! Delayed effects go through the [`QueueService`] the caller passes in;
//! the caller decides whether those writes, the working copies and the
//! [`RealmEffects`] are committed. Nothing here touches shared state.

mod battle_perks;
mod boats;
mod casualties;
mod factions;
mod land_grab;
mod morale;
mod plunder;
mod prestige;
mod research;
pub mod result;
mod returning;
mod spells;
mod stats;
pub mod validation;

use serde::{Deserialize, Serialize};

use crate::calculators::{
    CasualtyContext, Combatant, DefendingForce, LandCalculator, MilitaryCalculator, PowerContext,
};
use crate::data::RaceData;
use crate::dominion::{Dominion, RealmId, RecentInvasion, Realm, Round};
use crate::error::InvasionError;
use crate::math::{floor_count, fx, percent, ratio, Fixed};
use crate::perks::{slot_from_number, PerkAtom, SpellPerk, UnitPerk};
use crate::queue::QueueService;
use crate::registry::RaceRegistry;
use crate::rules::InvasionRules;
use crate::spells::SpellBook;
use crate::units::{Deployment, UnitAttribute, UnitCounts, UnitSlot};

pub use result::{
    AttackerReport, BattleEffects, BattleOutcome, CollectionReport, CryptReport, DefenderReport,
    InvasionClass, InvasionResult, InvasionResultBuilder, LandReport, MetabolismReport,
    MindControlReport, StunReport,
};
pub use validation::ValidationGate;

/// Pipeline phase. Phases only ever advance one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InvasionPhase {
    /// Preconditions are being checked.
    Validating,
    /// OP and DP are known.
    PowerResolved,
    /// Success is known.
    SuccessDetermined,
    /// Overwhelm is known.
    OverwhelmCheck,
    /// Both sides have taken casualties.
    CasualtiesApplied,
    /// Morale, land and research are settled.
    LandResolved,
    /// Faction mechanics, returns and stats are done.
    SecondaryEffectsApplied,
    /// The record is frozen.
    Committed,
}

impl InvasionPhase {
    /// The phase after this one.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Validating => Some(Self::PowerResolved),
            Self::PowerResolved => Some(Self::SuccessDetermined),
            Self::SuccessDetermined => Some(Self::OverwhelmCheck),
            Self::OverwhelmCheck => Some(Self::CasualtiesApplied),
            Self::CasualtiesApplied => Some(Self::LandResolved),
            Self::LandResolved => Some(Self::SecondaryEffectsApplied),
            Self::SecondaryEffectsApplied => Some(Self::Committed),
            Self::Committed => None,
        }
    }
}

/// Round and realm state an invasion is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct InvasionContext<'a> {
    /// Current tick.
    pub tick: u64,
    /// Round both dominions must belong to.
    pub round: &'a Round,
    /// The attacker's realm, for retaliation checks.
    pub attacker_realm: &'a Realm,
}

impl<'a> InvasionContext<'a> {
    /// Create a context.
    #[must_use]
    pub const fn new(tick: u64, round: &'a Round, attacker_realm: &'a Realm) -> Self {
        Self {
            tick,
            round,
            attacker_realm,
        }
    }

    /// Whether the target recently hit the attacker's realm.
    #[must_use]
    pub fn is_retaliation(&self, defender: &Dominion, rules: &InvasionRules) -> bool {
        self.attacker_realm
            .recently_invaded_by(defender.id, self.tick, rules.timing.recent_invasion_window)
    }
}

/// Bodies added to a realm crypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptDeposit {
    /// Realm owning the crypt.
    pub realm: RealmId,
    /// Bodies added.
    pub bodies: u64,
}

/// Changes to realm records produced by one invasion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RealmEffects {
    /// Crypt deposit, if any.
    pub crypt: Option<CryptDeposit>,
    /// Realm credited with a successful defense.
    pub defending_success: Option<RealmId>,
    /// Realm that received a successful invasion.
    pub invasion_received: Option<(RealmId, RecentInvasion)>,
}

impl RealmEffects {
    /// Apply the effects that target `realm`.
    pub fn apply_to(&self, realm: &mut Realm) {
        if let Some(deposit) = self.crypt.filter(|d| d.realm == realm.id) {
            realm.crypt = realm.crypt.saturating_add(deposit.bodies);
        }
        if self.defending_success == Some(realm.id) {
            realm.stat_defending_success += 1;
        }
        if let Some((id, invasion)) = self.invasion_received {
            if id == realm.id {
                realm.invasions_received.push(invasion);
            }
        }
    }

    /// Realms touched by these effects.
    #[must_use]
    pub fn realms(&self) -> Vec<RealmId> {
        let mut realms: Vec<RealmId> = self
            .crypt
            .map(|d| d.realm)
            .into_iter()
            .chain(self.defending_success)
            .chain(self.invasion_received.map(|(id, _)| id))
            .collect();
        realms.sort_unstable();
        realms.dedup();
        realms
    }
}

/// Outcome of a resolved invasion, not yet committed.
#[derive(Debug, Clone)]
pub struct InvasionResolution {
    /// Attacker after the invasion.
    pub attacker: Dominion,
    /// Defender after the invasion.
    pub defender: Dominion,
    /// Record of what happened.
    pub result: InvasionResult,
    /// Realm changes to apply on commit.
    pub realm_effects: RealmEffects,
}

/// Invasion engine over rules, races and spells.
#[derive(Debug, Clone, Copy)]
pub struct InvasionEngine<'a> {
    rules: &'a InvasionRules,
    races: &'a RaceRegistry,
    spells: &'a SpellBook,
}

impl<'a> InvasionEngine<'a> {
    /// Create an engine.
    #[must_use]
    pub const fn new(rules: &'a InvasionRules, races: &'a RaceRegistry, spells: &'a SpellBook) -> Self {
        Self { rules, races, spells }
    }

    /// Rules in use.
    #[must_use]
    pub const fn rules(&self) -> &'a InvasionRules {
        self.rules
    }

    /// Run the validation gate alone.
    pub fn validate(
        &self,
        attacker: &Dominion,
        defender: &Dominion,
        deployment: &Deployment,
        context: &InvasionContext<'_>,
    ) -> Result<UnitCounts, InvasionError> {
        let attacker_race = self.races.require(&attacker.race)?;
        let defender_race = self.races.require(&defender.race)?;
        ValidationGate::new(self.rules, self.spells).check(
            Combatant::new(attacker, attacker_race),
            Combatant::new(defender, defender_race),
            deployment,
            context,
        )
    }

    /// Validate and resolve an invasion.
    ///
    /// The inputs are never mutated; the returned resolution carries the
    /// new dominion states. Queue writes go to `queue` and must be
    /// discarded by the caller if the resolution is not committed.
    pub fn invade(
        &self,
        attacker: &Dominion,
        defender: &Dominion,
        deployment: &Deployment,
        queue: &mut dyn QueueService,
        context: &InvasionContext<'_>,
    ) -> Result<InvasionResolution, InvasionError> {
        let units = match self.validate(attacker, defender, deployment, context) {
            Ok(units) => units,
            Err(err) => {
                if err.is_user_facing() {
                    tracing::warn!(attacker = attacker.id, defender = defender.id, error = %err, "Invasion rejected");
                } else {
                    tracing::error!(attacker = attacker.id, defender = defender.id, error = %err, "Invasion validation failed");
                }
                return Err(err);
            }
        };

        let resolution = self.resolve(attacker, defender, units, queue, context).map_err(|err| {
            tracing::error!(attacker = attacker.id, defender = defender.id, error = %err, "Invasion aborted");
            err
        })?;

        #[cfg(feature = "debug-validation")]
        check_conservation(defender, &resolution)?;

        tracing::info!(
            attacker = attacker.id,
            defender = defender.id,
            success = resolution.result.is_success(),
            land_conquered = resolution.result.land_conquered(),
            "Invasion resolved"
        );
        Ok(resolution)
    }

    fn resolve(
        &self,
        attacker: &Dominion,
        defender: &Dominion,
        units: UnitCounts,
        queue: &mut dyn QueueService,
        context: &InvasionContext<'_>,
    ) -> Result<InvasionResolution, InvasionError> {
        let attacker_race = self.races.require(&attacker.race)?;
        let defender_race = self.races.require(&defender.race)?;
        let battle = Battle {
            rules: self.rules,
            spells: self.spells,
            attacker_race,
            defender_race,
            attacker: attacker.clone(),
            defender: defender.clone(),
            tick: context.tick,
            land_ratio: LandCalculator::land_ratio(attacker, defender),
            is_retaliation: context.is_retaliation(defender, self.rules),
            is_ambush: false,
            recently_invaded: defender.recently_invaded_count(context.tick, self.rules.timing.recent_invasion_window),
            units_sent: units,
            fighting: units,
            controlled: UnitCounts::ZERO,
            released: UnitCounts::ZERO,
            op: Fixed::ZERO,
            dp: Fixed::ZERO,
            success: false,
            overwhelmed: false,
            report: InvasionResultBuilder::new(context.tick),
            realm_effects: RealmEffects::default(),
            phase: InvasionPhase::Validating,
        };
        battle.run(queue)
    }
}

/// Working state of one invasion.
pub(crate) struct Battle<'e> {
    rules: &'e InvasionRules,
    spells: &'e SpellBook,
    attacker_race: &'e RaceData,
    defender_race: &'e RaceData,
    attacker: Dominion,
    defender: Dominion,
    tick: u64,
    land_ratio: Fixed,
    is_retaliation: bool,
    is_ambush: bool,
    recently_invaded: u64,
    /// Units that left home.
    units_sent: UnitCounts,
    /// Units sent minus those captured by mind control.
    fighting: UnitCounts,
    controlled: UnitCounts,
    released: UnitCounts,
    op: Fixed,
    dp: Fixed,
    success: bool,
    overwhelmed: bool,
    report: InvasionResultBuilder,
    realm_effects: RealmEffects,
    phase: InvasionPhase,
}

impl<'e> Battle<'e> {
    fn run(mut self, queue: &mut dyn QueueService) -> Result<InvasionResolution, InvasionError> {
        self.attacker.remove_units(&self.units_sent)?;
        self.report.attacker.dominion = self.attacker.id;
        self.report.attacker.land_size = self.attacker.total_land();
        self.report.attacker.units_sent = self.units_sent;
        self.report.defender.dominion = self.defender.id;
        self.report.defender.land_size = self.defender.total_land();
        self.report.defender.recently_invaded_count = self.recently_invaded;

        self.handle_mind_control()?;
        self.resolve_power()?;
        self.advance(InvasionPhase::PowerResolved)?;

        self.success = MilitaryCalculator::is_success(self.op, self.dp);
        self.advance(InvasionPhase::SuccessDetermined)?;

        self.overwhelmed = self.military().is_overwhelmed(self.op, self.dp);
        self.report.set_outcome(BattleOutcome {
            success: self.success,
            overwhelmed: self.overwhelmed,
            is_ambush: self.is_ambush,
            class: InvasionClass::classify(self.success, self.overwhelmed, self.land_ratio, self.rules.land.victory_ratio),
            land_ratio: self.land_ratio,
        });
        self.advance(InvasionPhase::OverwhelmCheck)?;

        self.handle_boats(queue)?;
        self.handle_prestige(queue)?;
        self.handle_battle_perks()?;
        self.handle_offensive_casualties()?;
        self.handle_defensive_casualties(queue)?;
        self.advance(InvasionPhase::CasualtiesApplied)?;

        self.handle_morale()?;
        self.handle_land_grab(queue)?;
        self.handle_research(queue)?;
        self.advance(InvasionPhase::LandResolved)?;

        self.handle_zealots()?;
        self.handle_menticide()?;
        self.handle_stun(queue)?;
        self.handle_conversions(queue)?;
        self.handle_invasion_spells()?;
        self.handle_soul_collection(queue)?;
        self.handle_champions(queue)?;
        self.handle_salvage_and_plunder(queue)?;
        self.handle_metabolism(queue)?;
        self.handle_crypt()?;
        self.handle_returning_units(queue)?;
        self.handle_stats();
        self.advance(InvasionPhase::SecondaryEffectsApplied)?;

        let result = self.report.build()?;
        self.phase = InvasionPhase::Committed;
        tracing::debug!(phase = ?self.phase, "Invasion phase");
        Ok(InvasionResolution {
            attacker: self.attacker,
            defender: self.defender,
            result,
            realm_effects: self.realm_effects,
        })
    }

    fn advance(&mut self, to: InvasionPhase) -> Result<(), InvasionError> {
        if self.phase.next() != Some(to) {
            return Err(InvasionError::invariant(format!(
                "cannot move from {:?} to {to:?}",
                self.phase
            )));
        }
        self.phase = to;
        tracing::debug!(phase = ?to, attacker = self.attacker.id, defender = self.defender.id, "Invasion phase");
        Ok(())
    }

    fn attacking(&self) -> Combatant<'_> {
        Combatant::new(&self.attacker, self.attacker_race)
    }

    fn defending(&self) -> Combatant<'_> {
        Combatant::new(&self.defender, self.defender_race)
    }

    fn military(&self) -> MilitaryCalculator<'e> {
        MilitaryCalculator::new(self.rules, self.spells)
    }

    fn power_context(&self) -> PowerContext {
        PowerContext::against(self.land_ratio).with_retaliation(self.is_retaliation)
    }

    fn casualty_context(&self) -> CasualtyContext {
        CasualtyContext {
            land_ratio: self.land_ratio,
            success: self.success,
            overwhelmed: self.overwhelmed,
            units_sent: self.fighting,
        }
    }

    /// Raw DP the defender gets from captured invaders.
    fn controlled_defense(&self) -> Fixed {
        fx(self.controlled.total()).saturating_mul(self.rules.battle.mind_controlled_defense)
    }

    /// Ticks until units of a slot are back home, never below one.
    fn return_ticks(&self, slot: UnitSlot) -> Result<u32, InvasionError> {
        let unit = self.attacker_race.unit(slot)?;
        let faster = unit.perks.value(UnitPerk::FasterReturn)
            + self.spells.perk_value(&self.attacker.spells, SpellPerk::FasterReturn)?;
        let ticks = fx(u64::from(self.rules.timing.unit_return_ticks)) - faster;
        Ok(ticks.to_num::<i64>().clamp(1, i64::from(u32::MAX)) as u32)
    }

    /// Return ticks of the slowest slot in `units`.
    fn slowest_return_ticks(&self, units: &UnitCounts) -> Result<u32, InvasionError> {
        let mut slowest = None;
        for (slot, count) in units.iter() {
            if count > 0 {
                let ticks = self.return_ticks(slot)?;
                slowest = Some(slowest.map_or(ticks, |s: u32| s.max(ticks)));
            }
        }
        Ok(slowest.unwrap_or(self.rules.timing.unit_return_ticks))
    }

    /// Capture invaders with the defender's mind control spell and flag ambushes.
    fn handle_mind_control(&mut self) -> Result<(), InvasionError> {
        self.is_ambush = self.military().is_ambush(self.attacking())?;

        let Some(value) = self.spells.perk(&self.defender.spells, SpellPerk::MindControl)? else {
            return Ok(());
        };
        let number = value
            .as_list()
            .first()
            .and_then(PerkAtom::as_number)
            .ok_or_else(|| InvasionError::invariant("mind_control perk has no controlling slot"))?;
        let controller = slot_from_number(SpellPerk::MindControl, number)?;

        let mut available = self.defender.military.units[controller];
        let release = self.rules.battle.mind_control_release_percentage;
        for (slot, count) in self.units_sent.iter() {
            if count == 0 || available == 0 {
                continue;
            }
            let unit = self.attacker_race.unit(slot)?;
            if unit.has_any_attribute(&UnitAttribute::MIND_CONTROL_IMMUNE) {
                continue;
            }
            let taken = count.min(available);
            available -= taken;
            self.controlled[slot] = taken;
            self.released[slot] = floor_count(percent(fx(taken) * release));
        }
        self.fighting = self.units_sent.saturating_sub(&self.controlled);

        if !self.controlled.is_empty() {
            self.report.defender.mind_control = Some(MindControlReport {
                controlled: self.controlled,
                released: self.released,
                menticide: false,
                thralls: 0,
            });
        }
        Ok(())
    }

    /// Final OP of the fighting units against the defender's DP.
    fn resolve_power(&mut self) -> Result<(), InvasionError> {
        let military = self.military();
        let attacker = self.attacking();
        let defender = self.defending();
        let op = military.offensive_power(attacker, &self.fighting, self.power_context())?;
        let force = DefendingForce::at_home(defender).with_extra_raw(self.controlled_defense());
        let dp = military.defensive_power(defender, Some(attacker), &force, PowerContext::against(self.land_ratio))?;

        self.op = op;
        self.dp = dp;
        self.report.attacker.op = op;
        self.report.defender.dp = dp;
        self.report.defender.units_defending = self.defender.military.units;
        self.report.defender.draftees_defending = self.defender.military.draftees;
        Ok(())
    }

    /// `op / dp`, zero when the defender has no DP.
    fn op_dp_ratio(&self) -> Fixed {
        ratio(self.op, self.dp)
    }
}

/// Land taken from the defender must match the report, and no slot may
/// lose more units than it sent.
#[cfg(feature = "debug-validation")]
fn check_conservation(defender: &Dominion, resolution: &InvasionResolution) -> Result<(), InvasionError> {
    let result = &resolution.result;
    let taken = defender.total_land().saturating_sub(resolution.defender.total_land());
    if taken != result.land_conquered() {
        return Err(InvasionError::invariant(format!(
            "defender lost {taken} acres but {} were conquered",
            result.land_conquered()
        )));
    }
    let report = result.attacker();
    for slot in UnitSlot::ALL {
        if report.units_lost[slot] > report.units_sent[slot] {
            return Err(InvasionError::invariant(format!(
                "unit {slot} lost {} of {} sent",
                report.units_lost[slot], report.units_sent[slot]
            )));
        }
    }
    Ok(())
}
