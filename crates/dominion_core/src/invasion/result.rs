//! The invasion record.
//!
//! [`InvasionResultBuilder`] is filled in stage by stage while the pipeline
//! runs; [`InvasionResultBuilder::build`] freezes it into an
//! [`InvasionResult`], which is both the audit record stored with the event
//! and the payload handed back to the caller.

use serde::{Deserialize, Serialize};

use crate::calculators::BuildingLoss;
use crate::dominion::DominionId;
use crate::error::InvasionError;
use crate::land::{LandHoldings, LandType};
use crate::math::{fixed_serde, Fixed};
use crate::resources::ResourceStock;
use crate::units::UnitCounts;

/// Mutually exclusive classification of an invasion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvasionClass {
    /// Success at or above the victory land ratio.
    Victory,
    /// Success below the victory land ratio.
    Bottomfeed,
    /// Overwhelmed failure.
    Failure,
    /// Failure that was not overwhelmed.
    Raze,
}

impl InvasionClass {
    /// Classify an outcome.
    #[must_use]
    pub fn classify(success: bool, overwhelmed: bool, land_ratio: Fixed, victory_ratio: Fixed) -> Self {
        match (success, overwhelmed) {
            (true, _) if land_ratio >= victory_ratio => Self::Victory,
            (true, _) => Self::Bottomfeed,
            (false, true) => Self::Failure,
            (false, false) => Self::Raze,
        }
    }
}

/// Top-level battle facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleOutcome {
    /// OP strictly greater than DP.
    pub success: bool,
    /// Failed by at least the overwhelm margin.
    pub overwhelmed: bool,
    /// The attacker had an ambush spell running.
    pub is_ambush: bool,
    /// Classification used for stats and prestige.
    pub class: InvasionClass,
    /// Defender land / attacker land.
    #[serde(with = "fixed_serde")]
    pub land_ratio: Fixed,
}

/// Land gained by a successful attacker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LandReport {
    /// Acres taken from the defender, per land type.
    pub conquered: LandHoldings,
    /// Acres newly discovered alongside the conquest.
    pub discovered: LandHoldings,
    /// Extra discovered acres on the attacker's home land type.
    pub extra_discovered: u64,
    /// Home land type the extra acres go to.
    pub home_land_type: Option<LandType>,
}

impl LandReport {
    /// Total acres the attacker receives.
    #[must_use]
    pub fn total_gained(&self) -> u64 {
        self.conquered.total() + self.discovered.total() + self.extra_discovered
    }
}

/// Damage done to the defender before casualties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BattleEffects {
    /// Peasants burned.
    pub peasants_burned: u64,
    /// Peasants eaten.
    pub peasants_eaten: u64,
    /// Draftees eaten.
    pub draftees_eaten: u64,
    /// Improvement points destroyed.
    pub improvement_damage: u64,
}

impl BattleEffects {
    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Invaders captured by a mind control spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MindControlReport {
    /// Units taken out of the attacking force.
    pub controlled: UnitCounts,
    /// Units sent back to the attacker afterwards.
    pub released: UnitCounts,
    /// Whether the captured units were turned into thralls.
    pub menticide: bool,
    /// Thralls gained.
    pub thralls: u64,
}

/// Defending units stunned and returning shortly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StunReport {
    /// Units stunned per slot.
    pub units: UnitCounts,
    /// Draftees stunned.
    pub draftees: u64,
}

/// Souls, blood and food collected from the fallen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionReport {
    /// Raw power of the slain enemies.
    #[serde(with = "fixed_serde")]
    pub power_slain: Fixed,
    /// Souls.
    pub souls: u64,
    /// Blood.
    pub blood: u64,
    /// Food.
    pub food: u64,
}

/// Fallen enemies eaten under a metabolism spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetabolismReport {
    /// Units eaten per slot.
    pub units_eaten: UnitCounts,
    /// Draftees eaten.
    pub draftees_eaten: u64,
    /// Raw power of everything eaten.
    #[serde(with = "fixed_serde")]
    pub power_eaten: Fixed,
    /// Food gained.
    pub food: u64,
}

/// Bodies sent to a realm crypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptReport {
    /// Bodies from the defender's dead.
    #[serde(with = "fixed_serde")]
    pub defensive_bodies: Fixed,
    /// Bodies from the attacker's dead.
    #[serde(with = "fixed_serde")]
    pub offensive_bodies: Fixed,
    /// Bodies added to the crypt.
    pub total: u64,
}

/// Attacker section of the record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttackerReport {
    /// Dominion id.
    pub dominion: DominionId,
    /// Total acres before the invasion.
    pub land_size: u64,
    /// Final OP of the fighting force.
    #[serde(with = "fixed_serde")]
    pub op: Fixed,
    /// Units sent.
    pub units_sent: UnitCounts,
    /// Units lost.
    pub units_lost: UnitCounts,
    /// Units that fought and survived.
    pub surviving_units: UnitCounts,
    /// Units scheduled to come home, after transformations.
    pub units_returning: UnitCounts,
    /// Units gained from the enemy dead.
    pub conversions: UnitCounts,
    /// Land gained on success.
    pub land: Option<LandReport>,
    /// Prestige change.
    pub prestige_change: i64,
    /// Morale change actually applied.
    pub morale_change: i64,
    /// Research points queued.
    pub research_points: u64,
    /// Own boats sunk on the way back.
    pub boats_lost: u64,
    /// Resources plundered.
    pub plunder: ResourceStock,
    /// Resources salvaged from own dead.
    pub salvage: ResourceStock,
    /// Defender souls destroyed.
    pub souls_destroyed: u64,
    /// Souls, blood and food collected.
    pub collection: Option<CollectionReport>,
    /// Champions created.
    pub champions: u64,
    /// Enemy dead eaten.
    pub metabolism: Option<MetabolismReport>,
    /// Bodies sent to the attacker's realm crypt.
    pub crypt: Option<CryptReport>,
    /// Invasion spells cast on the defender.
    pub spells_cast: Vec<String>,
}

/// Defender section of the record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefenderReport {
    /// Dominion id.
    pub dominion: DominionId,
    /// Total acres before the invasion.
    pub land_size: u64,
    /// Final DP.
    #[serde(with = "fixed_serde")]
    pub dp: Fixed,
    /// Successful invasions received within the recent window.
    pub recently_invaded_count: u64,
    /// Units at home that contribute defense.
    pub units_defending: UnitCounts,
    /// Draftees at home.
    pub draftees_defending: u64,
    /// Units lost.
    pub units_lost: UnitCounts,
    /// Draftees lost.
    pub draftees_lost: u64,
    /// Units gained from the enemy dead.
    pub conversions: UnitCounts,
    /// Acres lost per land type.
    pub land_lost: LandHoldings,
    /// Buildings destroyed or cancelled.
    pub buildings_lost: Vec<BuildingLoss>,
    /// Extra buildings burned by the attacker's spell.
    pub buildings_burned: u64,
    /// Prestige change.
    pub prestige_change: i64,
    /// Morale change actually applied.
    pub morale_change: i64,
    /// Own boats sunk.
    pub boats_lost: u64,
    /// Resources salvaged from own dead.
    pub salvage: ResourceStock,
    /// Attacker souls destroyed.
    pub souls_destroyed: u64,
    /// Souls, blood and food collected.
    pub collection: Option<CollectionReport>,
    /// Damage taken before casualties.
    pub battle_effects: BattleEffects,
    /// Invaders captured by mind control.
    pub mind_control: Option<MindControlReport>,
    /// Own units stunned.
    pub stun: Option<StunReport>,
    /// Enemy dead eaten.
    pub metabolism: Option<MetabolismReport>,
    /// Bodies sent to the defender's realm crypt.
    pub crypt: Option<CryptReport>,
    /// Invasion spells cast on the attacker.
    pub spells_cast: Vec<String>,
}

/// Immutable record of one resolved invasion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvasionResult {
    tick: u64,
    outcome: BattleOutcome,
    attacker: AttackerReport,
    defender: DefenderReport,
}

impl InvasionResult {
    /// Tick the invasion happened on.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Battle facts.
    #[must_use]
    pub const fn outcome(&self) -> &BattleOutcome {
        &self.outcome
    }

    /// Attacker section.
    #[must_use]
    pub const fn attacker(&self) -> &AttackerReport {
        &self.attacker
    }

    /// Defender section.
    #[must_use]
    pub const fn defender(&self) -> &DefenderReport {
        &self.defender
    }

    /// Shorthand for `outcome().success`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.success
    }

    /// Acres conquered from the defender.
    #[must_use]
    pub fn land_conquered(&self) -> u64 {
        self.attacker.land.as_ref().map_or(0, |land| land.conquered.total())
    }

    /// Acres discovered, including extra land.
    #[must_use]
    pub fn land_discovered(&self) -> u64 {
        self.attacker
            .land
            .as_ref()
            .map_or(0, |land| land.discovered.total() + land.extra_discovered)
    }

    /// Units lost by the defender, draftees included.
    #[must_use]
    pub fn defender_casualties(&self) -> u64 {
        self.defender.units_lost.total() + self.defender.draftees_lost
    }

    /// Serialize to RON for display.
    pub fn to_ron(&self) -> crate::error::Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| crate::error::GameError::InvalidState(format!("Serialization failed: {e}")))
    }
}

/// Incrementally built invasion record.
#[derive(Debug, Clone, Default)]
pub struct InvasionResultBuilder {
    tick: u64,
    outcome: Option<BattleOutcome>,
    /// Attacker section, written by the pipeline stages.
    pub attacker: AttackerReport,
    /// Defender section, written by the pipeline stages.
    pub defender: DefenderReport,
}

impl InvasionResultBuilder {
    /// Start a record for a tick.
    #[must_use]
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    /// Record the battle facts.
    pub fn set_outcome(&mut self, outcome: BattleOutcome) {
        self.outcome = Some(outcome);
    }

    /// Battle facts, once decided.
    #[must_use]
    pub const fn outcome(&self) -> Option<&BattleOutcome> {
        self.outcome.as_ref()
    }

    /// Freeze the record.
    pub fn build(self) -> Result<InvasionResult, InvasionError> {
        let outcome = self
            .outcome
            .ok_or_else(|| InvasionError::invariant("invasion record has no outcome"))?;
        Ok(InvasionResult {
            tick: self.tick,
            outcome,
            attacker: self.attacker,
            defender: self.defender,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::percent;

    #[test]
    fn test_classification_is_exclusive() {
        let victory_ratio = percent(Fixed::from_num(75));
        let at = |r: i32| percent(Fixed::from_num(r));
        assert_eq!(InvasionClass::classify(true, false, at(80), victory_ratio), InvasionClass::Victory);
        assert_eq!(InvasionClass::classify(true, false, at(75), victory_ratio), InvasionClass::Victory);
        assert_eq!(InvasionClass::classify(true, false, at(74), victory_ratio), InvasionClass::Bottomfeed);
        assert_eq!(InvasionClass::classify(false, true, at(80), victory_ratio), InvasionClass::Failure);
        assert_eq!(InvasionClass::classify(false, false, at(80), victory_ratio), InvasionClass::Raze);
    }

    #[test]
    fn test_build_requires_outcome() {
        let builder = InvasionResultBuilder::new(5);
        assert!(matches!(builder.build(), Err(InvasionError::Invariant(_))));
    }

    #[test]
    fn test_land_totals() {
        let mut builder = InvasionResultBuilder::new(5);
        builder.set_outcome(BattleOutcome {
            success: true,
            overwhelmed: false,
            is_ambush: false,
            class: InvasionClass::Victory,
            land_ratio: Fixed::ONE,
        });
        builder.attacker.land = Some(LandReport {
            conquered: LandHoldings::new().with(LandType::Plain, 40).with(LandType::Forest, 20),
            discovered: LandHoldings::new().with(LandType::Plain, 40).with(LandType::Forest, 20),
            extra_discovered: 6,
            home_land_type: Some(LandType::Plain),
        });
        let result = builder.build().expect("build");
        assert_eq!(result.tick(), 5);
        assert_eq!(result.land_conquered(), 60);
        assert_eq!(result.land_discovered(), 66);
    }

    #[test]
    fn test_result_survives_bincode() {
        let mut builder = InvasionResultBuilder::new(9);
        builder.set_outcome(BattleOutcome {
            success: false,
            overwhelmed: true,
            is_ambush: false,
            class: InvasionClass::Failure,
            land_ratio: Fixed::from_num(0.9),
        });
        builder.attacker.op = Fixed::from_num(500);
        builder.defender.dp = Fixed::from_num(650);
        let result = builder.build().expect("build");
        let bytes = bincode::serialize(&result).expect("serialize");
        let back: InvasionResult = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(back, result);
    }
}
