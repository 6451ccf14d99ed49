//! Dominion, realm and round state.
//!
//! These records are owned by the persistence layer. During an invasion
//! the engine works on clones and the store swaps them in on commit.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::improvements::Improvements;
use crate::land::{BuildingType, Buildings, LandHoldings};
use crate::perks::PerkSet;
use crate::resources::ResourceStock;
use crate::spells::ActiveSpells;
use crate::units::{UnitCounts, UnitSlot};

/// Dominion identifier.
pub type DominionId = u64;
/// Realm identifier.
pub type RealmId = u64;
/// Round identifier.
pub type RoundId = u64;

/// Military at home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Military {
    /// Untrained conscripts; 1 raw DP each.
    pub draftees: u64,
    /// Race units per slot.
    pub units: UnitCounts,
    /// Spies.
    pub spies: u64,
    /// Wizards.
    pub wizards: u64,
    /// Archmages.
    pub archmages: u64,
}

/// Cumulative statistics counters.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DominionStats {
    pub total_land_conquered: u64,
    pub total_land_discovered: u64,
    pub total_land_lost: u64,
    pub attacking_success: u64,
    pub attacking_bottomfeeds: u64,
    pub attacking_razes: u64,
    pub attacking_failures: u64,
    pub defending_success: u64,
    pub defending_failures: u64,
    pub total_units_killed: u64,
    pub total_units_lost: UnitCounts,
    pub total_draftees_lost: u64,
    pub total_units_converted: u64,
    pub total_units_stunned: u64,
    pub total_units_mind_controlled: u64,
    pub total_peasants_killed: u64,
    pub total_draftees_eaten: u64,
    pub total_improvements_damaged: u64,
    pub total_buildings_destroyed: u64,
    pub total_boats_sunk: u64,
    pub total_boats_lost: u64,
    pub total_ore_salvaged: u64,
    pub total_lumber_salvaged: u64,
    pub total_gems_salvaged: u64,
    pub total_plundered: ResourceStock,
    pub total_souls_collected: u64,
    pub total_souls_destroyed: u64,
    pub total_blood_collected: u64,
    pub total_champions_created: u64,
    pub total_research_points_earned: u64,
    pub total_prestige_gained: u64,
    pub total_prestige_lost: u64,
}

/// A successful invasion received, kept for recency rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecentInvasion {
    /// Invading dominion.
    pub attacker: DominionId,
    /// Tick when the invasion happened.
    pub tick: u64,
}

impl RecentInvasion {
    /// Whether the record falls inside `window` ticks before `now`.
    #[must_use]
    pub const fn is_within(&self, now: u64, window: u64) -> bool {
        now.saturating_sub(self.tick) < window
    }
}

/// Player state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dominion {
    /// Unique id.
    pub id: DominionId,
    /// Display name.
    pub name: String,
    /// Realm membership.
    pub realm_id: RealmId,
    /// Round the dominion plays in.
    pub round_id: RoundId,
    /// Race key.
    pub race: String,
    /// Acres per land type.
    #[serde(default)]
    pub land: LandHoldings,
    /// Completed buildings.
    #[serde(default)]
    pub buildings: Buildings,
    /// Improvement points.
    #[serde(default)]
    pub improvements: Improvements,
    /// Resource balances.
    #[serde(default)]
    pub resources: ResourceStock,
    /// Peasant population.
    #[serde(default)]
    pub peasants: u64,
    /// Military at home.
    #[serde(default)]
    pub military: Military,
    /// Prestige.
    #[serde(default = "default_prestige")]
    pub prestige: i64,
    /// Morale, 0-100.
    #[serde(default = "default_morale")]
    pub morale: u32,
    /// Statistics counters.
    #[serde(default)]
    pub stats: DominionStats,
    /// Active spells.
    #[serde(default)]
    pub spells: ActiveSpells,
    /// Summed technology perks.
    #[serde(default)]
    pub tech_perks: PerkSet,
    /// Ticks of protection left.
    #[serde(default)]
    pub protection_ticks: u32,
    /// Successful invasions received.
    #[serde(default)]
    pub invasions_received: Vec<RecentInvasion>,
}

const fn default_prestige() -> i64 {
    250
}

const fn default_morale() -> u32 {
    100
}

impl Dominion {
    /// Create a dominion with default prestige and morale.
    #[must_use]
    pub fn new(
        id: DominionId,
        name: impl Into<String>,
        realm_id: RealmId,
        round_id: RoundId,
        race: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            realm_id,
            round_id,
            race: race.into(),
            land: LandHoldings::new(),
            buildings: Buildings::new(),
            improvements: Improvements::new(),
            resources: ResourceStock::new(),
            peasants: 0,
            military: Military::default(),
            prestige: default_prestige(),
            morale: default_morale(),
            stats: DominionStats::default(),
            spells: ActiveSpells::new(),
            tech_perks: PerkSet::new(),
            protection_ticks: 0,
            invasions_received: Vec::new(),
        }
    }

    /// Total acres.
    #[must_use]
    pub fn total_land(&self) -> u64 {
        self.land.total()
    }

    /// Units of a slot at home.
    #[must_use]
    pub fn units_at_home(&self, slot: UnitSlot) -> u64 {
        self.military.units[slot]
    }

    /// Completed buildings of a type.
    #[must_use]
    pub fn building(&self, building: BuildingType) -> u64 {
        self.buildings.get(building)
    }

    /// Whether protection is still running.
    #[must_use]
    pub const fn is_under_protection(&self) -> bool {
        self.protection_ticks > 0
    }

    /// Successful invasions received within the window.
    #[must_use]
    pub fn recently_invaded_count(&self, now: u64, window: u64) -> u64 {
        self.invasions_received
            .iter()
            .filter(|i| i.is_within(now, window))
            .count() as u64
    }

    /// Whether a given attacker successfully invaded this dominion within the window.
    #[must_use]
    pub fn recently_invaded_by(&self, attacker: DominionId, now: u64, window: u64) -> bool {
        self.invasions_received
            .iter()
            .any(|i| i.attacker == attacker && i.is_within(now, window))
    }

    /// Remove units from home, failing if there are not enough.
    pub fn remove_units(&mut self, units: &UnitCounts) -> Result<()> {
        for (slot, amount) in units.iter() {
            if self.military.units[slot] < amount {
                return Err(GameError::InvalidState(format!(
                    "dominion {} has {} of unit {slot}, cannot remove {amount}",
                    self.id, self.military.units[slot]
                )));
            }
        }
        self.military.units = self.military.units.saturating_sub(units);
        Ok(())
    }

    /// Hash of the full dominion state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize the dominion to bytes.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Serialization failed: {e}")))
    }

    /// Deserialize a dominion from bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| GameError::InvalidState(format!("Deserialization failed: {e}")))
    }
}

/// A group of dominions playing together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Realm {
    /// Unique id.
    pub id: RealmId,
    /// Round the realm plays in.
    pub round_id: RoundId,
    /// Display name.
    pub name: String,
    /// Bodies collected in the realm crypt.
    #[serde(default)]
    pub crypt: u64,
    /// Invasions repelled by realm members.
    #[serde(default)]
    pub stat_defending_success: u64,
    /// Successful invasions received by realm members.
    #[serde(default)]
    pub invasions_received: Vec<RecentInvasion>,
}

impl Realm {
    /// Create an empty realm.
    #[must_use]
    pub fn new(id: RealmId, round_id: RoundId, name: impl Into<String>) -> Self {
        Self {
            id,
            round_id,
            name: name.into(),
            crypt: 0,
            stat_defending_success: 0,
            invasions_received: Vec::new(),
        }
    }

    /// Whether `attacker` invaded any member of this realm within the window.
    #[must_use]
    pub fn recently_invaded_by(&self, attacker: DominionId, now: u64, window: u64) -> bool {
        self.invasions_received
            .iter()
            .any(|i| i.attacker == attacker && i.is_within(now, window))
    }
}

/// Round timing and lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Round {
    /// Unique id.
    pub id: RoundId,
    /// First tick of the round.
    pub start_tick: u64,
    /// Whether invasions are allowed at all.
    #[serde(default = "default_offense_enabled")]
    pub offensive_actions_enabled: bool,
}

const fn default_offense_enabled() -> bool {
    true
}

impl Round {
    /// Create an open round starting at `start_tick`.
    #[must_use]
    pub const fn new(id: RoundId, start_tick: u64) -> Self {
        Self {
            id,
            start_tick,
            offensive_actions_enabled: true,
        }
    }

    /// Whether the round has started at `now`.
    #[must_use]
    pub const fn has_started(&self, now: u64) -> bool {
        now >= self.start_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::land::LandType;

    #[test]
    fn test_recent_invasions_window() {
        let mut dominion = Dominion::new(1, "Target", 1, 1, "human");
        dominion.invasions_received = vec![
            RecentInvasion { attacker: 2, tick: 10 },
            RecentInvasion { attacker: 3, tick: 40 },
        ];
        assert_eq!(dominion.recently_invaded_count(45, 24), 1);
        assert!(dominion.recently_invaded_by(3, 45, 24));
        assert!(!dominion.recently_invaded_by(2, 45, 24));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut dominion = Dominion::new(7, "Roundtrip", 2, 1, "goblin");
        dominion.land = LandHoldings::new().with(LandType::Hill, 250);
        dominion.military.units = UnitCounts([10, 20, 30, 40]);

        let bytes = dominion.serialize().expect("serialize");
        let restored = Dominion::deserialize(&bytes).expect("deserialize");
        assert_eq!(dominion, restored);
        assert_eq!(dominion.state_hash(), restored.state_hash());
    }

    #[test]
    fn test_remove_units_checks_availability() {
        let mut dominion = Dominion::new(1, "Army", 1, 1, "human");
        dominion.military.units = UnitCounts([5, 0, 0, 0]);
        assert!(dominion.remove_units(&UnitCounts([6, 0, 0, 0])).is_err());
        assert_eq!(dominion.military.units[UnitSlot::One], 5);
        dominion.remove_units(&UnitCounts([5, 0, 0, 0])).expect("remove");
        assert_eq!(dominion.military.units[UnitSlot::One], 0);
    }

    #[test]
    fn test_round_start() {
        let round = Round::new(1, 100);
        assert!(!round.has_started(99));
        assert!(round.has_started(100));
    }
}
