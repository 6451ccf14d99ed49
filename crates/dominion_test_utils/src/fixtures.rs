//! Test fixtures and helpers.
//!
//! A small two-realm world with one race per faction mechanic, sized so
//! that power numbers come out round: morale 100 leaves power untouched,
//! improvements are empty and the minimum defense is low enough that unit
//! DP decides.

use dominion_core::data::{RaceData, SpellClass, SpellData, SpellScope, UnitCost, UnitData};
use dominion_core::dominion::{Dominion, DominionId, Realm, RealmId, Round};
use dominion_core::factions::{Alignment, Capability};
use dominion_core::invasion::{InvasionContext, InvasionEngine};
use dominion_core::land::{LandHoldings, LandType};
use dominion_core::math::Fixed;
use dominion_core::perks::{PerkKey, PerkSet, SpellPerk, UnitPerk};
use dominion_core::registry::RaceRegistry;
use dominion_core::resources::Resource;
use dominion_core::rules::InvasionRules;
use dominion_core::spells::SpellBook;
use dominion_core::store::DominionStore;
use dominion_core::units::{UnitCounts, UnitSlot};

/// Realm of the attacking dominions.
pub const ATTACKER_REALM: RealmId = 1;
/// Realm of the defending dominions.
pub const DEFENDER_REALM: RealmId = 2;
/// Id of [`attacker`].
pub const ATTACKER: DominionId = 1;
/// Id of [`defender`].
pub const DEFENDER: DominionId = 2;
/// Round every fixture dominion belongs to.
pub const ROUND: u64 = 1;
/// A tick well inside the round.
pub const TICK: u64 = 100;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> Fixed {
    Fixed::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In engine code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> Fixed {
    Fixed::from_num(n)
}

/// Parse perks, panicking on bad text.
///
/// # Panics
///
/// Panics if a value does not parse.
#[must_use]
pub fn perks<K: PerkKey>(entries: &[(K, &str)]) -> PerkSet {
    entries.iter().fold(PerkSet::new(), |set, &(key, text)| {
        set.with(key, text).expect("fixture perk")
    })
}

/// Rules with a low minimum defense so unit DP decides every scenario.
#[must_use]
pub fn rules() -> InvasionRules {
    let mut rules = InvasionRules::default();
    rules.battle.minimum_defense_per_acre = fixed_f(0.5);
    rules
}

/// Militia 1/1, Archer 0/5, Guard 0/8, Knight 10/2. Nobody needs boats.
#[must_use]
pub fn human() -> RaceData {
    race("human", LandType::Plain, Vec::new())
}

/// Race with the standard units and one capability switched on.
#[must_use]
pub fn race_with(key: &str, capability: Capability) -> RaceData {
    race(key, LandType::Plain, vec![capability])
}

fn race(key: &str, home_land_type: LandType, capabilities: Vec<Capability>) -> RaceData {
    let cost = |platinum, ore, lumber| UnitCost {
        platinum,
        ore,
        lumber,
        ..UnitCost::default()
    };
    RaceData {
        key: key.to_string(),
        name: key.to_string(),
        alignment: Alignment::Neutral,
        home_land_type,
        boat_capacity: 30,
        construction_materials: vec![Resource::Platinum, Resource::Lumber],
        capabilities,
        perks: PerkSet::new(),
        units: vec![
            UnitData::new(UnitSlot::One, "Militia", fixed(1), fixed(1))
                .with_cost(cost(100, 0, 0))
                .without_boats(),
            UnitData::new(UnitSlot::Two, "Archer", fixed(0), fixed(5))
                .with_cost(cost(275, 0, 25))
                .without_boats(),
            UnitData::new(UnitSlot::Three, "Guard", fixed(0), fixed(8))
                .with_cost(cost(1000, 50, 0))
                .without_boats(),
            UnitData::new(UnitSlot::Four, "Knight", fixed(10), fixed(2))
                .with_cost(cost(1000, 100, 0))
                .without_boats(),
        ],
    }
}

/// Replace a unit's perks.
///
/// # Panics
///
/// Panics if the race has no unit in `slot`.
#[must_use]
pub fn with_unit_perks(mut race: RaceData, slot: UnitSlot, perks: PerkSet) -> RaceData {
    let unit = race
        .units
        .iter_mut()
        .find(|u| u.slot == slot)
        .expect("fixture race has every slot");
    unit.perks = perks;
    race
}

/// Every race the fixtures use.
#[must_use]
pub fn races() -> RaceRegistry {
    RaceRegistry::new()
        .with(human())
        .with(race_with("demon", Capability::SoulCollection))
        .with(race_with("norse", Capability::ChampionCreation))
        .with(race_with("sacred_order", Capability::ImmortalSlaying))
        .with(race_with("imperial", Capability::ImperialCrypt))
}

fn spell(key: &str, perk: SpellPerk, value: &str) -> SpellData {
    SpellData {
        key: key.to_string(),
        name: key.to_string(),
        scope: SpellScope::Own,
        class: SpellClass::Active,
        duration: 12,
        perks: perks(&[(perk, value)]),
        invasion: None,
        races: Vec::new(),
    }
}

/// Spells the fixtures cast.
#[must_use]
pub fn spells() -> SpellBook {
    SpellBook::new()
        .with(spell("stasis", SpellPerk::Stasis, "1"))
        .with(spell("bloodrage", SpellPerk::OffensivePower, "10"))
        .with(spell("mind_control", SpellPerk::MindControl, "3"))
        .with(spell("metabolism", SpellPerk::Metabolism, "1"))
        .with(spell("menticide", SpellPerk::Menticide, "1"))
}

/// A dominion of `acres` plain acres with `units` at home and boats to spare.
#[must_use]
pub fn dominion(id: DominionId, realm: RealmId, race: &str, acres: u64, units: UnitCounts) -> Dominion {
    let mut dominion = Dominion::new(id, format!("Dominion {id}"), realm, ROUND, race);
    dominion.land = LandHoldings::new().with(LandType::Plain, acres);
    dominion.military.units = units;
    dominion.peasants = acres * 15;
    dominion.resources = dominion
        .resources
        .with(Resource::Boats, 1000)
        .with(Resource::Platinum, 100_000)
        .with(Resource::Food, 50_000)
        .with(Resource::Ore, 20_000)
        .with(Resource::Lumber, 20_000);
    dominion
}

/// 1000 acres; 1000 archers guard home, 500 knights can attack.
#[must_use]
pub fn attacker() -> Dominion {
    dominion(ATTACKER, ATTACKER_REALM, "human", 1000, UnitCounts([100, 1000, 0, 500]))
}

/// 800 acres holding exactly `dp` raw DP in archers (`dp` must be a multiple of 5).
#[must_use]
pub fn defender(dp: u64) -> Dominion {
    dominion(DEFENDER, DEFENDER_REALM, "human", 800, UnitCounts([0, dp / 5, 0, 0]))
}

/// Deployment of `op` OP: knights for the tens, militia for the rest.
#[must_use]
pub fn deployment(op: u64) -> dominion_core::units::Deployment {
    dominion_core::units::Deployment::from_pairs(&[
        (UnitSlot::Four, (op / 10) as i64),
        (UnitSlot::One, (op % 10) as i64),
    ])
}

/// Rules, data, round and realms of the fixture world.
#[derive(Debug, Clone)]
pub struct World {
    /// Rules.
    pub rules: InvasionRules,
    /// Races.
    pub races: RaceRegistry,
    /// Spells.
    pub spells: SpellBook,
    /// The running round.
    pub round: Round,
    /// The attackers' realm.
    pub attacker_realm: Realm,
    /// The defenders' realm.
    pub defender_realm: Realm,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// The standard world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: rules(),
            races: races(),
            spells: spells(),
            round: Round::new(ROUND, 0),
            attacker_realm: Realm::new(ATTACKER_REALM, ROUND, "Attackers"),
            defender_realm: Realm::new(DEFENDER_REALM, ROUND, "Defenders"),
        }
    }

    /// Builder: register or replace a race.
    #[must_use]
    pub fn with_race(mut self, race: RaceData) -> Self {
        self.races.register(race);
        self
    }

    /// Engine over this world.
    #[must_use]
    pub const fn engine(&self) -> InvasionEngine<'_> {
        InvasionEngine::new(&self.rules, &self.races, &self.spells)
    }

    /// Context at `tick`.
    #[must_use]
    pub const fn context(&self, tick: u64) -> InvasionContext<'_> {
        InvasionContext::new(tick, &self.round, &self.attacker_realm)
    }

    /// A store holding this world and the given dominions.
    #[must_use]
    pub fn store(&self, dominions: impl IntoIterator<Item = Dominion>) -> DominionStore {
        let store = DominionStore::new(self.rules.clone(), self.races.clone(), self.spells.clone())
            .with_round(self.round)
            .with_realm(self.attacker_realm.clone())
            .with_realm(self.defender_realm.clone());
        dominions.into_iter().fold(store, DominionStore::with_dominion)
    }
}

/// Immortal slot-3 guards for faction tests.
#[must_use]
pub fn immortal_guards(race: RaceData) -> RaceData {
    with_unit_perks(race, UnitSlot::Three, perks(&[(UnitPerk::Immortal, "1")]))
}
