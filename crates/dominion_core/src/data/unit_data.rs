//! Unit data structures for data-driven unit definitions.

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, Fixed};
use crate::perks::{PerkSet, UnitPerk};
use crate::resources::Resource;
use crate::units::{UnitAttribute, UnitSlot};

/// Training cost of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitCost {
    /// Platinum per unit.
    pub platinum: u64,
    /// Ore per unit.
    pub ore: u64,
    /// Lumber per unit.
    pub lumber: u64,
    /// Gems per unit.
    pub gems: u64,
    /// Mana per unit.
    pub mana: u64,
}

impl UnitCost {
    /// Cost in a given resource (zero for resources units are not paid in).
    #[must_use]
    pub const fn of(&self, resource: Resource) -> u64 {
        match resource {
            Resource::Platinum => self.platinum,
            Resource::Ore => self.ore,
            Resource::Lumber => self.lumber,
            Resource::Gems => self.gems,
            Resource::Mana => self.mana,
            _ => 0,
        }
    }
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     slot: Four,
///     name: "Knight",
///     cost: (platinum: 1000, ore: 100),
///     offense: 6.0,
///     defense: 2.0,
///     attributes: [sentient],
///     perks: {"fixed_casualties": "50"},
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitData {
    /// Slot this unit occupies.
    pub slot: UnitSlot,

    /// Display name.
    pub name: String,

    /// Training cost.
    #[serde(default)]
    pub cost: UnitCost,

    /// Base offensive power.
    #[serde(with = "decimal_serde")]
    pub offense: Fixed,

    /// Base defensive power.
    #[serde(with = "decimal_serde")]
    pub defense: Fixed,

    /// Whether the unit needs boats to be sent.
    #[serde(default = "default_need_boat")]
    pub need_boat: bool,

    /// Attribute tags.
    #[serde(default)]
    pub attributes: Vec<UnitAttribute>,

    /// Named perks.
    #[serde(default)]
    pub perks: PerkSet,
}

/// Units need boats unless stated otherwise.
const fn default_need_boat() -> bool {
    true
}

impl UnitData {
    /// Create a unit with base powers and no perks.
    #[must_use]
    pub fn new(slot: UnitSlot, name: impl Into<String>, offense: Fixed, defense: Fixed) -> Self {
        Self {
            slot,
            name: name.into(),
            cost: UnitCost::default(),
            offense,
            defense,
            need_boat: true,
            attributes: Vec::new(),
            perks: PerkSet::new(),
        }
    }

    /// Builder: attach perks.
    #[must_use]
    pub fn with_perks(mut self, perks: PerkSet) -> Self {
        self.perks = perks;
        self
    }

    /// Builder: attach attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: &[UnitAttribute]) -> Self {
        self.attributes = attributes.to_vec();
        self
    }

    /// Builder: set the cost.
    #[must_use]
    pub fn with_cost(mut self, cost: UnitCost) -> Self {
        self.cost = cost;
        self
    }

    /// Builder: units that do not need boats.
    #[must_use]
    pub fn without_boats(mut self) -> Self {
        self.need_boat = false;
        self
    }

    /// Check if this unit has the specified attribute.
    #[must_use]
    pub fn has_attribute(&self, attribute: UnitAttribute) -> bool {
        self.attributes.contains(&attribute)
    }

    /// Check if this unit has any of the attributes.
    #[must_use]
    pub fn has_any_attribute(&self, attributes: &[UnitAttribute]) -> bool {
        attributes.iter().any(|a| self.has_attribute(*a))
    }

    /// Whether this unit can never die.
    #[must_use]
    pub fn is_true_immortal(&self) -> bool {
        self.perks.has(UnitPerk::TrueImmortal)
    }

    /// Whether this unit carries any immortality perk.
    #[must_use]
    pub fn is_immortal(&self) -> bool {
        self.perks.has(UnitPerk::Immortal)
            || self.perks.has(UnitPerk::TrueImmortal)
            || self.perks.has(UnitPerk::ImmortalOnVictory)
            || self.perks.has(UnitPerk::ImmortalVsLandRange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_from_ron() {
        let unit: UnitData = ron::from_str(
            r#"UnitData(
                slot: Four,
                name: "Knight",
                cost: (platinum: 1000, ore: 100),
                offense: 6.0,
                defense: 2.0,
                attributes: [sentient],
                perks: {"fixed_casualties": "50"},
            )"#,
        )
        .expect("parse");

        assert_eq!(unit.slot, UnitSlot::Four);
        assert!(unit.need_boat);
        assert_eq!(unit.cost.of(Resource::Ore), 100);
        assert!(unit.has_attribute(UnitAttribute::Sentient));
        assert_eq!(unit.perks.value(UnitPerk::FixedCasualties), Fixed::from_num(50));
    }

    #[test]
    fn test_immortality() {
        let unit = UnitData::new(UnitSlot::Three, "Paladin", Fixed::ZERO, Fixed::from_num(6))
            .with_perks(PerkSet::new().with(UnitPerk::Immortal, "1").expect("perk"));
        assert!(unit.is_immortal());
        assert!(!unit.is_true_immortal());
    }
}
