//! Race configuration data.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::factions::{Alignment, Capability};
use crate::improvements::Improvement;
use crate::land::{BuildingType, LandType};
use crate::math::Fixed;
use crate::perks::{slot_from_number, PerkAtom, PerkKey, PerkSet, RacePerk, UnitPerk};
use crate::resources::Resource;
use crate::units::UnitSlot;

use super::UnitData;

/// Complete race definition loaded from a RON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceData {
    /// Unique key, referenced by dominions.
    pub key: String,

    /// Display name.
    pub name: String,

    /// Alignment.
    #[serde(default)]
    pub alignment: Alignment,

    /// Land type where extra discovered land goes.
    pub home_land_type: LandType,

    /// Units carried per boat.
    #[serde(default = "default_boat_capacity")]
    pub boat_capacity: u64,

    /// Resources buildings are constructed with.
    #[serde(default = "default_construction_materials")]
    pub construction_materials: Vec<Resource>,

    /// Faction mechanics this race uses.
    #[serde(default)]
    pub capabilities: Vec<Capability>,

    /// Race-wide perks.
    #[serde(default)]
    pub perks: PerkSet,

    /// The four units, one per slot.
    pub units: Vec<UnitData>,
}

const fn default_boat_capacity() -> u64 {
    30
}

fn default_construction_materials() -> Vec<Resource> {
    vec![Resource::Platinum, Resource::Lumber]
}

impl RaceData {
    /// Unit definition for a slot.
    pub fn unit(&self, slot: UnitSlot) -> Result<&UnitData> {
        self.units
            .iter()
            .find(|u| u.slot == slot)
            .ok_or_else(|| GameError::InvalidState(format!("race '{}' has no unit {slot}", self.key)))
    }

    /// Iterate units in slot order.
    pub fn units_in_order(&self) -> impl Iterator<Item = &UnitData> {
        UnitSlot::ALL
            .into_iter()
            .filter_map(|slot| self.units.iter().find(|u| u.slot == slot))
    }

    /// Check whether the race has a capability.
    #[must_use]
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Race perk as a fraction.
    #[must_use]
    pub fn perk_multiplier(&self, perk: RacePerk) -> Fixed {
        self.perks.multiplier(perk)
    }

    /// Whether buildings of this race are paid for with a resource.
    #[must_use]
    pub fn builds_with(&self, resource: Resource) -> bool {
        self.construction_materials.contains(&resource)
    }

    /// Validate references inside the race definition.
    ///
    /// Checks that:
    /// - Every slot 1-4 is defined exactly once
    /// - Perk keys are known
    /// - Perks referencing slots, land, buildings, resources and
    ///   improvements point at something that exists
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for slot in UnitSlot::ALL {
            match self.units.iter().filter(|u| u.slot == slot).count() {
                1 => {}
                0 => errors.push(format!("Race '{}' is missing unit {slot}", self.key)),
                n => errors.push(format!("Race '{}' defines unit {slot} {n} times", self.key)),
            }
        }

        if self.boat_capacity == 0 {
            errors.push(format!("Race '{}' has zero boat capacity", self.key));
        }

        for key in self.perks.unknown_keys::<RacePerk>() {
            errors.push(format!("Race '{}' has unknown perk '{key}'", self.key));
        }

        for unit in &self.units {
            let context = format!("Unit '{}' of race '{}'", unit.name, self.key);
            for key in unit.perks.unknown_keys::<UnitPerk>() {
                errors.push(format!("{context} has unknown perk '{key}'"));
            }
            if let Err(err) = check_unit_perk_references(&unit.perks) {
                errors.push(format!("{context}: {err}"));
            }
        }

        errors
    }
}

/// Verify that every reference carried by a unit's perks resolves.
pub fn check_unit_perk_references(perks: &PerkSet) -> Result<()> {
    for key in [UnitPerk::DiesInto, UnitPerk::WinsInto] {
        perks.slot(key)?;
    }

    for key in [
        UnitPerk::DiesIntoMultiple,
        UnitPerk::FasterReturnIfPaired,
        UnitPerk::OffenseFromPairing,
        UnitPerk::DefenseFromPairing,
    ] {
        if let Some(number) = perks.number_at(key, 0)? {
            slot_from_number(key, number)?;
        }
    }

    if let Some(number) = perks.number_at(UnitPerk::ValueConversion, 1)? {
        slot_from_number(UnitPerk::ValueConversion, number)?;
    }

    for index in [1, 2] {
        if let Some(number) = perks.number_at(UnitPerk::StrengthConversion, index)? {
            slot_from_number(UnitPerk::StrengthConversion, number)?;
        }
    }

    for group in perks.groups(UnitPerk::StaggeredConversion) {
        let number = group.get(1).and_then(PerkAtom::as_number);
        let number = number.ok_or_else(|| malformed(UnitPerk::StaggeredConversion, "expected ratio,slot"))?;
        slot_from_number(UnitPerk::StaggeredConversion, number)?;
    }

    conversion_targets(perks)?;

    for key in [UnitPerk::OffenseFromLand, UnitPerk::DefenseFromLand] {
        if let Some(PerkAtom::Key(land)) = perks.list(key).first() {
            LandType::from_key(land).ok_or_else(|| malformed(key, &format!("unknown land type '{land}'")))?;
        }
    }

    for key in [UnitPerk::OffenseFromBuilding, UnitPerk::DefenseFromBuilding] {
        if let Some(PerkAtom::Key(building)) = perks.list(key).first() {
            BuildingType::from_key(building)
                .ok_or_else(|| malformed(key, &format!("unknown building '{building}'")))?;
        }
    }

    let limit = perks.list(UnitPerk::BuildingLimit);
    if !limit.is_empty() {
        let building = limit.first().map(PerkAtom::as_key).unwrap_or_default();
        BuildingType::from_key(&building)
            .ok_or_else(|| malformed(UnitPerk::BuildingLimit, &format!("unknown building '{building}'")))?;
        if let Some(PerkAtom::Key(improvement)) = limit.get(2) {
            Improvement::from_key(improvement).ok_or_else(|| {
                malformed(UnitPerk::BuildingLimit, &format!("unknown improvement '{improvement}'"))
            })?;
        }
    }

    for key in [UnitPerk::Plunders, UnitPerk::Plunder] {
        for group in perks.groups(key) {
            let resource = group.first().map(PerkAtom::as_key).unwrap_or_default();
            Resource::from_key(&resource)
                .ok_or_else(|| malformed(key, &format!("unknown resource '{resource}'")))?;
        }
    }

    Ok(())
}

/// Target slots of a plain `conversion` perk (`"3"` or `"34"` style digits).
pub fn conversion_targets(perks: &PerkSet) -> Result<Vec<UnitSlot>> {
    let Some(value) = perks.get(UnitPerk::Conversion) else {
        return Ok(Vec::new());
    };
    value
        .to_string()
        .chars()
        .filter(char::is_ascii_digit)
        .map(|digit| {
            let number = i64::from(digit as u8 - b'0');
            UnitSlot::from_number(number).ok_or(GameError::InvalidSlotReference {
                key: UnitPerk::Conversion.as_str().to_string(),
                slot: number,
            })
        })
        .collect()
}

fn malformed(key: impl PerkKey, message: &str) -> GameError {
    GameError::MalformedPerk {
        key: key.as_str().to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_race() -> RaceData {
        let unit = |slot, name: &str| UnitData::new(slot, name, Fixed::from_num(3), Fixed::from_num(3));
        RaceData {
            key: "human".to_string(),
            name: "Human".to_string(),
            alignment: Alignment::Good,
            home_land_type: LandType::Plain,
            boat_capacity: 30,
            construction_materials: default_construction_materials(),
            capabilities: Vec::new(),
            perks: PerkSet::new(),
            units: vec![
                unit(UnitSlot::One, "Spearman"),
                unit(UnitSlot::Two, "Archer"),
                unit(UnitSlot::Three, "Knight"),
                unit(UnitSlot::Four, "Cavalry"),
            ],
        }
    }

    #[test]
    fn test_validate_valid_data() {
        let race = create_test_race();
        let errors = race.validate();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn test_validate_missing_slot() {
        let mut race = create_test_race();
        race.units.retain(|u| u.slot != UnitSlot::Three);
        let errors = race.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("missing unit 3"));
    }

    #[test]
    fn test_validate_invalid_slot_reference() {
        let mut race = create_test_race();
        race.units[0].perks = PerkSet::new().with(UnitPerk::DiesInto, "9").expect("perk");
        let errors = race.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("invalid unit slot 9"));
    }

    #[test]
    fn test_conversion_targets() {
        let perks = PerkSet::new().with(UnitPerk::Conversion, "34").expect("perk");
        assert_eq!(
            conversion_targets(&perks).expect("targets"),
            vec![UnitSlot::Three, UnitSlot::Four]
        );
    }

    #[test]
    fn test_unit_lookup() {
        let race = create_test_race();
        assert_eq!(race.unit(UnitSlot::Two).expect("unit").name, "Archer");
        assert_eq!(race.units_in_order().count(), 4);
    }
}
