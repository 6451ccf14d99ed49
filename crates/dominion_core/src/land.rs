//! Land types, buildings and holdings.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// Terrain type of an acre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandType {
    /// Plains.
    Plain,
    /// Mountains.
    Mountain,
    /// Swamps.
    Swamp,
    /// Forests.
    Forest,
    /// Hills.
    Hill,
    /// Water.
    Water,
}

impl LandType {
    /// All land types in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Plain,
        Self::Mountain,
        Self::Swamp,
        Self::Forest,
        Self::Hill,
        Self::Water,
    ];

    /// Data-file key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Mountain => "mountain",
            Self::Swamp => "swamp",
            Self::Forest => "forest",
            Self::Hill => "hill",
            Self::Water => "water",
        }
    }

    /// Parse a data-file key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.key() == key)
    }

    /// Buildings that stand on this land type.
    pub fn buildings(self) -> impl Iterator<Item = BuildingType> {
        BuildingType::ALL
            .into_iter()
            .filter(move |b| b.land_type() == self)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for LandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Building type; each belongs to exactly one land type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    /// Produces platinum.
    Alchemy,
    /// Produces food.
    Farm,
    /// Reduces unit costs.
    Smithy,
    /// Boosts improvements and shields them from damage.
    Masonry,
    /// Produces ore.
    OreMine,
    /// Raises offensive power.
    GryphonNest,
    /// Produces mana.
    Tower,
    /// Trains wizards.
    WizardGuild,
    /// Reduces enemy defensive modifiers.
    Temple,
    /// Produces lumber.
    Lumberyard,
    /// Shelters spies.
    ForestHaven,
    /// Reduces rezoning costs.
    Factory,
    /// Raises defensive power.
    GuardTower,
    /// Reduces offensive casualties.
    Shrine,
    /// Houses military.
    Barracks,
    /// Produces food and boats.
    Dock,
    /// Protects boats.
    Harbor,
}

impl BuildingType {
    /// All buildings in declaration order.
    pub const ALL: [Self; 17] = [
        Self::Alchemy,
        Self::Farm,
        Self::Smithy,
        Self::Masonry,
        Self::OreMine,
        Self::GryphonNest,
        Self::Tower,
        Self::WizardGuild,
        Self::Temple,
        Self::Lumberyard,
        Self::ForestHaven,
        Self::Factory,
        Self::GuardTower,
        Self::Shrine,
        Self::Barracks,
        Self::Dock,
        Self::Harbor,
    ];

    /// Land type this building stands on.
    #[must_use]
    pub const fn land_type(self) -> LandType {
        match self {
            Self::Alchemy | Self::Farm | Self::Smithy | Self::Masonry => LandType::Plain,
            Self::OreMine | Self::GryphonNest => LandType::Mountain,
            Self::Tower | Self::WizardGuild | Self::Temple => LandType::Swamp,
            Self::Lumberyard | Self::ForestHaven => LandType::Forest,
            Self::Factory | Self::GuardTower | Self::Shrine | Self::Barracks => LandType::Hill,
            Self::Dock | Self::Harbor => LandType::Water,
        }
    }

    /// Data-file key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Alchemy => "alchemy",
            Self::Farm => "farm",
            Self::Smithy => "smithy",
            Self::Masonry => "masonry",
            Self::OreMine => "ore_mine",
            Self::GryphonNest => "gryphon_nest",
            Self::Tower => "tower",
            Self::WizardGuild => "wizard_guild",
            Self::Temple => "temple",
            Self::Lumberyard => "lumberyard",
            Self::ForestHaven => "forest_haven",
            Self::Factory => "factory",
            Self::GuardTower => "guard_tower",
            Self::Shrine => "shrine",
            Self::Barracks => "barracks",
            Self::Dock => "dock",
            Self::Harbor => "harbor",
        }
    }

    /// Parse a data-file key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.key() == key)
    }
}

impl fmt::Display for BuildingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Acres owned per land type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LandHoldings([u64; 6]);

impl LandHoldings {
    /// No land.
    #[must_use]
    pub const fn new() -> Self {
        Self([0; 6])
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, land: LandType, acres: u64) -> Self {
        self[land] = acres;
        self
    }

    /// Total acres.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Iterate `(land type, acres)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (LandType, u64)> + '_ {
        LandType::ALL.iter().map(move |&land| (land, self[land]))
    }
}

impl Index<LandType> for LandHoldings {
    type Output = u64;

    fn index(&self, land: LandType) -> &u64 {
        &self.0[land.index()]
    }
}

impl IndexMut<LandType> for LandHoldings {
    fn index_mut(&mut self, land: LandType) -> &mut u64 {
        &mut self.0[land.index()]
    }
}

/// Completed buildings by type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Buildings(BTreeMap<BuildingType, u64>);

impl Buildings {
    /// No buildings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, building: BuildingType, count: u64) -> Self {
        self.set(building, count);
        self
    }

    /// Count of a building type.
    #[must_use]
    pub fn get(&self, building: BuildingType) -> u64 {
        self.0.get(&building).copied().unwrap_or(0)
    }

    /// Overwrite the count of a building type.
    pub fn set(&mut self, building: BuildingType, count: u64) {
        if count == 0 {
            self.0.remove(&building);
        } else {
            self.0.insert(building, count);
        }
    }

    /// Remove up to `count` buildings, returning how many were removed.
    pub fn remove(&mut self, building: BuildingType, count: u64) -> u64 {
        let current = self.get(building);
        let removed = count.min(current);
        self.set(building, current - removed);
        removed
    }

    /// Total buildings standing on a land type.
    #[must_use]
    pub fn on_land(&self, land: LandType) -> u64 {
        land.buildings().map(|b| self.get(b)).sum()
    }

    /// Total buildings.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_land_type_has_buildings() {
        for land in LandType::ALL {
            assert!(land.buildings().count() > 0, "{land} has no buildings");
        }
    }

    #[test]
    fn test_buildings_on_land() {
        let buildings = Buildings::new()
            .with(BuildingType::Farm, 20)
            .with(BuildingType::Alchemy, 5)
            .with(BuildingType::Tower, 3);
        assert_eq!(buildings.on_land(LandType::Plain), 25);
        assert_eq!(buildings.on_land(LandType::Swamp), 3);
        assert_eq!(buildings.total(), 28);
    }

    #[test]
    fn test_remove_is_capped() {
        let mut buildings = Buildings::new().with(BuildingType::Temple, 4);
        assert_eq!(buildings.remove(BuildingType::Temple, 10), 4);
        assert_eq!(buildings.get(BuildingType::Temple), 0);
    }
}
