//! Resource kinds and stock balances.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// A stockpiled resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Currency.
    Platinum,
    /// Feeds the population.
    Food,
    /// Construction material.
    Lumber,
    /// Spell fuel.
    Mana,
    /// Construction and unit material.
    Ore,
    /// Precious stones.
    Gems,
    /// Collected souls.
    Soul,
    /// Collected blood.
    Blood,
    /// Fallen heroes awaiting glory.
    Champion,
    /// Transport for units that need them.
    Boats,
    /// Research points.
    Tech,
}

impl Resource {
    /// All resources in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Platinum,
        Self::Food,
        Self::Lumber,
        Self::Mana,
        Self::Ore,
        Self::Gems,
        Self::Soul,
        Self::Blood,
        Self::Champion,
        Self::Boats,
        Self::Tech,
    ];

    /// Data-file key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Platinum => "platinum",
            Self::Food => "food",
            Self::Lumber => "lumber",
            Self::Mana => "mana",
            Self::Ore => "ore",
            Self::Gems => "gems",
            Self::Soul => "soul",
            Self::Blood => "blood",
            Self::Champion => "champion",
            Self::Boats => "boats",
            Self::Tech => "tech",
        }
    }

    /// Parse a data-file key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.key() == key)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Balances for every resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourceStock([u64; 11]);

impl ResourceStock {
    /// Empty stock.
    #[must_use]
    pub const fn new() -> Self {
        Self([0; 11])
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, resource: Resource, amount: u64) -> Self {
        self[resource] = amount;
        self
    }

    /// Add to a balance.
    pub fn add(&mut self, resource: Resource, amount: u64) {
        self[resource] = self[resource].saturating_add(amount);
    }

    /// Remove up to `amount` from a balance, returning what was removed.
    pub fn take(&mut self, resource: Resource, amount: u64) -> u64 {
        let taken = amount.min(self[resource]);
        self[resource] -= taken;
        taken
    }

    /// Apply a signed delta, flooring at zero.
    pub fn apply_delta(&mut self, resource: Resource, delta: i64) {
        if delta >= 0 {
            self.add(resource, delta.unsigned_abs());
        } else {
            self.take(resource, delta.unsigned_abs());
        }
    }
}

impl Index<Resource> for ResourceStock {
    type Output = u64;

    fn index(&self, resource: Resource) -> &u64 {
        &self.0[resource.index()]
    }
}

impl IndexMut<Resource> for ResourceStock {
    fn index_mut(&mut self, resource: Resource) -> &mut u64 {
        &mut self.0[resource.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_roundtrip() {
        for resource in Resource::ALL {
            assert_eq!(Resource::from_key(resource.key()), Some(resource));
        }
        assert_eq!(Resource::from_key("unobtainium"), None);
    }

    #[test]
    fn test_take_is_capped() {
        let mut stock = ResourceStock::new().with(Resource::Ore, 30);
        assert_eq!(stock.take(Resource::Ore, 50), 30);
        assert_eq!(stock[Resource::Ore], 0);
    }

    #[test]
    fn test_signed_delta_floors_at_zero() {
        let mut stock = ResourceStock::new().with(Resource::Food, 10);
        stock.apply_delta(Resource::Food, -25);
        assert_eq!(stock[Resource::Food], 0);
        stock.apply_delta(Resource::Food, 7);
        assert_eq!(stock[Resource::Food], 7);
    }
}
