//! Unit slots and per-slot unit counts.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// One of the four race-specific unit slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitSlot {
    /// Slot 1 (typically basic offense).
    One,
    /// Slot 2 (typically basic defense).
    Two,
    /// Slot 3 (typically elite defense).
    Three,
    /// Slot 4 (typically elite offense).
    Four,
}

impl UnitSlot {
    /// All slots in order.
    pub const ALL: [Self; 4] = [Self::One, Self::Two, Self::Three, Self::Four];

    /// Slot for a 1-based number.
    #[must_use]
    pub const fn from_number(number: i64) -> Option<Self> {
        match number {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            _ => None,
        }
    }

    /// 1-based slot number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// 0-based array index.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
            Self::Three => 2,
            Self::Four => 3,
        }
    }
}

impl fmt::Display for UnitSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Attribute tags on a unit definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitAttribute {
    /// Thinking creature; may be mind controlled.
    Sentient,
    /// Projectile or consumable.
    Ammunition,
    /// Gear rather than a creature.
    Equipment,
    /// Magical being.
    Magical,
    /// Very large.
    Massive,
    /// Construct.
    Machine,
    /// No mind to control.
    Mindless,
    /// Naval vessel.
    Ship,
    /// Elder creature.
    Wise,
}

impl UnitAttribute {
    /// Attributes that prevent mind control.
    pub const MIND_CONTROL_IMMUNE: [Self; 8] = [
        Self::Ammunition,
        Self::Equipment,
        Self::Magical,
        Self::Massive,
        Self::Machine,
        Self::Mindless,
        Self::Ship,
        Self::Wise,
    ];

    /// Attributes that prevent stunning.
    pub const STUN_IMMUNE: [Self; 6] = [
        Self::Ammunition,
        Self::Equipment,
        Self::Magical,
        Self::Massive,
        Self::Machine,
        Self::Ship,
    ];

    /// Attributes whose dead leave no bodies for the crypt.
    pub const NO_BODY: [Self; 5] = [
        Self::Ammunition,
        Self::Equipment,
        Self::Machine,
        Self::Ship,
        Self::Massive,
    ];

    /// Attributes that cannot be eaten by metabolism.
    pub const INEDIBLE: [Self; 4] = [Self::Ammunition, Self::Equipment, Self::Magical, Self::Machine];

    /// Attributes that cannot be converted.
    pub const UNCONVERTIBLE: [Self; 6] = Self::STUN_IMMUNE;
}

/// Count per unit slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UnitCounts(pub [u64; 4]);

impl UnitCounts {
    /// All zero.
    pub const ZERO: Self = Self([0; 4]);

    /// Build from a slot list.
    #[must_use]
    pub fn from_pairs(pairs: &[(UnitSlot, u64)]) -> Self {
        let mut counts = Self::ZERO;
        for &(slot, amount) in pairs {
            counts[slot] += amount;
        }
        counts
    }

    /// Sum over slots.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Whether every slot is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&n| n == 0)
    }

    /// Iterate `(slot, count)` in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitSlot, u64)> + '_ {
        UnitSlot::ALL.iter().map(move |&slot| (slot, self[slot]))
    }

    /// Slot-wise saturating addition.
    #[must_use]
    pub fn saturating_add(&self, other: &Self) -> Self {
        let mut out = *self;
        for slot in UnitSlot::ALL {
            out[slot] = out[slot].saturating_add(other[slot]);
        }
        out
    }

    /// Slot-wise saturating subtraction.
    #[must_use]
    pub fn saturating_sub(&self, other: &Self) -> Self {
        let mut out = *self;
        for slot in UnitSlot::ALL {
            out[slot] = out[slot].saturating_sub(other[slot]);
        }
        out
    }
}

impl Index<UnitSlot> for UnitCounts {
    type Output = u64;

    fn index(&self, slot: UnitSlot) -> &u64 {
        &self.0[slot.index()]
    }
}

impl IndexMut<UnitSlot> for UnitCounts {
    fn index_mut(&mut self, slot: UnitSlot) -> &mut u64 {
        &mut self.0[slot.index()]
    }
}

/// Requested units per slot. Quantities are signed so that bad input can be
/// rejected by the validation gate rather than by the type system of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Deployment(pub [i64; 4]);

impl Deployment {
    /// Build from a slot list.
    #[must_use]
    pub fn from_pairs(pairs: &[(UnitSlot, i64)]) -> Self {
        let mut deployment = Self::default();
        for &(slot, amount) in pairs {
            deployment.0[slot.index()] += amount;
        }
        deployment
    }

    /// Requested quantity for a slot.
    #[must_use]
    pub const fn get(&self, slot: UnitSlot) -> i64 {
        self.0[slot.index()]
    }

    /// Whether any quantity is negative.
    #[must_use]
    pub fn has_negative(&self) -> bool {
        self.0.iter().any(|&n| n < 0)
    }

    /// Counts, with negative quantities treated as zero.
    #[must_use]
    pub fn counts(&self) -> UnitCounts {
        let mut counts = UnitCounts::ZERO;
        for slot in UnitSlot::ALL {
            counts[slot] = u64::try_from(self.get(slot)).unwrap_or(0);
        }
        counts
    }
}
