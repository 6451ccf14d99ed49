//! Data structures for race and spell configuration.
//!
//! This module contains pure data structures that define races, their
//! units and spells. All structs are designed to be deserialized from RON
//! files.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by [`crate::registry`].

mod race_data;
mod spell_data;
mod unit_data;

pub use race_data::{check_unit_perk_references, conversion_targets, RaceData};
pub use spell_data::{BattleSide, InvasionTrigger, SpellClass, SpellData, SpellScope};
pub use unit_data::{UnitCost, UnitData};
