//! Pure calculators consulted by the invasion pipeline.
//!
//! - [`military`] - offensive and defensive power
//! - [`casualties`] - per-slot casualty multipliers
//! - [`conversion`] - units gained from the enemy dead
//! - [`land`] - land ratio, range and acres conquered
//!
//! Calculators never mutate state; they read a [`Combatant`] view of each
//! side and return numbers.

pub mod casualties;
pub mod conversion;
pub mod land;
pub mod military;

pub use casualties::{CasualtiesCalculator, CasualtyContext};
pub use conversion::{ConversionCalculator, ConversionContext, Conversions};
pub use land::{BuildingLoss, LandCalculator};
pub use military::{DefendingForce, MilitaryCalculator, PowerContext, PowerKind};

use crate::data::{RaceData, UnitData};
use crate::dominion::Dominion;
use crate::error::Result;
use crate::land::{BuildingType, LandType};
use crate::math::{fx, ratio, Fixed};
use crate::units::UnitSlot;

/// Read-only view of one side of a battle.
#[derive(Debug, Clone, Copy)]
pub struct Combatant<'a> {
    /// Dominion state.
    pub dominion: &'a Dominion,
    /// Race of the dominion.
    pub race: &'a RaceData,
}

impl<'a> Combatant<'a> {
    /// Pair a dominion with its race.
    #[must_use]
    pub const fn new(dominion: &'a Dominion, race: &'a RaceData) -> Self {
        Self { dominion, race }
    }

    /// Unit definition of a slot.
    pub fn unit(&self, slot: UnitSlot) -> Result<&'a UnitData> {
        self.race.unit(slot)
    }

    /// Total acres.
    #[must_use]
    pub fn total_land(&self) -> u64 {
        self.dominion.total_land()
    }

    /// Share of land of a type, in percent.
    #[must_use]
    pub fn land_percentage(&self, land: LandType) -> Fixed {
        ratio(fx(self.dominion.land[land]), fx(self.total_land())) * Fixed::from_num(100)
    }

    /// Share of land covered by a building type, in percent.
    #[must_use]
    pub fn building_percentage(&self, building: BuildingType) -> Fixed {
        ratio(fx(self.dominion.building(building)), fx(self.total_land())) * Fixed::from_num(100)
    }

    /// `(wizards + 2 × archmages) / land`.
    #[must_use]
    pub fn wizard_ratio(&self) -> Fixed {
        let military = &self.dominion.military;
        let wizards = military.wizards.saturating_add(military.archmages.saturating_mul(2));
        ratio(fx(wizards), fx(self.total_land()))
    }
}
