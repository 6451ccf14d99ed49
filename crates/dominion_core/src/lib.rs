//! # Dominion Core
//!
//! Deterministic invasion resolution for a dominion strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No network IO
//! - No randomness
//! - No floating-point math (uses fixed-point)
//!
//! One invasion either commits completely (both dominions, their queued
//! effects, realm records, the event and its notification) or not at all.
//!
//! ## Crate Structure
//!
//! - [`data`] - Race, unit and spell definitions loaded from RON
//! - [`perks`] - Typed perk keys and perk value parsing
//! - [`calculators`] - Power, casualty, conversion and land math
//! - [`invasion`] - Validation gate and battle pipeline
//! - [`queue`] - Delayed effects queue and transactions
//! - [`store`] - Locked, all-or-nothing invasion commits
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod calculators;
pub mod data;
pub mod dominion;
pub mod error;
pub mod event;
pub mod factions;
pub mod improvements;
pub mod invasion;
pub mod land;
pub mod math;
pub mod perks;
pub mod queue;
pub mod registry;
pub mod resources;
pub mod rules;
pub mod spells;
pub mod store;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::calculators::{Combatant, LandCalculator, MilitaryCalculator};
    pub use crate::data::{RaceData, SpellData, UnitData};
    pub use crate::dominion::{Dominion, DominionId, Realm, RealmId, Round};
    pub use crate::error::{GameError, InvasionError, Result};
    pub use crate::event::{GameEvent, Notification};
    pub use crate::factions::Capability;
    pub use crate::invasion::{InvasionContext, InvasionEngine, InvasionResolution, InvasionResult};
    pub use crate::land::{BuildingType, LandType};
    pub use crate::math::Fixed;
    pub use crate::queue::{QueueChannel, QueueResource, QueueService, TickQueue};
    pub use crate::registry::RaceRegistry;
    pub use crate::resources::{Resource, ResourceStock};
    pub use crate::rules::InvasionRules;
    pub use crate::spells::{ActiveSpell, SpellBook};
    pub use crate::store::{AlertType, DominionStore, InvasionOutcome};
    pub use crate::units::{Deployment, UnitCounts, UnitSlot};
}
