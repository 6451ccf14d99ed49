//! Proptest strategies over the fixture world.

use proptest::prelude::*;

use dominion_core::dominion::Dominion;
use dominion_core::units::{Deployment, UnitCounts, UnitSlot};

use crate::fixtures;

/// Knights and militia an attacker can send: up to 500 knights, 100 militia.
pub fn deployment() -> impl Strategy<Value = Deployment> {
    (1i64..=500, 0i64..=100).prop_map(|(knights, militia)| {
        Deployment::from_pairs(&[(UnitSlot::Four, knights), (UnitSlot::One, militia)])
    })
}

/// Defenders between 500 and 1200 acres with a mixed garrison.
pub fn defender() -> impl Strategy<Value = Dominion> {
    (500u64..=1200, 0u64..=400, 0u64..=200, 0u64..=2000).prop_map(|(acres, archers, guards, draftees)| {
        let mut defender = fixtures::dominion(
            fixtures::DEFENDER,
            fixtures::DEFENDER_REALM,
            "human",
            acres,
            UnitCounts([0, archers, guards, 0]),
        );
        defender.military.draftees = draftees;
        defender
    })
}

/// Morale values on both sides of the invasion minimum.
pub fn morale() -> impl Strategy<Value = u32> {
    0u32..=100
}
