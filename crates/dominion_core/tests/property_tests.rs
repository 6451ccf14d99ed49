//! Property tests over random deployments and defenders.

use proptest::prelude::*;

use dominion_core::queue::{QueueResource, TickQueue};
use dominion_core::spells::ActiveSpell;
use dominion_core::units::{UnitCounts, UnitSlot};
use dominion_test_utils::determinism::verify_invasion_determinism;
use dominion_test_utils::fixtures::{self, World};
use dominion_test_utils::strategies;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_outcome_follows_power(deployment in strategies::deployment(), defender in strategies::defender()) {
        let world = World::new();
        let mut queue = TickQueue::new();
        let Ok(resolution) = world.engine().invade(
            &fixtures::attacker(),
            &defender,
            &deployment,
            &mut queue,
            &world.context(fixtures::TICK),
        ) else {
            return Ok(());
        };
        let result = &resolution.result;

        prop_assert_eq!(result.is_success(), result.attacker().op > result.defender().dp);
        if result.outcome().overwhelmed {
            prop_assert!(!result.is_success());
            prop_assert_eq!(result.defender_casualties(), 0);
        }
    }

    #[test]
    fn prop_units_and_land_are_conserved(deployment in strategies::deployment(), defender in strategies::defender()) {
        let world = World::new();
        let attacker = fixtures::attacker();
        let mut queue = TickQueue::new();
        let Ok(resolution) = world.engine().invade(
            &attacker,
            &defender,
            &deployment,
            &mut queue,
            &world.context(fixtures::TICK),
        ) else {
            return Ok(());
        };
        let result = &resolution.result;
        let report = result.attacker();

        // Nothing dies that was not sent, and everything sent is either lost or surviving.
        for slot in UnitSlot::ALL {
            prop_assert!(report.units_lost[slot] <= report.units_sent[slot]);
            prop_assert_eq!(report.units_lost[slot] + report.surviving_units[slot], report.units_sent[slot]);
        }
        let returning: i64 = queue
            .entries_for(fixtures::ATTACKER)
            .filter(|e| e.resource == QueueResource::Unit(UnitSlot::Four))
            .map(|e| e.amount)
            .sum();
        prop_assert_eq!(returning as u64, report.surviving_units[UnitSlot::Four]);

        prop_assert_eq!(
            defender.land.total() - resolution.defender.land.total(),
            result.land_conquered()
        );
        prop_assert!(resolution.defender.military.units[UnitSlot::Two] <= defender.military.units[UnitSlot::Two]);
        prop_assert!(resolution.defender.military.draftees <= defender.military.draftees);
    }

    #[test]
    fn prop_captured_units_are_accounted_for(
        deployment in strategies::deployment(),
        mut defender in strategies::defender(),
    ) {
        defender.spells.apply(ActiveSpell::new("mind_control", 12));
        let world = World::new();
        let mut queue = TickQueue::new();
        let Ok(resolution) = world.engine().invade(
            &fixtures::attacker(),
            &defender,
            &deployment,
            &mut queue,
            &world.context(fixtures::TICK),
        ) else {
            return Ok(());
        };
        let result = &resolution.result;
        let report = result.attacker();
        let (controlled, released) = result
            .defender()
            .mind_control
            .as_ref()
            .map_or((UnitCounts::ZERO, UnitCounts::ZERO), |mc| (mc.controlled, mc.released));

        // Guards capture at most their own number.
        prop_assert!(controlled.total() <= defender.military.units[UnitSlot::Three]);
        for slot in UnitSlot::ALL {
            prop_assert!(released[slot] <= controlled[slot]);
            prop_assert_eq!(
                report.units_lost[slot] + report.surviving_units[slot] + controlled[slot],
                report.units_sent[slot]
            );
        }
        let returning: i64 = queue
            .entries_for(fixtures::ATTACKER)
            .filter(|e| e.resource == QueueResource::Unit(UnitSlot::Four))
            .map(|e| e.amount)
            .sum();
        prop_assert_eq!(
            returning as u64,
            report.surviving_units[UnitSlot::Four] + released[UnitSlot::Four]
        );
    }

    #[test]
    fn prop_low_morale_is_always_rejected(morale in strategies::morale(), deployment in strategies::deployment()) {
        let world = World::new();
        let mut attacker = fixtures::attacker();
        attacker.morale = morale;
        let mut queue = TickQueue::new();
        let outcome = world.engine().invade(
            &attacker,
            &fixtures::defender(800),
            &deployment,
            &mut queue,
            &world.context(fixtures::TICK),
        );
        if morale < world.rules.morale.minimum_to_invade {
            prop_assert!(outcome.is_err());
            prop_assert!(queue.is_empty());
        }
    }

    #[test]
    fn prop_defender_morale_floors_at_zero(
        morale in strategies::morale(),
        deployment in strategies::deployment(),
        mut defender in strategies::defender(),
    ) {
        defender.morale = morale;
        let world = World::new();
        let mut queue = TickQueue::new();
        let Ok(resolution) = world.engine().invade(
            &fixtures::attacker(),
            &defender,
            &deployment,
            &mut queue,
            &world.context(fixtures::TICK),
        ) else {
            return Ok(());
        };
        let change = resolution.result.defender().morale_change;
        prop_assert!(change >= -i64::from(morale));
        prop_assert_eq!(i64::from(resolution.defender.morale), i64::from(morale) + change);
    }

    #[test]
    fn prop_invasions_are_deterministic(deployment in strategies::deployment(), defender in strategies::defender()) {
        let world = World::new();
        let result = verify_invasion_determinism(
            3,
            &world.engine(),
            &fixtures::attacker(),
            &defender,
            &deployment,
            &world.context(fixtures::TICK),
        );
        prop_assert!(result.is_deterministic, "hashes: {:?}", result.hashes);
    }
}
