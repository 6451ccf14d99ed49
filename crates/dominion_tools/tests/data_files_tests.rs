//! Checks on the shipped data directory and demo scenario.

use std::path::{Path, PathBuf};

use dominion_core::factions::Capability;
use dominion_core::store::AlertType;
use dominion_core::units::UnitSlot;
use dominion_tools::simulate::{render, run_scenario, Scenario};
use dominion_tools::validate::validate_data_directory;

fn workspace_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..").join(relative)
}

#[test]
fn test_shipped_data_is_valid() {
    let data = validate_data_directory(&workspace_path("assets/data")).expect("shipped data validates");
    assert_eq!(data.races.len(), 5);
    assert!(data.spells.get("bloodrage").is_some());
    assert_eq!(data.rules.morale.minimum_to_invade, 50);
}

#[test]
fn test_every_faction_mechanic_has_a_race() {
    let data = validate_data_directory(&workspace_path("assets/data")).expect("shipped data validates");
    for capability in [
        Capability::SoulCollection,
        Capability::ChampionCreation,
        Capability::ImmortalSlaying,
        Capability::ImperialCrypt,
    ] {
        assert!(
            data.races.iter().any(|race| race.has_capability(capability)),
            "no race has {}",
            capability.display_name()
        );
    }
}

#[test]
fn test_demo_scenario_is_a_victory() {
    let data = validate_data_directory(&workspace_path("assets/data")).expect("shipped data validates");
    let scenario = Scenario::load(&workspace_path("demos/scenario.ron")).expect("demo scenario parses");

    let report = run_scenario(&data, &scenario).expect("demo scenario resolves");
    assert_eq!(report.outcome.alert_type, AlertType::Success);
    // Cavalry always lose half of what was sent.
    assert_eq!(report.result.attacker().units_lost[UnitSlot::Four], 250);
    assert!(render(&report, true).expect("json").contains("\"event_id\": 1"));
}
