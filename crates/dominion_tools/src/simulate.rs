//! Run one invasion from a scenario file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use dominion_core::dominion::{Dominion, Realm, Round};
use dominion_core::invasion::InvasionResult;
use dominion_core::queue::{QueuedEffect, TickQueue};
use dominion_core::registry::read_ron;
use dominion_core::store::{DominionStore, InvasionOutcome};
use dominion_core::units::Deployment;

use crate::error::ToolResult;
use crate::validate::GameData;

/// Everything needed to resolve one invasion.
///
/// # Example RON
///
/// ```ron
/// Scenario(
///     tick: 100,
///     round: (id: 1, start_tick: 0),
///     realms: [(id: 1, round_id: 1, name: "North"), (id: 2, round_id: 1, name: "South")],
///     attacker: (id: 1, name: "Aldor", realm_id: 1, round_id: 1, race: "human",
///         land: ((1000, 0, 0, 0, 0, 0)), military: (units: ((0, 1000, 0, 500)))),
///     defender: (id: 2, name: "Brenn", realm_id: 2, round_id: 1, race: "human",
///         land: ((800, 0, 0, 0, 0, 0)), military: (units: ((0, 267, 0, 0)))),
///     deployment: ((0, 0, 0, 100)),
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Tick the invasion happens on.
    pub tick: u64,
    /// The round.
    pub round: Round,
    /// Realms of both sides.
    pub realms: Vec<Realm>,
    /// Invader.
    pub attacker: Dominion,
    /// Target.
    pub defender: Dominion,
    /// Units sent.
    pub deployment: Deployment,
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> ToolResult<Self> {
        Ok(read_ron(path)?)
    }
}

/// What a simulated invasion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Message shown to the attacker.
    pub outcome: InvasionOutcome,
    /// Full invasion record.
    pub result: InvasionResult,
    /// Attacker after the invasion.
    pub attacker: Dominion,
    /// Defender after the invasion.
    pub defender: Dominion,
    /// Effects queued for later ticks.
    pub queued: Vec<QueuedEffect>,
}

/// Resolve a scenario through a fresh store.
///
/// # Errors
///
/// Returns an error if the invasion is rejected or aborts.
pub fn run_scenario(data: &GameData, scenario: &Scenario) -> ToolResult<SimulationReport> {
    let attacker_id = scenario.attacker.id;
    let defender_id = scenario.defender.id;

    let store = scenario.realms.iter().cloned().fold(
        DominionStore::new(data.rules.clone(), data.races.clone(), data.spells.clone())
            .with_round(scenario.round)
            .with_dominion(scenario.attacker.clone())
            .with_dominion(scenario.defender.clone()),
        DominionStore::with_realm,
    );

    let outcome = store.invade(attacker_id, defender_id, &scenario.deployment, scenario.tick)?;
    let result = store
        .event(outcome.event_id)?
        .and_then(|event| event.invasion().cloned())
        .ok_or_else(|| dominion_core::error::GameError::InvalidState("invasion event missing".to_string()))?;

    let queued = [store.queue(attacker_id)?, store.queue(defender_id)?]
        .iter()
        .flat_map(TickQueue::entries)
        .cloned()
        .collect();

    Ok(SimulationReport {
        outcome,
        result,
        attacker: store.dominion(attacker_id)?,
        defender: store.dominion(defender_id)?,
        queued,
    })
}

/// Render a report as pretty RON or JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render(report: &SimulationReport, json: bool) -> ToolResult<String> {
    if json {
        Ok(serde_json::to_string_pretty(report)?)
    } else {
        ron::ser::to_string_pretty(report, ron::ser::PrettyConfig::default()).map_err(|e| {
            dominion_core::error::GameError::InvalidState(format!("Serialization failed: {e}")).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dominion_core::store::AlertType;
    use dominion_test_utils::fixtures::{self, World};

    fn data() -> GameData {
        let world = World::new();
        GameData {
            rules: world.rules,
            races: world.races,
            spells: world.spells,
        }
    }

    fn scenario(op: u64, dp: u64) -> Scenario {
        let world = World::new();
        Scenario {
            tick: fixtures::TICK,
            round: world.round,
            realms: vec![world.attacker_realm, world.defender_realm],
            attacker: fixtures::attacker(),
            defender: fixtures::defender(dp),
            deployment: fixtures::deployment(op),
        }
    }

    #[test]
    fn test_successful_scenario() {
        let report = run_scenario(&data(), &scenario(1000, 800)).expect("run");
        assert_eq!(report.outcome.alert_type, AlertType::Success);
        assert!(report.result.is_success());
        assert!(report.outcome.message.starts_with("You are victorious"));
        assert!(!report.queued.is_empty());
    }

    #[test]
    fn test_failed_scenario_message() {
        let report = run_scenario(&data(), &scenario(500, 650)).expect("run");
        assert_eq!(report.outcome.alert_type, AlertType::Danger);
        assert_eq!(report.outcome.message, "Your army fails to defeat the forces of Dominion 2 (#2).");
    }

    #[test]
    fn test_render_json_and_ron() {
        let report = run_scenario(&data(), &scenario(1000, 800)).expect("run");
        let json = render(&report, true).expect("json");
        assert!(json.contains("\"alert_type\": \"success\""));
        let ron = render(&report, false).expect("ron");
        assert!(ron.contains("alert_type: success"));
    }

    #[test]
    fn test_rejected_scenario() {
        let mut scenario = scenario(1000, 800);
        scenario.attacker.morale = 10;
        assert!(run_scenario(&data(), &scenario).is_err());
    }
}
