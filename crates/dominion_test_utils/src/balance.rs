//! Balance testing utilities.
//!
//! Sweeps a range of attacking forces against a fixed defense and tallies
//! how each invasion is classified, so rule changes can be checked for
//! their effect on outcomes rather than on single numbers.

use dominion_core::dominion::Dominion;
use dominion_core::invasion::{InvasionClass, InvasionContext, InvasionEngine, InvasionResult};
use dominion_core::queue::TickQueue;
use dominion_core::units::Deployment;

/// Outcome counts over a set of invasions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    /// Invasions resolved.
    pub total: u32,
    /// Invasions rejected by validation.
    pub rejected: u32,
    /// Successful hits in victory range.
    pub victories: u32,
    /// Successful hits below victory range.
    pub bottomfeeds: u32,
    /// Failures that were not overwhelmed.
    pub razes: u32,
    /// Overwhelmed failures.
    pub failures: u32,
    /// Acres conquered over all invasions.
    pub land_conquered: u64,
    /// Attacker units lost over all invasions.
    pub attacker_casualties: u64,
    /// Defender units and draftees lost over all invasions.
    pub defender_casualties: u64,
}

impl OutcomeTally {
    /// Count one resolved invasion.
    pub fn record(&mut self, result: &InvasionResult) {
        self.total += 1;
        match result.outcome().class {
            InvasionClass::Victory => self.victories += 1,
            InvasionClass::Bottomfeed => self.bottomfeeds += 1,
            InvasionClass::Raze => self.razes += 1,
            InvasionClass::Failure => self.failures += 1,
        }
        self.land_conquered += result.land_conquered();
        self.attacker_casualties += result.attacker().units_lost.total();
        self.defender_casualties += result.defender_casualties();
    }

    /// Share of resolved invasions that succeeded (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.victories + self.bottomfeeds) / f64::from(self.total)
    }

    /// Average acres per successful invasion.
    pub fn average_land_per_success(&self) -> f64 {
        let successes = self.victories + self.bottomfeeds;
        if successes == 0 {
            return 0.0;
        }
        self.land_conquered as f64 / f64::from(successes)
    }
}

/// Resolve each deployment against the same defender and tally outcomes.
///
/// Every invasion starts from the same states; nothing carries over.
pub fn sweep(
    engine: &InvasionEngine<'_>,
    attacker: &Dominion,
    defender: &Dominion,
    deployments: impl IntoIterator<Item = Deployment>,
    context: &InvasionContext<'_>,
) -> OutcomeTally {
    let mut tally = OutcomeTally::default();
    for deployment in deployments {
        let mut queue = TickQueue::new();
        match engine.invade(attacker, defender, &deployment, &mut queue, context) {
            Ok(resolution) => tally.record(&resolution.result),
            Err(err) => {
                tracing::debug!(error = %err, "Sweep invasion rejected");
                tally.rejected += 1;
            }
        }
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, World};

    #[test]
    fn test_sweep_crosses_from_failure_to_victory() {
        let world = World::new();
        let deployments = [400, 700, 800, 810, 1000].map(fixtures::deployment);
        let tally = sweep(
            &world.engine(),
            &fixtures::attacker(),
            &fixtures::defender(800),
            deployments,
            &world.context(fixtures::TICK),
        );

        assert_eq!(tally.total, 5);
        assert_eq!(tally.rejected, 0);
        // 400 falls 50% short; 700 and the tied 800 stay within 15%.
        assert_eq!(tally.failures, 1);
        assert_eq!(tally.razes, 2);
        assert_eq!(tally.victories, 2);
        assert!(tally.land_conquered > 0);
        assert!((tally.success_rate() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_empty_tally() {
        let tally = OutcomeTally::default();
        assert!(tally.success_rate().abs() < f64::EPSILON);
        assert!(tally.average_land_per_success().abs() < f64::EPSILON);
    }
}
