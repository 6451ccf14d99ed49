//! Determinism testing utilities.
//!
//! Provides a harness for verifying that an invasion produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Invasion outcomes must be reproducible bit for bit so that the event
//! log can be audited and replayed. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`dominion_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Slots, land types and buildings are always walked in declaration order.
//!
//! - **Shared state**: The engine works on copies; only the store writes back.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use dominion_core::dominion::Dominion;
use dominion_core::error::InvasionError;
use dominion_core::invasion::{InvasionEngine, InvasionContext, InvasionResolution};
use dominion_core::queue::TickQueue;
use dominion_core::units::Deployment;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>) -> Self {
        Self {
            is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
            hashes,
        }
    }

    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Invasion is non-deterministic!\n\
                 Runs: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Hash of everything an invasion produced: both dominions, the record,
/// realm effects and the queued effects.
#[must_use]
pub fn resolution_hash(resolution: &InvasionResolution, queue: &TickQueue) -> u64 {
    let mut hasher = DefaultHasher::new();
    resolution.attacker.state_hash().hash(&mut hasher);
    resolution.defender.state_hash().hash(&mut hasher);
    match bincode::serialize(&resolution.result) {
        Ok(bytes) => bytes.hash(&mut hasher),
        Err(err) => err.to_string().hash(&mut hasher),
    }
    match bincode::serialize(&resolution.realm_effects) {
        Ok(bytes) => bytes.hash(&mut hasher),
        Err(err) => err.to_string().hash(&mut hasher),
    }
    queue.hash(&mut hasher);
    hasher.finish()
}

/// Resolve one invasion against a fresh queue and hash the outcome.
///
/// Errors hash too, so a run that fails the same way every time is still
/// deterministic.
#[must_use]
pub fn invasion_hash(
    engine: &InvasionEngine<'_>,
    attacker: &Dominion,
    defender: &Dominion,
    deployment: &Deployment,
    context: &InvasionContext<'_>,
) -> u64 {
    let mut queue = TickQueue::new();
    match engine.invade(attacker, defender, deployment, &mut queue, context) {
        Ok(resolution) => resolution_hash(&resolution, &queue),
        Err(err) => error_hash(&err),
    }
}

fn error_hash(err: &InvasionError) -> u64 {
    let mut hasher = DefaultHasher::new();
    err.to_string().hash(&mut hasher);
    hasher.finish()
}

/// Run the same invasion `runs` times and compare hashes.
///
/// # Example
///
/// ```ignore
/// use dominion_test_utils::determinism::verify_invasion_determinism;
/// use dominion_test_utils::fixtures::{self, World};
///
/// let world = World::new();
/// let result = verify_invasion_determinism(
///     5,
///     &world.engine(),
///     &fixtures::attacker(),
///     &fixtures::defender(800),
///     &fixtures::deployment(1000),
///     &world.context(fixtures::TICK),
/// );
/// result.assert_deterministic();
/// ```
#[must_use]
pub fn verify_invasion_determinism(
    runs: usize,
    engine: &InvasionEngine<'_>,
    attacker: &Dominion,
    defender: &Dominion,
    deployment: &Deployment,
    context: &InvasionContext<'_>,
) -> DeterminismResult {
    let hashes = (0..runs)
        .map(|_| invasion_hash(engine, attacker, defender, deployment, context))
        .collect();
    DeterminismResult::from_hashes(hashes)
}

/// Run the same invasion on `threads` scoped threads at once.
///
/// Catches anything that depends on scheduling or memory layout.
#[must_use]
pub fn verify_parallel_determinism(
    threads: usize,
    engine: &InvasionEngine<'_>,
    attacker: &Dominion,
    defender: &Dominion,
    deployment: &Deployment,
    context: &InvasionContext<'_>,
) -> DeterminismResult {
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| s.spawn(|| invasion_hash(engine, attacker, defender, deployment, context)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_default())
            .collect()
    });
    DeterminismResult::from_hashes(hashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, World};

    #[test]
    fn test_same_invasion_same_hash() {
        let world = World::new();
        let result = verify_invasion_determinism(
            4,
            &world.engine(),
            &fixtures::attacker(),
            &fixtures::defender(800),
            &fixtures::deployment(1000),
            &world.context(fixtures::TICK),
        );
        result.assert_deterministic();
        assert_eq!(result.hashes.len(), 4);
    }

    #[test]
    fn test_parallel_runs_match() {
        let world = World::new();
        let result = verify_parallel_determinism(
            4,
            &world.engine(),
            &fixtures::attacker(),
            &fixtures::defender(650),
            &fixtures::deployment(500),
            &world.context(fixtures::TICK),
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_different_deployments_differ() {
        let world = World::new();
        let engine = world.engine();
        let context = world.context(fixtures::TICK);
        let attacker = fixtures::attacker();
        let defender = fixtures::defender(800);
        let win = invasion_hash(&engine, &attacker, &defender, &fixtures::deployment(1000), &context);
        let loss = invasion_hash(&engine, &attacker, &defender, &fixtures::deployment(500), &context);
        assert_ne!(win, loss);
    }

    #[test]
    fn test_unique_hashes() {
        let result = DeterminismResult::from_hashes(vec![3, 1, 3]);
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes(), vec![1, 3]);
    }
}
