//! # Dominion Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Determinism test harness
//! - Fixture world (races, spells, dominions, store)
//! - Outcome sweeps for balance checks
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod determinism;
pub mod fixtures;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
