//! Delayed effects queue.
//!
//! Effects (returning units, incoming land, queued resources) are scheduled
//! with a tick delay and applied exactly once when their delay runs out.
//! [`QueueService`] is the interface the invasion engine writes through;
//! [`TickQueue`] is the in-memory implementation and [`QueueTransaction`]
//! buffers writes against one or more queues so that nothing becomes
//! visible unless the surrounding transaction commits.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dominion::{Dominion, DominionId};
use crate::land::{BuildingType, LandType};
use crate::resources::Resource;
use crate::units::UnitSlot;

/// Delay used when a caller does not pick one.
pub const DEFAULT_QUEUE_TICKS: u32 = 12;

/// Queue channel; each subsystem schedules on its own channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueChannel {
    /// Returning armies and conquered land.
    Invasion,
    /// Units in training.
    Training,
    /// Buildings under construction.
    Construction,
    /// Land being explored.
    Exploration,
}

impl fmt::Display for QueueChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Invasion => "invasion",
            Self::Training => "training",
            Self::Construction => "construction",
            Self::Exploration => "exploration",
        })
    }
}

/// Dominion field a queued delta is added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueueResource {
    /// Units of a slot.
    Unit(UnitSlot),
    /// Draftees.
    Draftees,
    /// Acres of a land type.
    Land(LandType),
    /// Buildings of a type.
    Building(BuildingType),
    /// A stockpiled resource.
    Resource(Resource),
    /// Prestige.
    Prestige,
}

impl fmt::Display for QueueResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit(slot) => write!(f, "military_unit{slot}"),
            Self::Draftees => f.write_str("military_draftees"),
            Self::Land(land) => write!(f, "land_{land}"),
            Self::Building(building) => write!(f, "building_{building}"),
            Self::Resource(resource) => write!(f, "resource_{resource}"),
            Self::Prestige => f.write_str("prestige"),
        }
    }
}

/// One scheduled delta.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueuedEffect {
    /// Channel it was scheduled on.
    pub channel: QueueChannel,
    /// Dominion it applies to.
    pub dominion: DominionId,
    /// Field it changes.
    pub resource: QueueResource,
    /// Signed amount added on arrival.
    pub amount: i64,
    /// Ticks until arrival.
    pub ticks_remaining: u32,
}

impl QueuedEffect {
    fn matches(&self, channel: QueueChannel, dominion: DominionId, resource: QueueResource) -> bool {
        self.channel == channel && self.dominion == dominion && self.resource == resource
    }

    /// Add this effect to a dominion.
    pub fn apply_to(&self, dominion: &mut Dominion) {
        let add = |value: u64| -> u64 {
            if self.amount >= 0 {
                value.saturating_add(self.amount.unsigned_abs())
            } else {
                value.saturating_sub(self.amount.unsigned_abs())
            }
        };
        match self.resource {
            QueueResource::Unit(slot) => {
                dominion.military.units[slot] = add(dominion.military.units[slot]);
            }
            QueueResource::Draftees => dominion.military.draftees = add(dominion.military.draftees),
            QueueResource::Land(land) => dominion.land[land] = add(dominion.land[land]),
            QueueResource::Building(building) => {
                let current = dominion.buildings.get(building);
                dominion.buildings.set(building, add(current));
            }
            QueueResource::Resource(resource) => {
                dominion.resources.apply_delta(resource, self.amount);
            }
            QueueResource::Prestige => dominion.prestige = dominion.prestige.saturating_add(self.amount),
        }
    }
}

/// Interface to the delayed effects queue.
pub trait QueueService {
    /// Schedule additive deltas for a dominion after `delay` ticks.
    ///
    /// Zero deltas are ignored.
    fn queue_resources(
        &mut self,
        channel: QueueChannel,
        dominion: DominionId,
        deltas: &[(QueueResource, i64)],
        delay: u32,
    );

    /// Remove up to `amount` from pending entries; returns what was removed.
    fn dequeue_resource(
        &mut self,
        channel: QueueChannel,
        dominion: DominionId,
        resource: QueueResource,
        amount: u64,
    ) -> u64;

    /// Sum of pending amounts for a resource.
    fn queue_total_by_resource(
        &self,
        channel: QueueChannel,
        dominion: DominionId,
        resource: QueueResource,
    ) -> i64;

    /// Schedule deltas with the default delay.
    fn queue_default(
        &mut self,
        channel: QueueChannel,
        dominion: DominionId,
        deltas: &[(QueueResource, i64)],
    ) {
        self.queue_resources(channel, dominion, deltas, DEFAULT_QUEUE_TICKS);
    }
}

/// Remove up to `amount` from matching entries, latest arrivals first.
fn drain_entries(
    entries: &mut Vec<QueuedEffect>,
    channel: QueueChannel,
    dominion: DominionId,
    resource: QueueResource,
    amount: u64,
) -> u64 {
    let mut remaining = amount;
    let mut order: Vec<usize> = (0..entries.len())
        .filter(|&i| entries[i].matches(channel, dominion, resource) && entries[i].amount > 0)
        .collect();
    order.sort_by_key(|&i| std::cmp::Reverse((entries[i].ticks_remaining, i)));

    for i in order {
        if remaining == 0 {
            break;
        }
        let available = entries[i].amount.unsigned_abs();
        let taken = available.min(remaining);
        entries[i].amount -= taken as i64;
        remaining -= taken;
    }
    entries.retain(|e| e.amount != 0);
    amount - remaining
}

/// In-memory delayed effects queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TickQueue {
    entries: Vec<QueuedEffect>,
}

impl TickQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Pending entries in scheduling order.
    pub fn entries(&self) -> impl Iterator<Item = &QueuedEffect> {
        self.entries.iter()
    }

    /// Pending entries for one dominion.
    pub fn entries_for(&self, dominion: DominionId) -> impl Iterator<Item = &QueuedEffect> {
        self.entries.iter().filter(move |e| e.dominion == dominion)
    }

    /// Advance one tick and remove the entries that arrived.
    ///
    /// Each entry is returned exactly once.
    pub fn advance(&mut self) -> Vec<QueuedEffect> {
        for entry in &mut self.entries {
            entry.ticks_remaining = entry.ticks_remaining.saturating_sub(1);
        }
        let (due, pending): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|e| e.ticks_remaining == 0);
        self.entries = pending;
        due
    }

    /// Advance one tick and apply arrivals for `dominion`.
    ///
    /// Arrivals for other dominions are returned untouched.
    pub fn advance_into(&mut self, dominion: &mut Dominion) -> Vec<QueuedEffect> {
        let mut others = Vec::new();
        for effect in self.advance() {
            if effect.dominion == dominion.id {
                effect.apply_to(dominion);
            } else {
                others.push(effect);
            }
        }
        others
    }

    /// Apply committed operations.
    pub fn apply_ops<'a>(&mut self, ops: impl IntoIterator<Item = &'a QueueOp>) {
        for op in ops {
            match op {
                QueueOp::Dequeue {
                    channel,
                    dominion,
                    resource,
                    amount,
                } => {
                    drain_entries(&mut self.entries, *channel, *dominion, *resource, *amount);
                }
                QueueOp::Enqueue(effect) => self.entries.push(effect.clone()),
            }
        }
    }
}

impl QueueService for TickQueue {
    fn queue_resources(
        &mut self,
        channel: QueueChannel,
        dominion: DominionId,
        deltas: &[(QueueResource, i64)],
        delay: u32,
    ) {
        for &(resource, amount) in deltas {
            if amount == 0 {
                continue;
            }
            self.entries.push(QueuedEffect {
                channel,
                dominion,
                resource,
                amount,
                ticks_remaining: delay,
            });
        }
    }

    fn dequeue_resource(
        &mut self,
        channel: QueueChannel,
        dominion: DominionId,
        resource: QueueResource,
        amount: u64,
    ) -> u64 {
        drain_entries(&mut self.entries, channel, dominion, resource, amount)
    }

    fn queue_total_by_resource(
        &self,
        channel: QueueChannel,
        dominion: DominionId,
        resource: QueueResource,
    ) -> i64 {
        self.entries
            .iter()
            .filter(|e| e.matches(channel, dominion, resource))
            .map(|e| e.amount)
            .sum()
    }
}

/// A buffered queue write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueOp {
    /// Remove from pending entries.
    Dequeue {
        /// Channel.
        channel: QueueChannel,
        /// Dominion.
        dominion: DominionId,
        /// Field.
        resource: QueueResource,
        /// Amount removed.
        amount: u64,
    },
    /// Schedule a new entry.
    Enqueue(QueuedEffect),
}

impl QueueOp {
    /// Dominion the operation touches.
    #[must_use]
    pub const fn dominion(&self) -> DominionId {
        match self {
            Self::Dequeue { dominion, .. } => *dominion,
            Self::Enqueue(effect) => effect.dominion,
        }
    }
}

/// Transactional overlay over committed queues.
///
/// Reads see committed entries plus this transaction's writes. Nothing
/// reaches the committed queues until [`QueueTransaction::into_ops`] is
/// applied by the caller.
#[derive(Debug, Default)]
pub struct QueueTransaction<'q> {
    bases: BTreeMap<DominionId, &'q TickQueue>,
    pending: Vec<QueuedEffect>,
    dequeued: Vec<QueueOp>,
}

impl<'q> QueueTransaction<'q> {
    /// Create an overlay with no committed state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: expose a dominion's committed queue to reads.
    #[must_use]
    pub fn with_base(mut self, dominion: DominionId, queue: &'q TickQueue) -> Self {
        self.bases.insert(dominion, queue);
        self
    }

    fn base_total(&self, channel: QueueChannel, dominion: DominionId, resource: QueueResource) -> i64 {
        let committed = self
            .bases
            .get(&dominion)
            .map_or(0, |q| q.queue_total_by_resource(channel, dominion, resource));
        let removed: u64 = self
            .dequeued
            .iter()
            .filter_map(|op| match op {
                QueueOp::Dequeue {
                    channel: c,
                    dominion: d,
                    resource: r,
                    amount,
                } if *c == channel && *d == dominion && *r == resource => Some(*amount),
                _ => None,
            })
            .sum();
        committed - removed as i64
    }

    /// Buffered operations, dequeues first, in the order they were made.
    #[must_use]
    pub fn into_ops(self) -> Vec<QueueOp> {
        let mut ops = self.dequeued;
        ops.extend(self.pending.into_iter().map(QueueOp::Enqueue));
        ops
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.dequeued.is_empty()
    }
}

impl QueueService for QueueTransaction<'_> {
    fn queue_resources(
        &mut self,
        channel: QueueChannel,
        dominion: DominionId,
        deltas: &[(QueueResource, i64)],
        delay: u32,
    ) {
        for &(resource, amount) in deltas {
            if amount == 0 {
                continue;
            }
            self.pending.push(QueuedEffect {
                channel,
                dominion,
                resource,
                amount,
                ticks_remaining: delay,
            });
        }
    }

    fn dequeue_resource(
        &mut self,
        channel: QueueChannel,
        dominion: DominionId,
        resource: QueueResource,
        amount: u64,
    ) -> u64 {
        let from_pending = drain_entries(&mut self.pending, channel, dominion, resource, amount);
        let committed = u64::try_from(self.base_total(channel, dominion, resource)).unwrap_or(0);
        let from_base = (amount - from_pending).min(committed);
        if from_base > 0 {
            self.dequeued.push(QueueOp::Dequeue {
                channel,
                dominion,
                resource,
                amount: from_base,
            });
        }
        from_pending + from_base
    }

    fn queue_total_by_resource(
        &self,
        channel: QueueChannel,
        dominion: DominionId,
        resource: QueueResource,
    ) -> i64 {
        let pending: i64 = self
            .pending
            .iter()
            .filter(|e| e.matches(channel, dominion, resource))
            .map(|e| e.amount)
            .sum();
        self.base_total(channel, dominion, resource) + pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOATS: QueueResource = QueueResource::Resource(Resource::Boats);

    #[test]
    fn test_entries_arrive_exactly_once() {
        let mut queue = TickQueue::new();
        queue.queue_resources(
            QueueChannel::Invasion,
            1,
            &[(QueueResource::Unit(UnitSlot::One), 50)],
            2,
        );

        assert!(queue.advance().is_empty());
        let arrived = queue.advance();
        assert_eq!(arrived.len(), 1);
        assert_eq!(arrived[0].amount, 50);
        assert!(queue.advance().is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_zero_deltas_are_skipped() {
        let mut queue = TickQueue::new();
        queue.queue_default(QueueChannel::Invasion, 1, &[(BOATS, 0)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_advance_into_applies_to_dominion() {
        let mut dominion = Dominion::new(1, "Home", 1, 1, "human");
        let mut queue = TickQueue::new();
        queue.queue_resources(
            QueueChannel::Invasion,
            1,
            &[(QueueResource::Land(LandType::Plain), 20), (QueueResource::Prestige, -5)],
            1,
        );
        queue.queue_resources(QueueChannel::Invasion, 2, &[(BOATS, 3)], 1);

        let others = queue.advance_into(&mut dominion);
        assert_eq!(dominion.land[LandType::Plain], 20);
        assert_eq!(dominion.prestige, 245);
        assert_eq!(others.len(), 1);
    }

    #[test]
    fn test_dequeue_takes_latest_arrivals_first() {
        let mut queue = TickQueue::new();
        queue.queue_resources(QueueChannel::Invasion, 1, &[(BOATS, 10)], 3);
        queue.queue_resources(QueueChannel::Invasion, 1, &[(BOATS, 10)], 9);

        assert_eq!(queue.dequeue_resource(QueueChannel::Invasion, 1, BOATS, 15), 15);
        let remaining: Vec<_> = queue.entries().collect();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].ticks_remaining, 3);
        assert_eq!(remaining[0].amount, 5);
    }

    #[test]
    fn test_dequeue_is_capped() {
        let mut queue = TickQueue::new();
        queue.queue_default(QueueChannel::Invasion, 1, &[(BOATS, 4)]);
        assert_eq!(queue.dequeue_resource(QueueChannel::Invasion, 1, BOATS, 10), 4);
        assert_eq!(queue.queue_total_by_resource(QueueChannel::Invasion, 1, BOATS), 0);
    }

    #[test]
    fn test_transaction_is_invisible_until_applied() {
        let mut committed = TickQueue::new();
        committed.queue_default(QueueChannel::Invasion, 1, &[(BOATS, 8)]);
        let snapshot = committed.clone();

        let ops = {
            let mut tx = QueueTransaction::new().with_base(1, &committed);
            assert_eq!(tx.queue_total_by_resource(QueueChannel::Invasion, 1, BOATS), 8);
            assert_eq!(tx.dequeue_resource(QueueChannel::Invasion, 1, BOATS, 3), 3);
            tx.queue_default(QueueChannel::Invasion, 1, &[(BOATS, 2)]);
            assert_eq!(tx.queue_total_by_resource(QueueChannel::Invasion, 1, BOATS), 7);
            tx.into_ops()
        };
        assert_eq!(committed, snapshot);

        committed.apply_ops(&ops);
        assert_eq!(
            committed.queue_total_by_resource(QueueChannel::Invasion, 1, BOATS),
            7
        );
    }

    #[test]
    fn test_dropped_transaction_leaves_no_trace() {
        let committed = TickQueue::new();
        {
            let mut tx = QueueTransaction::new().with_base(1, &committed);
            tx.queue_default(QueueChannel::Training, 1, &[(QueueResource::Draftees, 100)]);
            assert!(!tx.is_empty());
        }
        assert!(committed.is_empty());
    }
}
