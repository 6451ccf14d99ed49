//! Transactional dominion store.
//!
//! Each dominion lives behind its own mutex together with its pending
//! queue entries. [`DominionStore::invade`] locks the attacker and the
//! defender in ascending id order, resolves the invasion on working copies
//! through a [`QueueTransaction`], and only writes anything back once the
//! whole pipeline has succeeded. Locks are always taken in the order
//! dominions, realms, events, outbox, and all of them are held before the
//! first write. Invasions between disjoint pairs only meet on the shared
//! logs.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::dominion::{Dominion, DominionId, Realm, RealmId, Round, RoundId};
use crate::error::{GameError, InvasionError, PreconditionViolation, Result};
use crate::event::{EventId, GameEvent, GameEventKind, Notification};
use crate::invasion::{InvasionContext, InvasionEngine, InvasionResult};
use crate::queue::{QueueOp, QueueTransaction, QueuedEffect, TickQueue};
use crate::registry::RaceRegistry;
use crate::rules::InvasionRules;
use crate::spells::SpellBook;
use crate::units::Deployment;

/// Alert style of an invasion summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// The invasion succeeded.
    Success,
    /// The invasion failed.
    Danger,
}

/// What the attacking player is told.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvasionOutcome {
    /// Human-readable summary.
    pub message: String,
    /// Alert style.
    pub alert_type: AlertType,
    /// Persisted invasion event.
    pub event_id: EventId,
}

#[derive(Debug)]
struct DominionRecord {
    dominion: Dominion,
    queue: TickQueue,
}

/// In-memory store of rounds, realms, dominions and their queues.
#[derive(Debug)]
pub struct DominionStore {
    rules: InvasionRules,
    races: RaceRegistry,
    spells: SpellBook,
    rounds: BTreeMap<RoundId, Round>,
    realms: BTreeMap<RealmId, Mutex<Realm>>,
    dominions: BTreeMap<DominionId, Mutex<DominionRecord>>,
    events: Mutex<Vec<GameEvent>>,
    outbox: Mutex<Vec<Notification>>,
}

impl DominionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(rules: InvasionRules, races: RaceRegistry, spells: SpellBook) -> Self {
        Self {
            rules,
            races,
            spells,
            rounds: BTreeMap::new(),
            realms: BTreeMap::new(),
            dominions: BTreeMap::new(),
            events: Mutex::new(Vec::new()),
            outbox: Mutex::new(Vec::new()),
        }
    }

    /// Builder: add a round.
    #[must_use]
    pub fn with_round(mut self, round: Round) -> Self {
        self.insert_round(round);
        self
    }

    /// Builder: add a realm.
    #[must_use]
    pub fn with_realm(mut self, realm: Realm) -> Self {
        self.insert_realm(realm);
        self
    }

    /// Builder: add a dominion.
    #[must_use]
    pub fn with_dominion(mut self, dominion: Dominion) -> Self {
        self.insert_dominion(dominion);
        self
    }

    /// Add or replace a round.
    pub fn insert_round(&mut self, round: Round) {
        self.rounds.insert(round.id, round);
    }

    /// Add or replace a realm.
    pub fn insert_realm(&mut self, realm: Realm) {
        self.realms.insert(realm.id, Mutex::new(realm));
    }

    /// Add or replace a dominion with an empty queue.
    pub fn insert_dominion(&mut self, dominion: Dominion) {
        self.dominions.insert(
            dominion.id,
            Mutex::new(DominionRecord {
                dominion,
                queue: TickQueue::new(),
            }),
        );
    }

    /// Rules in use.
    #[must_use]
    pub const fn rules(&self) -> &InvasionRules {
        &self.rules
    }

    /// Engine over this store's data.
    #[must_use]
    pub const fn engine(&self) -> InvasionEngine<'_> {
        InvasionEngine::new(&self.rules, &self.races, &self.spells)
    }

    /// Snapshot of a dominion.
    pub fn dominion(&self, id: DominionId) -> Result<Dominion> {
        Ok(lock(self.record(id)?)?.dominion.clone())
    }

    /// Snapshot of a dominion's pending queue.
    pub fn queue(&self, id: DominionId) -> Result<TickQueue> {
        Ok(lock(self.record(id)?)?.queue.clone())
    }

    /// Snapshot of a realm.
    pub fn realm(&self, id: RealmId) -> Result<Realm> {
        let cell = self.realms.get(&id).ok_or(GameError::RealmNotFound(id))?;
        Ok(lock(cell)?.clone())
    }

    /// Copy of every persisted event.
    pub fn events(&self) -> Result<Vec<GameEvent>> {
        Ok(lock(&self.events)?.clone())
    }

    /// Look up one event.
    pub fn event(&self, id: EventId) -> Result<Option<GameEvent>> {
        Ok(lock(&self.events)?.iter().find(|e| e.id == id).cloned())
    }

    /// Drain the notification outbox.
    pub fn take_notifications(&self) -> Result<Vec<Notification>> {
        Ok(std::mem::take(&mut *lock(&self.outbox)?))
    }

    /// Advance every dominion's queue by one tick and apply arrivals.
    pub fn advance_tick(&self) -> Result<Vec<QueuedEffect>> {
        let mut arrived = Vec::new();
        for cell in self.dominions.values() {
            let mut record = lock(cell)?;
            let DominionRecord { dominion, queue } = &mut *record;
            for effect in queue.advance() {
                effect.apply_to(dominion);
                arrived.push(effect);
            }
        }
        Ok(arrived)
    }

    /// Invade `defender` with `deployment` at `tick`.
    ///
    /// All-or-nothing: on any error neither dominion, their queues, the
    /// realms, the event log nor the outbox change.
    pub fn invade(
        &self,
        attacker_id: DominionId,
        defender_id: DominionId,
        deployment: &Deployment,
        tick: u64,
    ) -> std::result::Result<InvasionOutcome, InvasionError> {
        if attacker_id == defender_id {
            return Err(PreconditionViolation::SelfInvasion.into());
        }
        let attacker_cell = self.record(attacker_id)?;
        let defender_cell = self.record(defender_id)?;

        let (mut attacker, mut defender) = if attacker_id < defender_id {
            let first = lock(attacker_cell)?;
            let second = lock(defender_cell)?;
            (first, second)
        } else {
            let first = lock(defender_cell)?;
            let second = lock(attacker_cell)?;
            (second, first)
        };

        let round = *self
            .rounds
            .get(&attacker.dominion.round_id)
            .ok_or_else(|| InvasionError::invariant(format!("round {} not found", attacker.dominion.round_id)))?;
        let attacker_realm = self.realm(attacker.dominion.realm_id)?;
        let defender_realm = self.realm(defender.dominion.realm_id)?;
        let context = InvasionContext::new(tick, &round, &attacker_realm);

        let mut transaction = QueueTransaction::new()
            .with_base(attacker_id, &attacker.queue)
            .with_base(defender_id, &defender.queue);
        let resolution = self.engine().invade(
            &attacker.dominion,
            &defender.dominion,
            deployment,
            &mut transaction,
            &context,
        )?;
        let ops = transaction.into_ops();

        // Take every remaining lock before the first write.
        let mut realms = Vec::new();
        for realm_id in resolution.realm_effects.realms() {
            let cell = self.realms.get(&realm_id).ok_or(GameError::RealmNotFound(realm_id))?;
            realms.push(lock(cell)?);
        }
        let mut events = lock(&self.events)?;
        let mut outbox = lock(&self.outbox)?;

        let event_id = events.last().map_or(1, |e| e.id + 1);
        events.push(GameEvent {
            id: event_id,
            round_id: round.id,
            source: attacker_id,
            target: defender_id,
            tick,
            kind: GameEventKind::Invasion(resolution.result.clone()),
        });

        let (own, theirs): (Vec<QueueOp>, Vec<QueueOp>) = ops.into_iter().partition(|op| op.dominion() == attacker_id);
        attacker.queue.apply_ops(&own);
        defender.queue.apply_ops(&theirs);
        attacker.dominion = resolution.attacker;
        defender.dominion = resolution.defender;

        for realm in &mut realms {
            resolution.realm_effects.apply_to(realm);
        }
        outbox.push(Notification::for_invasion(event_id, &resolution.result));

        tracing::info!(event_id, attacker = attacker_id, defender = defender_id, "Invasion committed");
        Ok(summarize(&resolution.result, &defender.dominion.name, defender_realm.id, event_id))
    }

    fn record(&self, id: DominionId) -> Result<&Mutex<DominionRecord>> {
        self.dominions.get(&id).ok_or(GameError::DominionNotFound(id))
    }
}

fn lock<T>(cell: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    cell.lock()
        .map_err(|_| GameError::InvalidState("store lock poisoned".to_string()))
}

fn summarize(result: &InvasionResult, target: &str, realm: RealmId, event_id: EventId) -> InvasionOutcome {
    if result.is_success() {
        InvasionOutcome {
            message: format!(
                "You are victorious and defeat the forces of {target} (#{realm}), conquering {} new acres of land! \
                 During the invasion, your troops also discovered {} acres of land.",
                group_thousands(result.land_conquered()),
                group_thousands(result.land_discovered()),
            ),
            alert_type: AlertType::Success,
            event_id,
        }
    } else {
        InvasionOutcome {
            message: format!("Your army fails to defeat the forces of {target} (#{realm})."),
            alert_type: AlertType::Danger,
            event_id,
        }
    }
}

/// `1234567` -> `1,234,567`.
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RaceData, UnitData};
    use crate::factions::Alignment;
    use crate::land::{LandHoldings, LandType};
    use crate::math::Fixed;
    use crate::perks::PerkSet;
    use crate::units::{UnitCounts, UnitSlot};

    fn race() -> RaceData {
        let unit = |slot, op: i32, dp: i32| {
            UnitData::new(slot, format!("Unit {slot}"), Fixed::from_num(op), Fixed::from_num(dp)).without_boats()
        };
        RaceData {
            key: "human".to_string(),
            name: "Human".to_string(),
            alignment: Alignment::Good,
            home_land_type: LandType::Plain,
            boat_capacity: 30,
            construction_materials: Vec::new(),
            capabilities: Vec::new(),
            perks: PerkSet::new(),
            units: vec![
                unit(UnitSlot::One, 1, 1),
                unit(UnitSlot::Two, 0, 5),
                unit(UnitSlot::Three, 0, 8),
                unit(UnitSlot::Four, 10, 2),
            ],
        }
    }

    fn dominion(id: DominionId, realm: RealmId, acres: u64, units: UnitCounts) -> Dominion {
        let mut dominion = Dominion::new(id, format!("Dominion {id}"), realm, 1, "human");
        dominion.land = LandHoldings::new().with(LandType::Plain, acres);
        dominion.military.units = units;
        dominion
    }

    fn store() -> DominionStore {
        DominionStore::new(InvasionRules::default(), RaceRegistry::new().with(race()), SpellBook::new())
            .with_round(Round::new(1, 0))
            .with_realm(Realm::new(1, 1, "Attackers"))
            .with_realm(Realm::new(2, 1, "Defenders"))
            .with_dominion(dominion(1, 1, 1000, UnitCounts([0, 1000, 0, 200])))
            .with_dominion(dominion(2, 2, 800, UnitCounts([0, 100, 0, 0])))
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_self_invasion_rejected_before_locking() {
        let store = DominionStore::new(InvasionRules::default(), RaceRegistry::new(), SpellBook::new());
        let err = store
            .invade(1, 1, &Deployment::default(), 10)
            .expect_err("self invasion");
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_unknown_dominion_is_invariant() {
        let store = DominionStore::new(InvasionRules::default(), RaceRegistry::new(), SpellBook::new());
        let err = store
            .invade(1, 2, &Deployment::default(), 10)
            .expect_err("missing dominions");
        assert!(!err.is_user_facing());
    }

    #[test]
    fn test_invasion_commits_everything() {
        let store = store();
        let outcome = store
            .invade(1, 2, &Deployment::from_pairs(&[(UnitSlot::Four, 100)]), 10)
            .expect("invasion resolves");
        assert_eq!(store.events().expect("events").len(), 1);
        assert_eq!(store.take_notifications().expect("outbox").len(), 1);
        assert_eq!(outcome.event_id, 1);
        assert!(!store.queue(1).expect("queue").is_empty());
    }

    #[test]
    fn test_unavailable_outbox_leaves_nothing_behind() {
        let store = store();
        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outbox = store.outbox.lock();
            panic!("outbox writer crashed");
        }));
        assert!(poisoned.is_err());

        let before = (
            store.dominion(1).expect("attacker"),
            store.dominion(2).expect("defender"),
            store.realm(1).expect("realm"),
            store.realm(2).expect("realm"),
        );
        let err = store
            .invade(1, 2, &Deployment::from_pairs(&[(UnitSlot::Four, 100)]), 10)
            .expect_err("outbox is poisoned");
        assert!(!err.is_user_facing());

        assert!(store.events().expect("events").is_empty());
        assert!(store.queue(1).expect("queue").is_empty());
        assert!(store.queue(2).expect("queue").is_empty());
        let after = (
            store.dominion(1).expect("attacker"),
            store.dominion(2).expect("defender"),
            store.realm(1).expect("realm"),
            store.realm(2).expect("realm"),
        );
        assert_eq!(after, before);
    }
}
