//! Persisted game events and player notifications.

use serde::{Deserialize, Serialize};

use crate::dominion::{DominionId, RoundId};
use crate::invasion::InvasionResult;

/// Event identifier, unique within a store.
pub type EventId = u64;

/// What an event records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventKind {
    /// A resolved invasion.
    Invasion(InvasionResult),
}

/// Audit record of an action between two dominions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Event id.
    pub id: EventId,
    /// Round the event belongs to.
    pub round_id: RoundId,
    /// Acting dominion.
    pub source: DominionId,
    /// Targeted dominion.
    pub target: DominionId,
    /// Tick of the event.
    pub tick: u64,
    /// Payload.
    pub kind: GameEventKind,
}

impl GameEvent {
    /// The invasion record, if this is an invasion.
    #[must_use]
    pub const fn invasion(&self) -> Option<&InvasionResult> {
        match &self.kind {
            GameEventKind::Invasion(result) => Some(result),
        }
    }
}

/// Notification queued for the defender of an invasion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// The defender lost land.
    ReceivedInvasion {
        /// Notified dominion.
        dominion: DominionId,
        /// Event to link to.
        event_id: EventId,
        /// Invading dominion.
        attacker: DominionId,
        /// Acres lost.
        land_lost: u64,
        /// Units and draftees lost.
        units_lost: u64,
    },
    /// The defender held.
    RepelledInvasion {
        /// Notified dominion.
        dominion: DominionId,
        /// Event to link to.
        event_id: EventId,
        /// Invading dominion.
        attacker: DominionId,
        /// Whether the invader was overwhelmed.
        attacker_overwhelmed: bool,
        /// Units and draftees lost.
        units_lost: u64,
    },
}

impl Notification {
    /// Build the defender's notification for an invasion event.
    #[must_use]
    pub fn for_invasion(event_id: EventId, result: &InvasionResult) -> Self {
        let dominion = result.defender().dominion;
        let attacker = result.attacker().dominion;
        let units_lost = result.defender_casualties();
        if result.is_success() {
            Self::ReceivedInvasion {
                dominion,
                event_id,
                attacker,
                land_lost: result.defender().land_lost.total(),
                units_lost,
            }
        } else {
            Self::RepelledInvasion {
                dominion,
                event_id,
                attacker,
                attacker_overwhelmed: result.outcome().overwhelmed,
                units_lost,
            }
        }
    }

    /// Dominion the notification is addressed to.
    #[must_use]
    pub const fn dominion(&self) -> DominionId {
        match self {
            Self::ReceivedInvasion { dominion, .. } | Self::RepelledInvasion { dominion, .. } => *dominion,
        }
    }
}
