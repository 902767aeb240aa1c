//! Game events and the per-subscriber event bus.
//!
//! Actors and the collision resolver fire [`GameEvent`]s into an [`EventBus`].
//! Each subscriber owns a FIFO mailbox and only receives the [`EventKind`]s it
//! subscribed to. Delivery is synchronous (the event is in the mailbox before
//! `fire` returns) and ordered: mailboxes are filled in subscription order and
//! each mailbox preserves firing order.
//!
//! Events carry plain data. Consumers must not need a reference to the firing
//! actor, which keeps the bus free of shared-ownership cycles.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::definition::Collectible;
use crate::id::ActorId;

// ---------------------------------------------------------------------------
// GameEvent
// ---------------------------------------------------------------------------

/// Something observable that happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An actor's health changed by more than the float epsilon.
    HealthChanged {
        actor: ActorId,
        is_player: bool,
        old_health: f32,
        new_health: f32,
        /// Game time at which the change happened.
        time: f32,
    },
    /// The player's health crossed to zero or below.
    ShipLost { actor: ActorId, time: f32 },
    /// An enemy bullet hit the player.
    PlayerHitByBullet { player: ActorId, bullet: ActorId },
    /// An enemy destroyed itself by colliding.
    EnemyExploded { enemy: ActorId },
    /// The player started touching another actor.
    PlayerCollisionBegin { player: ActorId, other: ActorId },
    /// The player stopped touching another actor.
    PlayerCollisionEnd { player: ActorId, other: ActorId },
    /// The player picked up a collectible.
    CollectiblePicked {
        player: ActorId,
        pickup: ActorId,
        collectible: Collectible,
    },
}

impl GameEvent {
    /// The discriminant used for subscription filtering.
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::HealthChanged { .. } => EventKind::HealthChanged,
            GameEvent::ShipLost { .. } => EventKind::ShipLost,
            GameEvent::PlayerHitByBullet { .. } => EventKind::PlayerHitByBullet,
            GameEvent::EnemyExploded { .. } => EventKind::EnemyExploded,
            GameEvent::PlayerCollisionBegin { .. } => EventKind::PlayerCollisionBegin,
            GameEvent::PlayerCollisionEnd { .. } => EventKind::PlayerCollisionEnd,
            GameEvent::CollectiblePicked { .. } => EventKind::CollectiblePicked,
        }
    }
}

/// Fieldless mirror of [`GameEvent`] used to filter subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    HealthChanged,
    ShipLost,
    PlayerHitByBullet,
    EnemyExploded,
    PlayerCollisionBegin,
    PlayerCollisionEnd,
    CollectiblePicked,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::HealthChanged,
        EventKind::ShipLost,
        EventKind::PlayerHitByBullet,
        EventKind::EnemyExploded,
        EventKind::PlayerCollisionBegin,
        EventKind::PlayerCollisionEnd,
        EventKind::CollectiblePicked,
    ];
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u32);

struct Mailbox {
    id: SubscriptionId,
    kinds: Vec<EventKind>,
    pending: Vec<GameEvent>,
}

/// Fan-out of game events to subscriber mailboxes.
#[derive(Default)]
pub struct EventBus {
    mailboxes: Vec<Mailbox>,
    next_id: u32,
    fired_total: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for the given event kinds.
    pub fn subscribe(&mut self, kinds: &[EventKind]) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.mailboxes.push(Mailbox {
            id,
            kinds: kinds.to_vec(),
            pending: Vec::new(),
        });
        id
    }

    /// Remove a subscriber and drop its undelivered events. Returns `false`
    /// if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.mailboxes.len();
        self.mailboxes.retain(|m| m.id != id);
        before != self.mailboxes.len()
    }

    /// Deliver an event to every interested mailbox.
    pub fn fire(&mut self, event: GameEvent) {
        self.fired_total += 1;
        let kind = event.kind();
        for mailbox in self.mailboxes.iter_mut().filter(|m| m.kinds.contains(&kind)) {
            mailbox.pending.push(event.clone());
        }
    }

    /// Take every pending event of one subscriber, in firing order.
    pub fn drain(&mut self, id: SubscriptionId) -> Vec<GameEvent> {
        match self.mailboxes.iter_mut().find(|m| m.id == id) {
            Some(mailbox) => std::mem::take(&mut mailbox.pending),
            None => {
                warn!(?id, "drain on unknown event subscription");
                Vec::new()
            }
        }
    }

    /// Number of events waiting for one subscriber.
    pub fn pending(&self, id: SubscriptionId) -> usize {
        self.mailboxes
            .iter()
            .find(|m| m.id == id)
            .map_or(0, |m| m.pending.len())
    }

    pub fn subscriber_count(&self) -> usize {
        self.mailboxes.len()
    }

    /// Total events fired since creation, delivered or not.
    pub fn fired_total(&self) -> u64 {
        self.fired_total
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.mailboxes.len())
            .field("fired_total", &self.fired_total)
            .finish()
    }
}
