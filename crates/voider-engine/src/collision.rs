//! Game rules for actor contacts.
//!
//! [`CollisionResolver`] turns begin/end contact notifications into health
//! changes, pickups and colliding-set bookkeeping. It never touches the
//! physics world directly: destruction is scheduled with
//! [`Actor::destroy_body_safe`](voider_actors::actor::Actor::destroy_body_safe)
//! and applied on the actor's next update.

use tracing::{debug, trace};
use voider_actors::prelude::{Actor, ActorId, ActorStore, GameEvent, SimContext};

use crate::physics::{ContactEvent, ContactPhase};

/// What a begin-contact resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactOutcome {
    /// One of the actors is missing or already being destroyed.
    Skipped,
    /// `destroyer` dealt `damage` to `victim` and will be removed.
    Destroyed {
        destroyer: ActorId,
        victim: ActorId,
        damage: f32,
    },
    /// The player picked up a collectible.
    Collected { player: ActorId, pickup: ActorId },
    /// Both actors now track each other for damage over time.
    Tracked,
}

/// Stateless contact rule set.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollisionResolver;

impl CollisionResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a batch of contacts from one physics step, in order.
    ///
    /// Returns the pickups collected by the batch. They are spent and the
    /// caller removes them from the run.
    pub fn resolve(
        &self,
        contacts: &[ContactEvent],
        store: &mut ActorStore,
        ctx: &mut SimContext<'_>,
    ) -> Vec<ActorId> {
        let mut collected = Vec::new();
        for contact in contacts {
            match contact.phase {
                ContactPhase::Begin => {
                    if let ContactOutcome::Collected { pickup, .. } =
                        self.begin_contact(store, contact.a, contact.b, ctx)
                    {
                        collected.push(pickup);
                    }
                }
                ContactPhase::End => self.end_contact(store, contact.a, contact.b, ctx),
            }
        }
        collected
    }

    /// Apply the begin-contact rules in priority order.
    pub fn begin_contact(
        &self,
        store: &mut ActorStore,
        a: ActorId,
        b: ActorId,
        ctx: &mut SimContext<'_>,
    ) -> ContactOutcome {
        let Some((actor_a, actor_b)) = store.pair_mut(a, b) else {
            trace!(%a, %b, "begin contact with missing actor");
            return ContactOutcome::Skipped;
        };

        if actor_a.is_pending_destroy() || actor_b.is_pending_destroy() {
            return ContactOutcome::Skipped;
        }

        if actor_a.def().destroyed_on_collide {
            return destroy_on_collide(actor_a, actor_b, ctx);
        }
        if actor_b.def().destroyed_on_collide {
            return destroy_on_collide(actor_b, actor_a, ctx);
        }

        if let Some(outcome) = pick_up(actor_a, actor_b, ctx) {
            return outcome;
        }
        if let Some(outcome) = pick_up(actor_b, actor_a, ctx) {
            return outcome;
        }

        actor_a.add_colliding_actor(b, ctx);
        actor_b.add_colliding_actor(a, ctx);
        ContactOutcome::Tracked
    }

    /// Undo the tracking done by [`begin_contact`](Self::begin_contact).
    ///
    /// Pairs handled by the destroy or pickup rules were never tracked and are
    /// ignored, as are pairs whose actors are already gone.
    pub fn end_contact(&self, store: &mut ActorStore, a: ActorId, b: ActorId, ctx: &mut SimContext<'_>) {
        let Some((actor_a, actor_b)) = store.pair_mut(a, b) else {
            trace!(%a, %b, "end contact with missing actor");
            return;
        };
        if actor_a.def().destroyed_on_collide || actor_b.def().destroyed_on_collide {
            return;
        }
        if is_pickup_pair(actor_a, actor_b) || is_pickup_pair(actor_b, actor_a) {
            return;
        }
        actor_a.remove_colliding_actor(b, ctx);
        actor_b.remove_colliding_actor(a, ctx);
    }
}

fn destroy_on_collide(destroyer: &mut Actor, victim: &mut Actor, ctx: &mut SimContext<'_>) -> ContactOutcome {
    let damage = match destroyer.kind().bullet() {
        Some(bullet) => bullet.hit_damage,
        None => destroyer.def().collision_damage,
    };
    victim.decrease_health(damage, ctx);
    destroyer.destroy_body_safe();

    if destroyer.kind().is_bullet() && victim.is_player() {
        ctx.fire(GameEvent::PlayerHitByBullet {
            player: victim.id(),
            bullet: destroyer.id(),
        });
    }
    if destroyer.kind().is_enemy() {
        ctx.fire(GameEvent::EnemyExploded {
            enemy: destroyer.id(),
        });
    }
    debug!(destroyer = %destroyer.id(), victim = %victim.id(), damage, "destroyed on collide");

    ContactOutcome::Destroyed {
        destroyer: destroyer.id(),
        victim: victim.id(),
        damage,
    }
}

fn is_pickup_pair(pickup: &Actor, player: &Actor) -> bool {
    pickup.def().collectible.is_some() && player.is_player()
}

fn pick_up(pickup: &mut Actor, player: &mut Actor, ctx: &mut SimContext<'_>) -> Option<ContactOutcome> {
    let collectible = pickup.def().collectible?;
    if !player.is_player() {
        return None;
    }
    player.add_collectible(collectible, ctx);
    pickup.destroy_body_safe();
    ctx.fire(GameEvent::CollectiblePicked {
        player: player.id(),
        pickup: pickup.id(),
        collectible,
    });
    Some(ContactOutcome::Collected {
        player: player.id(),
        pickup: pickup.id(),
    })
}
