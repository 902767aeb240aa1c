//! Generational arena of actors.
//!
//! The store is the only owner of [`Actor`]s; everything else refers to them
//! by [`ActorId`]. Each slot keeps its own generation, bumped when its actor
//! is removed, and vacated slots are handed out again oldest first so a slot
//! churned by short-lived bullets does not run through its generations.
//! Iteration is in slot order, which is stable for a given sequence of spawns
//! and removals.

use std::collections::VecDeque;

use glam::Vec2;
use tracing::warn;

use crate::actor::Actor;
use crate::context::SimContext;
use crate::definition::DefinitionRef;
use crate::id::ActorId;
use crate::kind::ActorKind;
use crate::ActorError;

#[derive(Debug)]
struct Slot {
    generation: u32,
    actor: Option<Actor>,
}

/// Owns every actor of a level run.
#[derive(Debug, Default)]
pub struct ActorStore {
    slots: Vec<Slot>,
    vacant: VecDeque<u32>,
    live: usize,
}

impl ActorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an inactive actor and return its id.
    pub fn spawn(&mut self, def: DefinitionRef, kind: ActorKind, position: Vec2) -> ActorId {
        let actor = Actor::new(self.next_id(), def, kind, position);
        self.occupy(actor)
    }

    /// Create an inactive, bodiless copy of `source`.
    pub fn spawn_copy(&mut self, source: ActorId) -> Result<ActorId, ActorError> {
        let copy = self
            .get(source)
            .ok_or(ActorError::UnknownActor { actor: source })?
            .copy_as(self.next_id());
        Ok(self.occupy(copy))
    }

    /// The id the next spawn will receive.
    fn next_id(&self) -> ActorId {
        match self.vacant.front() {
            Some(&slot) => ActorId::new(slot, self.slots[slot as usize].generation),
            None => ActorId::new(self.slots.len() as u32, 0),
        }
    }

    /// Place an actor built with [`next_id`](Self::next_id).
    fn occupy(&mut self, actor: Actor) -> ActorId {
        let id = actor.id();
        match self.vacant.pop_front() {
            Some(slot) => self.slots[slot as usize].actor = Some(actor),
            None => self.slots.push(Slot {
                generation: 0,
                actor: Some(actor),
            }),
        }
        self.live += 1;
        id
    }

    /// Remove an actor: its body is destroyed and every actor it was touching
    /// forgets it. The slot's generation moves on, so `id` goes stale.
    pub fn remove(&mut self, id: ActorId, ctx: &mut SimContext<'_>) -> Option<Actor> {
        let Some(slot) = self
            .slots
            .get_mut(id.index() as usize)
            .filter(|s| s.generation == id.generation() && s.actor.is_some())
        else {
            warn!(actor = %id, "remove of unknown actor");
            return None;
        };
        let mut actor = slot.actor.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push_back(id.index());
        self.live -= 1;

        actor.destroy_body(ctx);
        let partners: Vec<ActorId> = actor.colliding_actors().collect();
        for partner in partners {
            if let Some(other) = self.get_mut(partner) {
                other.forget_colliding_actor(id, ctx);
            }
        }
        Some(actor)
    }

    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.actor.as_ref()
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.actor.as_mut()
    }

    /// Like [`get_mut`](Self::get_mut), as a `Result`.
    pub fn require_mut(&mut self, id: ActorId) -> Result<&mut Actor, ActorError> {
        self.get_mut(id).ok_or(ActorError::UnknownActor { actor: id })
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.get(id).is_some()
    }

    /// Mutable access to two distinct actors at once.
    pub fn pair_mut(&mut self, a: ActorId, b: ActorId) -> Option<(&mut Actor, &mut Actor)> {
        if a.index() == b.index() || !self.contains(a) || !self.contains(b) {
            return None;
        }
        let (ia, ib) = (a.index() as usize, b.index() as usize);
        if ia < ib {
            let (left, right) = self.slots.split_at_mut(ib);
            Some((left[ia].actor.as_mut()?, right[0].actor.as_mut()?))
        } else {
            let (left, right) = self.slots.split_at_mut(ia);
            Some((right[0].actor.as_mut()?, left[ib].actor.as_mut()?))
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    /// Slots ever created, live or vacant.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all actors in slot order.
    pub fn ids(&self) -> Vec<ActorId> {
        self.iter().map(Actor::id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.slots.iter().filter_map(|s| s.actor.as_ref())
    }

    /// The first player actor, if any.
    pub fn find_player(&self) -> Option<ActorId> {
        self.iter().find(|a| a.is_player()).map(Actor::id)
    }

    /// Collision damage of every actor touching `id`, one entry per actor.
    pub fn contact_damage(&self, id: ActorId) -> Vec<f32> {
        let Some(actor) = self.get(id) else {
            return Vec::new();
        };
        actor
            .colliding_actors()
            .filter_map(|other| self.get(other))
            .map(|other| other.def().collision_damage)
            .collect()
    }

    /// Run [`Actor::update`] with the actor's contact damage. Returns `false`
    /// for unknown ids.
    pub fn update_actor(&mut self, id: ActorId, dt: f32, ctx: &mut SimContext<'_>) -> bool {
        let damage = self.contact_damage(id);
        match self.get_mut(id) {
            Some(actor) => {
                actor.update(dt, &damage, ctx);
                true
            }
            None => false,
        }
    }
}
