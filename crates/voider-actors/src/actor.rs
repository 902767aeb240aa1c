//! The simulated entity.
//!
//! An [`Actor`] owns its health, cached transform, activation state, optional
//! physics body and the multiset of actors it is currently touching. It never
//! holds references to other actors: contact damage from the colliding set is
//! gathered by the [`ActorStore`](crate::store::ActorStore) and passed in.
//!
//! # Body lifecycle
//!
//! A body exists only while the actor is active. [`Actor::activate`] creates it
//! lazily, [`Actor::deactivate`] removes it. Collision resolution runs right
//! after a physics step, but it still only *marks* the actor with
//! [`Actor::destroy_body_safe`]; the body is removed at the start of the next
//! [`Actor::update`].

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::body::{BodyHandle, BodyDesc};
use crate::context::SimContext;
use crate::definition::{Collectible, DefinitionRef};
use crate::events::GameEvent;
use crate::id::ActorId;
use crate::kind::{ActorKind, EnemyState};
use crate::ActorError;

/// Health changes smaller than this are not reported.
pub const HEALTH_EPSILON: f32 = f32::EPSILON;

// ---------------------------------------------------------------------------
// ActorState
// ---------------------------------------------------------------------------

/// The mutable part of an actor that survives a save and restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    pub health: f32,
    pub position: Vec2,
    pub angle: f32,
    pub active: bool,
    pub activation_time: Option<f32>,
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// One simulated entity.
#[derive(Debug)]
pub struct Actor {
    id: ActorId,
    def: DefinitionRef,
    kind: ActorKind,
    health: f32,
    position: Vec2,
    angle: f32,
    /// Initial linear velocity handed to the body when it is created.
    velocity: Vec2,
    active: bool,
    /// `None` while inactive.
    activation_time: Option<f32>,
    pending_destroy: bool,
    body: Option<BodyHandle>,
    /// Other actor -> number of overlapping fixture pairs.
    colliding: BTreeMap<ActorId, u32>,
    skip_rotation: bool,
}

impl Actor {
    /// Create an inactive actor without a body at full health.
    pub fn new(id: ActorId, def: DefinitionRef, kind: ActorKind, position: Vec2) -> Self {
        Self {
            id,
            health: def.health_max,
            def,
            kind,
            position,
            angle: 0.0,
            velocity: Vec2::ZERO,
            active: false,
            activation_time: None,
            pending_destroy: false,
            body: None,
            colliding: BTreeMap::new(),
            skip_rotation: false,
        }
    }

    /// A fresh, inactive, bodiless copy of this actor under a new id.
    ///
    /// Enemy copies are never group leaders.
    pub fn copy_as(&self, id: ActorId) -> Actor {
        let mut kind = self.kind;
        if let ActorKind::Enemy(state) = &mut kind {
            state.is_leader = false;
        }
        let mut copy = Actor::new(id, self.def.clone(), kind, self.position);
        copy.angle = self.angle;
        copy.skip_rotation = self.skip_rotation;
        copy
    }

    // -- accessors ----------------------------------------------------------

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn def(&self) -> &DefinitionRef {
        &self.def
    }

    pub fn kind(&self) -> &ActorKind {
        &self.kind
    }

    pub fn enemy_mut(&mut self) -> Option<&mut EnemyState> {
        self.kind.enemy_mut()
    }

    pub fn is_player(&self) -> bool {
        self.kind.is_player()
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn health_max(&self) -> f32 {
        self.def.health_max
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activation_time(&self) -> Option<f32> {
        self.activation_time
    }

    pub fn is_pending_destroy(&self) -> bool {
        self.pending_destroy
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn is_invulnerable(&self) -> bool {
        self.kind.player().is_some_and(|p| p.is_invulnerable())
    }

    /// Contact count with `other`, `0` when not touching.
    pub fn contact_count(&self, other: ActorId) -> u32 {
        self.colliding.get(&other).copied().unwrap_or(0)
    }

    /// Actors currently touching this one, in ascending id order.
    pub fn colliding_actors(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.colliding.keys().copied()
    }

    /// Suppress rotation (editor previews, actors steered externally).
    pub fn set_skip_rotation(&mut self, skip: bool) {
        self.skip_rotation = skip;
    }

    /// Move the actor, teleporting its body if it has one.
    pub fn set_position(&mut self, position: Vec2, ctx: &mut SimContext<'_>) {
        self.position = position;
        if let (Some(handle), Some(bodies)) = (self.body, ctx.bodies()) {
            bodies.set_body_transform(handle, position, self.angle);
        }
    }

    // -- body lifecycle -----------------------------------------------------

    /// Create the physics body from the definition's shapes.
    pub fn create_body(&mut self, ctx: &mut SimContext<'_>) -> Result<(), ActorError> {
        if self.body.is_some() {
            warn!(actor = %self.id, "body already exists");
            return Err(ActorError::BodyAlreadyExists { actor: self.id });
        }
        let (category, mask) = self.kind.collision_filter();
        let desc = BodyDesc {
            owner: self.id,
            kind: self.def.body_kind,
            position: self.position,
            angle: self.angle,
            linear_velocity: if ctx.editor_active {
                Vec2::ZERO
            } else {
                self.velocity
            },
            shapes: &self.def.shapes,
            sensor: self.def.sensor,
            category,
            mask,
        };
        let Some(bodies) = ctx.bodies() else {
            error!(actor = %self.id, "cannot create body without a physics world");
            return Err(ActorError::NoPhysicsWorld { actor: self.id });
        };
        self.body = Some(bodies.create_body(&desc));
        Ok(())
    }

    /// Remove the physics body now. Returns whether a body was removed.
    pub fn destroy_body(&mut self, ctx: &mut SimContext<'_>) -> bool {
        let Some(handle) = self.body.take() else {
            return false;
        };
        match ctx.bodies() {
            Some(bodies) => bodies.destroy_body(handle),
            None => {
                warn!(actor = %self.id, "dropping body handle without a physics world");
                false
            }
        }
    }

    /// Schedule body removal for the next [`update`](Self::update).
    pub fn destroy_body_safe(&mut self) {
        self.pending_destroy = true;
    }

    /// Push the current kind's category and mask to every fixture.
    pub fn reload_filters(&mut self, ctx: &mut SimContext<'_>) {
        let (category, mask) = self.kind.collision_filter();
        if let (Some(handle), Some(bodies)) = (self.body, ctx.bodies()) {
            bodies.set_collision_filter(handle, category, mask);
        }
    }

    /// Activate the actor, creating its body if needed.
    ///
    /// On error the actor stays inactive.
    pub fn activate(&mut self, ctx: &mut SimContext<'_>) -> Result<(), ActorError> {
        self.pending_destroy = false;
        if self.body.is_none() {
            self.create_body(ctx)?;
        }
        self.active = true;
        self.activation_time = Some(ctx.now);
        debug!(actor = %self.id, time = ctx.now, "actor activated");
        Ok(())
    }

    /// Deactivate the actor and remove its body.
    pub fn deactivate(&mut self, ctx: &mut SimContext<'_>) {
        self.active = false;
        self.activation_time = None;
        self.destroy_body(ctx);
        debug!(actor = %self.id, time = ctx.now, "actor deactivated");
    }

    // -- per-tick update ----------------------------------------------------

    /// Advance one step.
    ///
    /// `contact_damage` holds the collision damage of every actor currently in
    /// the colliding set, one entry per distinct actor.
    pub fn update(&mut self, dt: f32, contact_damage: &[f32], ctx: &mut SimContext<'_>) {
        if self.pending_destroy {
            self.pending_destroy = false;
            self.deactivate(ctx);
        }

        if let Some(handle) = self.body {
            if let Some(position) = ctx.bodies().and_then(|b| b.body_position(handle)) {
                self.position = position;
            }
            let speed = self.def.angular_velocity;
            if !self.skip_rotation && !ctx.editor_active && speed != 0.0 {
                self.angle = wrap_angle(self.angle + speed * dt);
                if let Some(bodies) = ctx.bodies() {
                    bodies.set_body_transform(handle, self.position, self.angle);
                }
            }
        }

        if self.active && self.def.health_max > 0.0 && self.health > 0.0 {
            for &damage in contact_damage {
                self.decrease_health(damage * dt, ctx);
            }
        }

        let mut invulnerability_expired = false;
        if let ActorKind::Player(state) = &mut self.kind {
            if state.invulnerable_left > 0.0 {
                state.invulnerable_left -= dt;
                if state.invulnerable_left <= 0.0 {
                    state.invulnerable_left = 0.0;
                    invulnerability_expired = true;
                }
            }
        }
        if invulnerability_expired {
            self.reload_filters(ctx);
        }
    }

    // -- health -------------------------------------------------------------

    /// Subtract health. Health may end up negative.
    pub fn decrease_health(&mut self, amount: f32, ctx: &mut SimContext<'_>) {
        if self.health <= 0.0 {
            return;
        }
        let old = self.health;
        self.health -= amount;
        self.notify_health(old, ctx);
        if self.is_player() && self.health <= 0.0 {
            ctx.fire(GameEvent::ShipLost {
                actor: self.id,
                time: ctx.now,
            });
        }
    }

    /// Add health, clamped to the definition's maximum.
    pub fn increase_health(&mut self, amount: f32, ctx: &mut SimContext<'_>) {
        let old = self.health;
        self.health = (self.health + amount).min(self.def.health_max);
        self.notify_health(old, ctx);
    }

    /// Restore full health. The player also becomes invulnerable.
    pub fn reset_health(&mut self, ctx: &mut SimContext<'_>) {
        let old = self.health;
        self.health = self.def.health_max;
        self.notify_health(old, ctx);
        if let ActorKind::Player(state) = &mut self.kind {
            state.invulnerable_left = state.invulnerable_duration;
        }
        if self.is_player() {
            self.reload_filters(ctx);
        }
    }

    /// Drop health below zero.
    pub fn kill(&mut self, ctx: &mut SimContext<'_>) {
        let amount = self.health + 1.0;
        self.decrease_health(amount, ctx);
    }

    /// Apply a pickup's effect.
    pub fn add_collectible(&mut self, collectible: Collectible, ctx: &mut SimContext<'_>) {
        self.increase_health(collectible.health_amount(), ctx);
    }

    fn notify_health(&self, old: f32, ctx: &mut SimContext<'_>) {
        if (self.health - old).abs() > HEALTH_EPSILON {
            ctx.fire(GameEvent::HealthChanged {
                actor: self.id,
                is_player: self.is_player(),
                old_health: old,
                new_health: self.health,
                time: ctx.now,
            });
        }
    }

    // -- colliding set ------------------------------------------------------

    /// Count one more fixture contact with `other`.
    pub fn add_colliding_actor(&mut self, other: ActorId, ctx: &mut SimContext<'_>) {
        let was_empty = self.colliding.is_empty();
        *self.colliding.entry(other).or_insert(0) += 1;
        if was_empty && self.is_player() {
            ctx.fire(GameEvent::PlayerCollisionBegin {
                player: self.id,
                other,
            });
        }
    }

    /// Count one fixture contact with `other` as ended.
    ///
    /// Returns `false` (and logs) when `other` was not in the colliding set.
    pub fn remove_colliding_actor(&mut self, other: ActorId, ctx: &mut SimContext<'_>) -> bool {
        let Some(count) = self.colliding.get_mut(&other) else {
            warn!(actor = %self.id, other = %other, "colliding actor not found");
            return false;
        };
        debug_assert!(*count > 0, "stored contact counts are positive");
        *count -= 1;
        if *count == 0 {
            self.colliding.remove(&other);
            if self.colliding.is_empty() && self.is_player() {
                ctx.fire(GameEvent::PlayerCollisionEnd {
                    player: self.id,
                    other,
                });
            }
        }
        true
    }

    /// Forget `other` entirely, whatever its count. Used when `other` leaves
    /// the level.
    pub fn forget_colliding_actor(&mut self, other: ActorId, ctx: &mut SimContext<'_>) -> bool {
        if self.colliding.remove(&other).is_none() {
            return false;
        }
        if self.colliding.is_empty() && self.is_player() {
            ctx.fire(GameEvent::PlayerCollisionEnd {
                player: self.id,
                other,
            });
        }
        true
    }

    // -- bullets ------------------------------------------------------------

    /// Aim a bullet. The velocity is applied when the body is created.
    pub fn shoot(
        &mut self,
        origin: Vec2,
        direction: Vec2,
        speed: f32,
        damage: f32,
        level_speed: Option<f32>,
    ) -> Result<(), ActorError> {
        let ActorKind::Bullet(state) = &mut self.kind else {
            return Err(ActorError::NotABullet { actor: self.id });
        };
        state.hit_damage = damage;
        self.position = origin;
        self.velocity = direction.normalize_or_zero() * speed;
        if let Some(level_speed) = level_speed {
            self.velocity.x += level_speed;
        }
        Ok(())
    }

    // -- save / restore -----------------------------------------------------

    pub fn state(&self) -> ActorState {
        ActorState {
            health: self.health,
            position: self.position,
            angle: self.angle,
            active: self.active,
            activation_time: self.activation_time,
        }
    }

    /// Overwrite the mutable state, creating or removing the body to match.
    pub fn restore_state(
        &mut self,
        state: &ActorState,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActorError> {
        self.health = state.health;
        self.angle = state.angle;
        self.set_position(state.position, ctx);
        self.pending_destroy = false;
        if state.active && self.body.is_none() {
            self.create_body(ctx)?;
        } else if !state.active {
            self.destroy_body(ctx);
        }
        self.active = state.active;
        self.activation_time = state.activation_time;
        Ok(())
    }
}

/// Wrap into `[-2π, 2π]` by one turn.
fn wrap_angle(angle: f32) -> f32 {
    if angle >= TAU {
        angle - TAU
    } else if angle <= -TAU {
        angle + TAU
    } else {
        angle
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
