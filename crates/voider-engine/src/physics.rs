//! rapier2d physics backend for actors.
//!
//! The [`PhysicsWorld`] implements [`BodyBackend`] on top of a zero-gravity
//! rapier2d simulation. Each step:
//!
//! 1. rapier steps the simulation with the engine's fixed dt.
//! 2. Collision start/stop events are collected through a crossbeam channel.
//! 3. Events are mapped from collider handles back to [`ActorId`]s and sorted
//!    by `(min, max)` actor id so contact resolution order does not depend on
//!    channel delivery order.
//!
//! Contact resolution happens after `step` returns, so game rules never run
//! while rapier is iterating its own sets.
//!
//! # Removed bodies
//!
//! rapier reports the end of a contact whose collider was removed during the
//! *next* step. Colliders of destroyed bodies therefore stay in the collider
//! lookup until that step has been drained, so the resulting stop events still
//! resolve to the actors that owned them.
//!
//! # Determinism
//!
//! rapier2d is compiled with `enhanced-determinism`. Combined with a fixed
//! timestep and deterministic actor ordering, the simulation is fully
//! deterministic on the same platform.

use std::collections::HashMap;

use glam::Vec2;
use rapier2d::prelude::*;
use tracing::trace;
use voider_actors::prelude::{
    ActorId, BodyBackend, BodyHandle, BodyKind, BodyDesc, Category, ShapeTemplate,
};

// ---------------------------------------------------------------------------
// ContactEvent
// ---------------------------------------------------------------------------

/// Whether a fixture contact started or ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Begin,
    End,
}

/// One fixture-pair contact change between two actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub phase: ContactPhase,
    pub a: ActorId,
    pub b: ActorId,
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Owns the rapier sets and maps bodies and colliders to their actors.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Maps rapier RigidBodyHandle -> owning actor.
    body_to_actor: HashMap<RigidBodyHandle, ActorId>,
    /// Maps rapier ColliderHandle -> owning actor for contact lookup.
    collider_to_actor: HashMap<ColliderHandle, ActorId>,
    /// Colliders of destroyed bodies, purged after the next step.
    retired_colliders: Vec<ColliderHandle>,
}

impl PhysicsWorld {
    /// Create an empty world without gravity.
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, 0.0],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            body_to_actor: HashMap::new(),
            collider_to_actor: HashMap::new(),
            retired_colliders: Vec::new(),
        }
    }

    /// Step the simulation and return the contact changes it produced.
    pub fn step(&mut self, dt: f32) -> Vec<ContactEvent> {
        self.integration_params.dt = dt as Real;

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None, // query pipeline (unused)
            &(),  // physics hooks
            &event_handler,
        );

        let mut contacts = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            let (h1, h2, phase) = match event {
                CollisionEvent::Started(h1, h2, _) => (h1, h2, ContactPhase::Begin),
                CollisionEvent::Stopped(h1, h2, _) => (h1, h2, ContactPhase::End),
            };
            let a = self.collider_to_actor.get(&h1).copied();
            let b = self.collider_to_actor.get(&h2).copied();
            match (a, b) {
                (Some(a), Some(b)) if a != b => contacts.push(ContactEvent { phase, a, b }),
                _ => trace!(?h1, ?h2, "contact with unmapped collider ignored"),
            }
        }

        // Stable sort: per-pair begin/end order is preserved.
        contacts.sort_by_key(|c| (c.a.min(c.b), c.a.max(c.b)));

        for handle in self.retired_colliders.drain(..) {
            self.collider_to_actor.remove(&handle);
        }

        contacts
    }

    /// The actor owning a body, if the body exists.
    pub fn actor_for_body(&self, handle: BodyHandle) -> Option<ActorId> {
        self.body_to_actor.get(&to_rapier(handle)).copied()
    }

    pub fn has_body(&self, handle: BodyHandle) -> bool {
        self.rigid_body_set.contains(to_rapier(handle))
    }

    /// Number of rigid bodies currently in the world.
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Current linear velocity of a body.
    pub fn body_velocity(&self, handle: BodyHandle) -> Option<Vec2> {
        self.rigid_body_set
            .get(to_rapier(handle))
            .map(|rb| Vec2::new(rb.linvel().x, rb.linvel().y))
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyBackend for PhysicsWorld {
    fn create_body(&mut self, desc: &BodyDesc<'_>) -> BodyHandle {
        let translation = vector![desc.position.x as Real, desc.position.y as Real];
        let linvel = vector![desc.linear_velocity.x as Real, desc.linear_velocity.y as Real];
        let builder = match desc.kind {
            BodyKind::Dynamic => RigidBodyBuilder::dynamic().linvel(linvel),
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_velocity_based().linvel(linvel),
            BodyKind::Static => RigidBodyBuilder::fixed(),
        };
        let rb = builder
            .translation(translation)
            .rotation(desc.angle as Real)
            .user_data(desc.owner.user_data())
            .build();

        let body_handle = self.rigid_body_set.insert(rb);
        self.body_to_actor.insert(body_handle, desc.owner);

        let groups = interaction_groups(desc.category, desc.mask);
        for template in desc.shapes {
            let shape = match *template {
                ShapeTemplate::Circle { radius } => SharedShape::ball(radius as Real),
                ShapeTemplate::Box {
                    half_width,
                    half_height,
                } => SharedShape::cuboid(half_width as Real, half_height as Real),
            };
            let collider = ColliderBuilder::new(shape)
                .sensor(desc.sensor)
                .collision_groups(groups)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .active_collision_types(ActiveCollisionTypes::all())
                .user_data(desc.owner.user_data())
                .build();
            let collider_handle =
                self.collider_set
                    .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);
            self.collider_to_actor.insert(collider_handle, desc.owner);
        }

        from_rapier(body_handle)
    }

    fn destroy_body(&mut self, handle: BodyHandle) -> bool {
        let body_handle = to_rapier(handle);
        let Some(rb) = self.rigid_body_set.get(body_handle) else {
            return false;
        };
        self.retired_colliders.extend(rb.colliders().iter().copied());
        self.rigid_body_set.remove(
            body_handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true, // remove attached colliders
        );
        self.body_to_actor.remove(&body_handle);
        true
    }

    fn body_position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.rigid_body_set.get(to_rapier(handle)).map(|rb| {
            let t = rb.translation();
            Vec2::new(t.x, t.y)
        })
    }

    fn body_angle(&self, handle: BodyHandle) -> Option<f32> {
        self.rigid_body_set
            .get(to_rapier(handle))
            .map(|rb| rb.rotation().angle())
    }

    fn set_body_transform(&mut self, handle: BodyHandle, position: Vec2, angle: f32) {
        if let Some(rb) = self.rigid_body_set.get_mut(to_rapier(handle)) {
            rb.set_position(Isometry::new(vector![position.x, position.y], angle), true);
        }
    }

    fn set_collision_filter(&mut self, handle: BodyHandle, category: Category, mask: Category) {
        let Some(rb) = self.rigid_body_set.get(to_rapier(handle)) else {
            return;
        };
        let groups = interaction_groups(category, mask);
        let colliders: Vec<ColliderHandle> = rb.colliders().to_vec();
        for collider in colliders {
            if let Some(c) = self.collider_set.get_mut(collider) {
                c.set_collision_groups(groups);
            }
        }
    }
}

fn interaction_groups(category: Category, mask: Category) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(category.bits()),
        Group::from_bits_truncate(mask.bits()),
    )
}

fn to_rapier(handle: BodyHandle) -> RigidBodyHandle {
    RigidBodyHandle::from_raw_parts(handle.0 as u32, (handle.0 >> 32) as u32)
}

fn from_rapier(handle: RigidBodyHandle) -> BodyHandle {
    let (index, generation) = handle.into_raw_parts();
    BodyHandle((generation as u64) << 32 | index as u64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
