//! The seam between actors and a physics world.
//!
//! Actors never talk to a physics engine directly. They describe the body they
//! want with a [`BodyDesc`] and manipulate it through a [`BodyBackend`], which
//! the engine crate implements on top of rapier.

use glam::Vec2;

use crate::definition::{BodyKind, Category, ShapeTemplate};
use crate::id::ActorId;

/// Opaque handle to a body owned by a [`BodyBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u64);

/// Everything a backend needs to create one body.
#[derive(Debug, Clone)]
pub struct BodyDesc<'a> {
    /// Back-reference stored in the body's user-data slot.
    pub owner: ActorId,
    pub kind: BodyKind,
    pub position: Vec2,
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub shapes: &'a [ShapeTemplate],
    pub sensor: bool,
    pub category: Category,
    pub mask: Category,
}

/// Body storage an actor can create, move, filter and destroy bodies in.
pub trait BodyBackend {
    /// Create a body with one collider per shape.
    fn create_body(&mut self, desc: &BodyDesc<'_>) -> BodyHandle;

    /// Destroy a body and its colliders. Returns `false` for unknown handles.
    fn destroy_body(&mut self, handle: BodyHandle) -> bool;

    fn body_position(&self, handle: BodyHandle) -> Option<Vec2>;

    fn body_angle(&self, handle: BodyHandle) -> Option<f32>;

    fn set_body_transform(&mut self, handle: BodyHandle, position: Vec2, angle: f32);

    /// Replace the category and mask of every collider of the body.
    fn set_collision_filter(&mut self, handle: BodyHandle, category: Category, mask: Category);
}
