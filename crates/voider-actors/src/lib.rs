//! Voider actors -- the entity model of the side-scrolling simulation.
//!
//! This crate holds everything that describes a single simulated entity:
//! generational [`ActorId`](id::ActorId)s, shared
//! [`ActorDefinition`](definition::ActorDefinition)s, per-kind state with its
//! collision filter table, the [`Actor`](actor::Actor) itself and the
//! [`ActorStore`](store::ActorStore) arena that owns them. Physics is reached
//! only through the [`BodyBackend`](body::BodyBackend) trait, so the crate has
//! no physics dependency and can be tested with an in-memory backend.
//!
//! # Quick Start
//!
//! ```
//! use voider_actors::prelude::*;
//! use glam::Vec2;
//!
//! let mut store = ActorStore::new();
//! let mut events = EventBus::new();
//! let rock = ActorDefinition::named("rock").with_health(50.0).shared();
//! let id = store.spawn(rock, ActorKind::Terrain, Vec2::ZERO);
//!
//! let mut ctx = SimContext::new(None, &mut events, 0.0);
//! store.get_mut(id).unwrap().decrease_health(20.0, &mut ctx);
//! assert_eq!(store.get(id).unwrap().health(), 30.0);
//! ```

#![deny(unsafe_code)]

pub mod actor;
pub mod body;
pub mod context;
pub mod definition;
pub mod events;
pub mod id;
pub mod kind;
pub mod store;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by actor operations.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// The actor does not exist (stale generation or never allocated).
    #[error("actor {actor} does not exist (stale or never allocated)")]
    UnknownActor { actor: id::ActorId },

    /// A body was requested while no physics world is attached.
    #[error("actor {actor} cannot create a body: no physics world attached")]
    NoPhysicsWorld { actor: id::ActorId },

    /// The actor already owns a body.
    #[error("actor {actor} already has a body")]
    BodyAlreadyExists { actor: id::ActorId },

    /// A bullet-only operation was called on another kind of actor.
    #[error("actor {actor} is not a bullet")]
    NotABullet { actor: id::ActorId },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::actor::{Actor, ActorState};
    pub use crate::body::{BodyBackend, BodyHandle, BodyDesc};
    pub use crate::context::{LevelView, SimContext};
    pub use crate::definition::{
        ActorDefinition, BodyKind, Category, Collectible, DefinitionRef, ShapeTemplate,
    };
    pub use crate::events::{EventBus, EventKind, GameEvent, SubscriptionId};
    pub use crate::id::ActorId;
    pub use crate::kind::{ActorKind, BulletState, EnemyState, GroupId, MovementKind, PlayerState};
    pub use crate::store::ActorStore;
    pub use crate::ActorError;
}
