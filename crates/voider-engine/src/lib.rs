//! Voider engine -- the per-tick gameplay simulation of a side-scrolling shooter.
//!
//! This crate builds on [`voider_actors`] and drives one level run: a rapier2d
//! physics world, contact rules, delay-scheduled triggers, enemy groups,
//! weapons, bullet culling and the score multiplier. Everything is advanced by
//! [`Simulation::tick`](tick::Simulation::tick) at a fixed time step on a
//! single thread; the only cross-thread hand-off is the
//! [`ResponseInbox`](inbox::ResponseInbox).
//!
//! # Quick Start
//!
//! ```
//! use voider_engine::prelude::*;
//! use glam::Vec2;
//!
//! let scroll = LinearScroll::new(0.0, 10.0, 5.0);
//! let mut sim = Simulation::new(GameConfig::default(), Box::new(scroll)).unwrap();
//! let ship = ActorDefinition::named("ship").shared();
//! sim.spawn_player(ship, Vec2::new(-5.0, 0.0)).unwrap();
//!
//! let outcome = sim.run_ticks(600).unwrap();
//! assert_eq!(outcome, Outcome::LevelCompleted);
//! assert_eq!(sim.stats().score(), 10_000_000);
//! ```

#![deny(unsafe_code)]

pub mod bullets;
pub mod collision;
pub mod config;
pub mod group;
pub mod inbox;
pub mod level;
pub mod logging;
pub mod physics;
pub mod score;
pub mod snapshot;
pub mod tick;
pub mod trigger;
pub mod weapon;

use voider_actors::prelude::{ActorError, ActorId, GroupId};

/// Re-export the actor crate for convenience.
pub use voider_actors;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Every bullet slot is in use.
    #[error("bullet pool exhausted ({capacity} bullets in flight)")]
    BulletPoolExhausted { capacity: usize },

    #[error("actor {actor} is not in the simulation")]
    UnknownActor { actor: ActorId },

    #[error("trigger {} does not exist", trigger.0)]
    UnknownTrigger { trigger: trigger::TriggerId },

    #[error("enemy group {} does not exist", group.0)]
    UnknownGroup { group: GroupId },

    /// A leader can only be set on an empty group.
    #[error("enemy group {} already has a leader", group.0)]
    GroupNotEmpty { group: GroupId },

    #[error("actor {actor} is not an enemy")]
    NotAnEnemy { actor: ActorId },

    #[error("invalid game config: {0}")]
    InvalidConfig(String),

    /// The level end does not lie after its start.
    #[error("invalid level bounds: start {start}, end {end}")]
    InvalidLevelBounds { start: f32, end: f32 },

    /// The receiving side of the response inbox is gone.
    #[error("response inbox closed")]
    InboxClosed,

    #[error(transparent)]
    Actor(#[from] ActorError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use voider_actors::prelude::*;

    pub use crate::bullets::{BulletDestroyer, ViewBox};
    pub use crate::collision::{CollisionResolver, ContactOutcome};
    pub use crate::config::{
        BulletConfig, EnemyConfig, GameConfig, PlayerConfig, ScoreConfig, WeaponConfig,
    };
    pub use crate::group::EnemyGroup;
    pub use crate::inbox::{response_channel, ExternalResponse, ResponseInbox, ResponseSender};
    pub use crate::level::{create_default_triggers, LinearScroll, ScrollFeed};
    pub use crate::physics::{ContactEvent, ContactPhase, PhysicsWorld};
    pub use crate::score::{PlayerStats, ScorePart, ScoreState};
    pub use crate::snapshot::{ActorRecord, RunSnapshot};
    pub use crate::tick::{Outcome, Simulation, TickReport};
    pub use crate::trigger::{
        BindingId, TriggerAction, TriggerBinding, TriggerId, TriggerRegistry, TriggerSource,
    };
    pub use crate::weapon::{Aim, MountedWeapon, Weapon, WeaponDefinition};
    pub use crate::EngineError;
}
