//! Immutable actor definitions and collision categories.
//!
//! A definition is authored once (by the editor or a level file) and shared by
//! every actor instantiated from it, so actors hold it behind an [`Arc`].

use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr};
use std::sync::Arc;

/// Shared handle to a definition.
pub type DefinitionRef = Arc<ActorDefinition>;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Collision category bits. A body collides with another when each body's
/// category intersects the other body's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Category(pub u32);

impl Category {
    pub const NONE: Category = Category(0);
    pub const PLAYER: Category = Category(1 << 0);
    pub const ENEMY: Category = Category(1 << 1);
    pub const PICKUP: Category = Category(1 << 2);
    pub const STATIC_TERRAIN: Category = Category(1 << 3);
    pub const SCREEN_BORDER: Category = Category(1 << 4);
    pub const PLAYER_BULLET: Category = Category(1 << 5);
    pub const ENEMY_BULLET: Category = Category(1 << 6);

    /// Raw bit representation.
    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Whether any bit of `other` is also set in `self`.
    #[inline]
    pub fn intersects(self, other: Category) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Category {
    type Output = Category;

    fn bitor(self, rhs: Category) -> Category {
        Category(self.0 | rhs.0)
    }
}

impl BitAnd for Category {
    type Output = Category;

    fn bitand(self, rhs: Category) -> Category {
        Category(self.0 & rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Definition parts
// ---------------------------------------------------------------------------

/// Pickup payload carried by collectible definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collectible {
    Health25,
    Health50,
}

impl Collectible {
    /// Health restored on pickup.
    pub fn health_amount(self) -> f32 {
        match self {
            Collectible::Health25 => 25.0,
            Collectible::Health50 => 50.0,
        }
    }
}

/// One collision shape of a definition, in body-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShapeTemplate {
    Circle { radius: f32 },
    Box { half_width: f32, half_height: f32 },
}

impl ShapeTemplate {
    /// Half of the horizontal extent of the shape.
    pub fn half_width(&self) -> f32 {
        match *self {
            ShapeTemplate::Circle { radius } => radius,
            ShapeTemplate::Box { half_width, .. } => half_width,
        }
    }
}

/// How the physics world moves a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyKind {
    #[default]
    Kinematic,
    Dynamic,
    Static,
}

// ---------------------------------------------------------------------------
// ActorDefinition
// ---------------------------------------------------------------------------

/// Static properties shared by all instances of one actor type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorDefinition {
    pub name: String,
    /// `0.0` marks an invulnerable actor (terrain, pickups).
    pub health_max: f32,
    /// Damage per second applied to actors touching this one, or the one-shot
    /// damage dealt when `destroyed_on_collide` is set.
    pub collision_damage: f32,
    pub destroyed_on_collide: bool,
    pub collectible: Option<Collectible>,
    pub shapes: Vec<ShapeTemplate>,
    pub body_kind: BodyKind,
    /// Radians per second; `0.0` disables rotation.
    pub angular_velocity: f32,
    pub sensor: bool,
}

impl Default for ActorDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            health_max: 100.0,
            collision_damage: 0.0,
            destroyed_on_collide: false,
            collectible: None,
            shapes: vec![ShapeTemplate::Circle { radius: 0.5 }],
            body_kind: BodyKind::Kinematic,
            angular_velocity: 0.0,
            sensor: false,
        }
    }
}

impl ActorDefinition {
    /// A definition with default values and the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_health(mut self, health_max: f32) -> Self {
        self.health_max = health_max;
        self
    }

    pub fn with_collision_damage(mut self, damage: f32) -> Self {
        self.collision_damage = damage;
        self
    }

    pub fn destroyed_on_collide(mut self) -> Self {
        self.destroyed_on_collide = true;
        self
    }

    pub fn with_collectible(mut self, collectible: Collectible) -> Self {
        self.collectible = Some(collectible);
        self
    }

    pub fn with_shapes(mut self, shapes: Vec<ShapeTemplate>) -> Self {
        self.shapes = shapes;
        self
    }

    pub fn with_body_kind(mut self, kind: BodyKind) -> Self {
        self.body_kind = kind;
        self
    }

    pub fn with_angular_velocity(mut self, velocity: f32) -> Self {
        self.angular_velocity = velocity;
        self
    }

    /// Wrap in an [`Arc`] for sharing between actors.
    pub fn shared(self) -> DefinitionRef {
        Arc::new(self)
    }

    /// Largest half-width over all shapes, `0.0` when there are none.
    pub fn half_width(&self) -> f32 {
        self.shapes
            .iter()
            .map(ShapeTemplate::half_width)
            .fold(0.0, f32::max)
    }
}
