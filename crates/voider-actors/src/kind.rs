//! Per-kind actor state and the collision filter table.

use crate::definition::Category;
use serde::{Deserialize, Serialize};

/// Identifier of an enemy group, assigned by whoever owns the groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u32);

/// Player-only state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Seconds of invulnerability granted by a health reset.
    pub invulnerable_duration: f32,
    /// Seconds of invulnerability left, `0.0` when vulnerable.
    pub invulnerable_left: f32,
}

impl PlayerState {
    pub fn new(invulnerable_duration: f32) -> Self {
        Self {
            invulnerable_duration,
            invulnerable_left: 0.0,
        }
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_left > 0.0
    }
}

/// How an enemy moves once activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementKind {
    #[default]
    Stationary,
    Path,
    /// Steered by AI; needs a deactivate trigger since it never leaves the
    /// screen on its own.
    Ai,
}

/// Enemy-only state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnemyState {
    pub group: Option<GroupId>,
    pub is_leader: bool,
    pub movement: MovementKind,
}

impl EnemyState {
    pub fn with_movement(movement: MovementKind) -> Self {
        Self {
            movement,
            ..Self::default()
        }
    }
}

/// Bullet-only state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BulletState {
    /// Damage dealt to the actor the bullet hits.
    pub hit_damage: f32,
    pub shot_by_player: bool,
}

/// What role an actor plays in the level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActorKind {
    Player(PlayerState),
    Enemy(EnemyState),
    Bullet(BulletState),
    Pickup,
    Terrain,
}

impl ActorKind {
    /// Category bits and collision mask for this kind in its current state.
    pub fn collision_filter(&self) -> (Category, Category) {
        match self {
            ActorKind::Player(state) if state.is_invulnerable() => {
                (Category::PLAYER, Category::SCREEN_BORDER)
            }
            ActorKind::Player(_) => (
                Category::PLAYER,
                Category::ENEMY
                    | Category::ENEMY_BULLET
                    | Category::PICKUP
                    | Category::STATIC_TERRAIN
                    | Category::SCREEN_BORDER,
            ),
            ActorKind::Enemy(_) => (Category::ENEMY, Category::PLAYER | Category::PLAYER_BULLET),
            ActorKind::Bullet(state) if state.shot_by_player => (
                Category::PLAYER_BULLET,
                Category::ENEMY | Category::STATIC_TERRAIN,
            ),
            ActorKind::Bullet(_) => (
                Category::ENEMY_BULLET,
                Category::PLAYER | Category::STATIC_TERRAIN,
            ),
            ActorKind::Pickup => (Category::PICKUP, Category::PLAYER),
            ActorKind::Terrain => (
                Category::STATIC_TERRAIN,
                Category::PLAYER | Category::PLAYER_BULLET | Category::ENEMY_BULLET,
            ),
        }
    }

    pub fn filter_category(&self) -> Category {
        self.collision_filter().0
    }

    pub fn colliding_categories(&self) -> Category {
        self.collision_filter().1
    }

    pub fn is_player(&self) -> bool {
        matches!(self, ActorKind::Player(_))
    }

    pub fn is_enemy(&self) -> bool {
        matches!(self, ActorKind::Enemy(_))
    }

    pub fn is_bullet(&self) -> bool {
        matches!(self, ActorKind::Bullet(_))
    }

    pub fn bullet(&self) -> Option<&BulletState> {
        match self {
            ActorKind::Bullet(state) => Some(state),
            _ => None,
        }
    }

    pub fn enemy(&self) -> Option<&EnemyState> {
        match self {
            ActorKind::Enemy(state) => Some(state),
            _ => None,
        }
    }

    pub fn enemy_mut(&mut self) -> Option<&mut EnemyState> {
        match self {
            ActorKind::Enemy(state) => Some(state),
            _ => None,
        }
    }

    pub fn player(&self) -> Option<&PlayerState> {
        match self {
            ActorKind::Player(state) => Some(state),
            _ => None,
        }
    }
}
