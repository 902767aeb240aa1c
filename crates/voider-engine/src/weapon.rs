//! Fire-rate gating and bullet spawning.
//!
//! A [`Weapon`] knows where it is and when it may fire next. Shooting spawns
//! a bullet actor, aims it, activates it (which creates its physics body with
//! the aimed velocity) and hands it to the [`BulletDestroyer`].

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;
use voider_actors::prelude::{ActorId, ActorKind, ActorStore, BulletState, DefinitionRef, SimContext};

use crate::bullets::BulletDestroyer;
use crate::EngineError;

// ---------------------------------------------------------------------------
// WeaponDefinition
// ---------------------------------------------------------------------------

/// Immutable weapon template.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponDefinition {
    /// Bullet actor to fire. A weapon without one never shoots.
    pub bullet: Option<DefinitionRef>,
    pub bullet_speed: f32,
    pub damage: f32,
    pub cooldown_min: f32,
    pub cooldown_max: f32,
    /// Add the level scroll speed to the bullet's horizontal velocity.
    pub relative_to_level_speed: bool,
}

impl Default for WeaponDefinition {
    fn default() -> Self {
        Self {
            bullet: None,
            bullet_speed: 10.0,
            damage: 10.0,
            cooldown_min: 0.5,
            cooldown_max: 0.5,
            relative_to_level_speed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Weapon
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    def: WeaponDefinition,
    cooldown: f32,
    position: Vec2,
}

impl Weapon {
    /// A weapon that may fire immediately.
    pub fn new(def: WeaponDefinition) -> Self {
        Self {
            def,
            cooldown: 0.0,
            position: Vec2::ZERO,
        }
    }

    pub fn def(&self) -> &WeaponDefinition {
        &self.def
    }

    pub fn set_definition(&mut self, def: WeaponDefinition) {
        self.def = def;
    }

    /// Swap the definition and start a fresh cooldown.
    pub fn set_definition_reset_cooldown<R: Rng + ?Sized>(&mut self, def: WeaponDefinition, rng: &mut R) {
        self.def = def;
        self.cooldown = self.calculate_cooldown(rng);
    }

    pub fn cooldown(&self) -> f32 {
        self.cooldown
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Count the cooldown down, stopping at zero.
    pub fn update(&mut self, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
    }

    pub fn can_shoot(&self) -> bool {
        self.cooldown <= 0.0
    }

    /// Fixed when min equals max, otherwise uniform in `[min, max)`.
    pub fn calculate_cooldown<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let (min, max) = (self.def.cooldown_min, self.def.cooldown_max);
        if max > min {
            rng.gen_range(min..max)
        } else {
            max
        }
    }

    /// Fire one bullet from the weapon's position.
    ///
    /// Returns `Ok(None)` when the weapon has no bullet definition. The
    /// cooldown is not checked here; callers gate on [`can_shoot`](Self::can_shoot).
    pub fn shoot<R: Rng + ?Sized>(
        &mut self,
        direction: Vec2,
        shot_by_player: bool,
        store: &mut ActorStore,
        bullets: &mut BulletDestroyer,
        rng: &mut R,
        ctx: &mut SimContext<'_>,
    ) -> Result<Option<ActorId>, EngineError> {
        let Some(bullet_def) = self.def.bullet.clone() else {
            return Ok(None);
        };
        if !bullets.has_capacity() {
            return Err(EngineError::BulletPoolExhausted {
                capacity: bullets.capacity(),
            });
        }

        let kind = ActorKind::Bullet(BulletState {
            hit_damage: self.def.damage,
            shot_by_player,
        });
        let id = store.spawn(bullet_def, kind, self.position);
        let level_speed = self.def.relative_to_level_speed.then_some(ctx.level.speed);
        let launched = store.require_mut(id).and_then(|bullet| {
            bullet.shoot(self.position, direction, self.def.bullet_speed, self.def.damage, level_speed)?;
            bullet.activate(ctx)
        });
        if let Err(err) = launched {
            store.remove(id, ctx);
            return Err(err.into());
        }
        if let Err(err) = bullets.add(id, ctx.now) {
            store.remove(id, ctx);
            return Err(err);
        }

        self.cooldown = self.calculate_cooldown(rng);
        trace!(bullet = %id, cooldown = self.cooldown, "weapon fired");
        Ok(Some(id))
    }
}

// ---------------------------------------------------------------------------
// MountedWeapon
// ---------------------------------------------------------------------------

/// Where a mounted weapon points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Aim {
    Direction(Vec2),
    /// Toward the player's current position.
    AtPlayer,
}

/// A weapon carried by an actor.
#[derive(Debug, Clone)]
pub struct MountedWeapon {
    pub owner: ActorId,
    pub weapon: Weapon,
    pub aim: Aim,
    /// Weapon position relative to the owner.
    pub offset: Vec2,
    /// Fire whenever the cooldown allows.
    pub firing: bool,
}

impl MountedWeapon {
    pub fn new(owner: ActorId, weapon: Weapon, aim: Aim) -> Self {
        Self {
            owner,
            weapon,
            aim,
            offset: Vec2::ZERO,
            firing: true,
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Follow the owner, count down and fire if allowed.
    ///
    /// Inactive owners neither move the weapon nor fire.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        store: &mut ActorStore,
        bullets: &mut BulletDestroyer,
        rng: &mut R,
        ctx: &mut SimContext<'_>,
    ) -> Result<Option<ActorId>, EngineError> {
        self.weapon.update(dt);
        let Some(owner) = store.get(self.owner) else {
            return Ok(None);
        };
        if !owner.is_active() {
            return Ok(None);
        }
        let shot_by_player = owner.is_player();
        self.weapon.set_position(owner.position() + self.offset);
        if !self.firing || !self.weapon.can_shoot() {
            return Ok(None);
        }

        let direction = match self.aim {
            Aim::Direction(direction) => direction,
            Aim::AtPlayer => {
                let target = ctx.player.and_then(|p| store.get(p)).filter(|p| p.is_active());
                match target {
                    Some(player) => player.position() - self.weapon.position(),
                    None => return Ok(None),
                }
            }
        };
        self.weapon
            .shoot(direction, shot_by_player, store, bullets, rng, ctx)
    }
}
